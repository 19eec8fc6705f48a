use crate::core::response::MessageBody;
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};

const NOT_FOUND_PAGE: &str = include_str!("../../views/404.html");
const NOT_FOUND_MESSAGE: &str = "404 resource not found";

/// Catch-all for unmatched routes: 404 shaped by what the client accepts.
/// HTML is tried first, then JSON, then plain text.
pub async fn fallback_handler(headers: HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        // No Accept header means anything is acceptable
        .unwrap_or("*/*");

    if accepts(accept, "text", "html") {
        return (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response();
    }

    if accepts(accept, "application", "json") {
        return (
            StatusCode::NOT_FOUND,
            Json(MessageBody {
                message: NOT_FOUND_MESSAGE.to_string(),
            }),
        )
            .into_response();
    }

    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response()
}

/// Minimal Accept matcher: media ranges are comma-separated, parameters
/// are ignored, `*` wildcards are honored.
fn accepts(accept: &str, kind: &str, subtype: &str) -> bool {
    accept.split(',').any(|range| {
        let range = range.split(';').next().unwrap_or("").trim();
        match range.split_once('/') {
            Some((r_kind, r_sub)) => {
                (r_kind == "*" || r_kind == kind) && (r_sub == "*" || r_sub == subtype)
            }
            None => false,
        }
    })
}
