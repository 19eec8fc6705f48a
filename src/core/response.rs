// Success half of the response contract. Handlers terminate through one of
// these or through ApiError; nothing else writes a body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// The `{"message": ...}` body shared by error and fallback responses
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// 200 with a JSON payload
pub fn ok_with_content<T: Serialize>(content: T) -> Response {
    (StatusCode::OK, Json(content)).into_response()
}

/// 201 with the created record
pub fn created_with_content<T: Serialize>(content: T) -> Response {
    (StatusCode::CREATED, Json(content)).into_response()
}

/// 204, empty body
pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}
