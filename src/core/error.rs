// Centralized error handling: every business outcome that is not a success
// maps to a status code and wire message in exactly one place.

use crate::core::response::MessageBody;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

/// Errors a request handler can terminate with
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("All fields are required.")]
    MissingFields,

    #[error("Title and text fields are required.")]
    MissingNoteFields,

    #[error("Username already taken.")]
    UsernameTaken,

    #[error("User not found.")]
    UserNotFound,

    #[error("Note not found.")]
    NoteNotFound,

    #[error("Cannot delete user because it has assigned notes.")]
    UserHasNotes,

    #[error("Request body could not be read")]
    UnreadableBody(#[from] JsonRejection),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::MissingNoteFields => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound | ApiError::NoteNotFound => StatusCode::NOT_FOUND,
            ApiError::UsernameTaken | ApiError::UserHasNotes => StatusCode::CONFLICT,
            ApiError::UnreadableBody(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 5xx bodies carry a fixed message, the cause goes to the log only
        let message = if status.is_server_error() {
            match &self {
                ApiError::UnreadableBody(rejection) => {
                    error!(error = %rejection, "Failed to read request body");
                }
                ApiError::Internal(cause) => {
                    error!(error = %cause, "Request failed unexpectedly");
                }
                _ => {}
            }
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(MessageBody { message })).into_response()
    }
}

/// Outcomes of storage operations that the stores themselves enforce
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("username is already taken")]
    UsernameTaken,

    #[error("user does not exist")]
    UserNotFound,

    #[error("user still has notes assigned")]
    UserHasNotes,

    #[error("note does not exist")]
    NoteNotFound,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => ApiError::UsernameTaken,
            StoreError::UserNotFound => ApiError::UserNotFound,
            StoreError::UserHasNotes => ApiError::UserHasNotes,
            StoreError::NoteNotFound => ApiError::NoteNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn body_message(response: Response) -> String {
        let (_, body) = response.into_parts();
        let bytes = Body::new(body).collect().await.unwrap().to_bytes();
        let body: MessageBody = serde_json::from_slice(&bytes).unwrap();
        body.message
    }

    #[tokio::test]
    async fn test_validation_errors_are_400() {
        let response = ApiError::MissingFields.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_message(response).await, "All fields are required.");

        let response = ApiError::MissingNoteFields.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_message(response).await,
            "Title and text fields are required."
        );
    }

    #[tokio::test]
    async fn test_missing_entities_are_404() {
        let response = ApiError::UserNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_message(response).await, "User not found.");

        let response = ApiError::NoteNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_message(response).await, "Note not found.");
    }

    #[tokio::test]
    async fn test_conflicts_are_409() {
        let response = ApiError::UsernameTaken.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_message(response).await, "Username already taken.");

        let response = ApiError::UserHasNotes.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_message(response).await,
            "Cannot delete user because it has assigned notes."
        );
    }

    #[tokio::test]
    async fn test_internal_error_does_not_leak_detail() {
        let cause = anyhow::anyhow!("store file descriptor 7 went away");
        let response = ApiError::Internal(cause).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = body_message(response).await;
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ApiError::from(StoreError::UsernameTaken),
            ApiError::UsernameTaken
        ));
        assert!(matches!(
            ApiError::from(StoreError::UserNotFound),
            ApiError::UserNotFound
        ));
        assert!(matches!(
            ApiError::from(StoreError::UserHasNotes),
            ApiError::UserHasNotes
        ));
        assert!(matches!(
            ApiError::from(StoreError::NoteNotFound),
            ApiError::NoteNotFound
        ));
    }
}
