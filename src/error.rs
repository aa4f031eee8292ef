use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{auth::AuthError, models::ErrorResponse, repository::StoreError};

/// ApiError
///
/// The single error type crossing the handler boundary. Every variant renders as a JSON
/// `{"message": ...}` body with its own status code, so callers can always tell a missing
/// credential (401) from a wrong owner (403) or a missing record (404).
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed id, malformed body, or a missing required field.
    #[error("{0}")]
    Validation(String),

    /// No credential was presented.
    #[error("{0}")]
    Unauthorized(String),

    /// A credential was presented but rejected, or the caller does not own the resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The path exists but does not serve this method.
    #[error("{0}")]
    MethodNotAllowed(String),

    /// The backing store failed. The detail is logged, never returned.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!(error = %e, "store call failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidToken(_) => ApiError::Forbidden(err.to_string()),
        }
    }
}

// Axum's own rejections are plain text; fold them into the structured taxonomy.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(reason = %rejection.body_text(), "path parameter rejected");
        ApiError::Validation("Invalid ID".to_string())
    }
}
