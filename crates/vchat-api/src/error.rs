//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use vchat_gemini::GeminiError;
use vchat_session::SessionError;
use vchat_store::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Gemini(#[from] GeminiError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Provider(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(e) => storage_status(e),
            ApiError::Session(e) => session_status(e),
            ApiError::Gemini(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn storage_status(error: &StorageError) -> StatusCode {
    match error {
        StorageError::UnsupportedMime(_)
        | StorageError::EmptyUpload
        | StorageError::TooLarge { .. }
        | StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn session_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::NoMedia => StatusCode::NOT_FOUND,
        SessionError::EmptyQuestion => StatusCode::BAD_REQUEST,
        SessionError::Storage(e) => storage_status(e),
        SessionError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Structured error body: every handler failure becomes this shape.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let error = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            success: false,
            error,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StorageError::not_found("x.mp4")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(SessionError::NoMedia).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(SessionError::EmptyQuestion).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GeminiError::MissingApiKey).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StorageError::EmptyUpload).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_processing_errors_are_internal() {
        let timeout = GeminiError::ProcessingTimeout {
            last_state: "PROCESSING".to_string(),
            attempts: 30,
        };
        assert_eq!(
            ApiError::from(timeout).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
