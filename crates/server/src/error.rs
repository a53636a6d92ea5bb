//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flowpan_engine::UploadError;
use flowpan_storage::StorageError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unavailable(_) => "unavailable",
            Self::Upload(e) => e.code(),
            Self::Storage(StorageError::NotFound(_)) => "not_found",
            Self::Storage(StorageError::HashMismatch { .. }) => "corrupted_chunk",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upload(e) => match e {
                UploadError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                UploadError::SessionExpired(_) => StatusCode::GONE,
                UploadError::SessionTerminal { .. }
                | UploadError::IntegrityConflict { .. }
                | UploadError::FileHashMismatch { .. } => StatusCode::CONFLICT,
                UploadError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
                UploadError::InvalidPlan(_)
                | UploadError::PlanMismatch { .. }
                | UploadError::HashMismatch { .. }
                | UploadError::ChunkIndexOutOfRange { .. }
                | UploadError::ChunkSizeMismatch { .. } => StatusCode::BAD_REQUEST,
            },
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::HashMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
