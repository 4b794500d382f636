//! API error types and conversions

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::types::Envelope;
use crate::error::FeverError;
use crate::storage::StorageError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing request fields
    InvalidRequest(String),

    /// Resource not found
    NotFound(String),

    /// Storage operation failed
    StorageError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match self {
            ApiError::InvalidRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::StorageError(msg) => {
                // the cause stays in the log, clients get a generic message
                error!("request failed: {}", msg);
                "Internal server error".to_string()
            }
        };

        (status, Json(Envelope::error(detail))).into_response()
    }
}

impl From<FeverError> for ApiError {
    fn from(err: FeverError) -> Self {
        match err {
            FeverError::Validation(msg) => ApiError::InvalidRequest(msg),
            err @ FeverError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            FeverError::Persistence(err) => err.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}
