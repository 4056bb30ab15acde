//! Error types for wavetrust-ta
//!
//! Failure taxonomy and its HTTP mapping: caller-fixable input problems
//! map to 400, oversized payloads to 413, a failed remote fetch that was
//! the sole data source to 502, and anything unexpected to 500. Upstream
//! classifier failures never surface here -- the aggregator recovers them
//! into neutral signals.

use crate::services::normalizer::NormalizeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Artifact exceeds the configured maximum (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Required remote fetch failed (502)
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<NormalizeError> for ApiError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            NormalizeError::FetchFailed(_) => ApiError::Upstream(err.to_string()),
            NormalizeError::InvalidEncoding(_)
            | NormalizeError::NoSource
            | NormalizeError::EmptyPayload
            | NormalizeError::RemoteTooLarge => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "ok": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
