//! API error types for the engage server.
//!
//! Maps core domain errors to HTTP status codes and JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engage_core::error::{PipelineError, PostError, StorageError};
use serde_json::json;

/// API error type for route handlers.
pub enum ApiError {
    /// Storage/database error.
    Storage(StorageError),
    /// Analysis pipeline error.
    Pipeline(PipelineError),
    /// Posting error surfaced by a platform poster.
    Post(PostError),
    /// Requested resource not found.
    NotFound(String),
    /// Bad request (invalid body/query parameters, etc.).
    BadRequest(String),
    /// Conflict (e.g. cancelling an item already being posted).
    Conflict(String),
    /// Explicit rate limit, with the wait the caller should honor.
    RateLimited { wait_seconds: u64 },
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        Self::Post(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Storage(e) => {
                tracing::error!("storage error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::Pipeline(e) => {
                tracing::error!("pipeline error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::Post(e) => {
                let status = if e.is_retryable() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (status, e.to_string())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::RateLimited { wait_seconds } => {
                let body = axum::Json(json!({
                    "error": "rate limited",
                    "wait_seconds": wait_seconds,
                }));
                return (StatusCode::TOO_MANY_REQUESTS, body).into_response();
            }
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
