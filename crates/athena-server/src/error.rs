//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use athena_core::PipelineError;

/// Body returned with 503 responses.
pub const UNAVAILABLE_MESSAGE: &str =
    "Athena is having trouble responding right now. Please try again in a moment.";

/// API errors.
///
/// Only `BadRequest` carries its message to the client; the others are
/// logged and answered with a generic body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The generation backend failed or is not configured.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::EmptyInput => {
                ApiError::BadRequest("user_input must not be empty".to_string())
            }
            PipelineError::Generation(e) => {
                error!(error = %e, "Generation failed");
                ApiError::ServiceUnavailable(e.to_string())
            }
            PipelineError::Moderation(e) => {
                error!(error = %e, "Moderation failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                UNAVAILABLE_MESSAGE.to_string(),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
