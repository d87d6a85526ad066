//! Error types for yobot-hooks
//!
//! Accessor failures map onto gateway statuses so a webhook sender can tell
//! "Airtable refused this" (502/504) apart from "your request was wrong"
//! (400/404).

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use yobot_tables::AccessorError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown logical table (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Table accessor failure
    #[error(transparent)]
    Accessor(#[from] AccessorError),
}

/// Malformed JSON, wrong content type and similar body failures
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Accessor(err) => match err {
                AccessorError::Configuration(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                AccessorError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
                AccessorError::RateLimited { .. } => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_RATE_LIMITED")
                }
                AccessorError::Authentication { .. } => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_AUTH_FAILED")
                }
                AccessorError::Remote { .. }
                | AccessorError::Connection { .. }
                | AccessorError::Decode { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let upstream_status = match &self {
            ApiError::Accessor(err) => err.status(),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "Request failed upstream");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "upstream_status": upstream_status,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
