//! # API Errors
//!
//! Maps `SocialError` onto HTTP status codes with a JSON body:
//!
//! ```json
//! { "error": "User not found: ana", "kind": "not_found" }
//! ```

use audioly_core::{ErrorKind, SocialError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// A `SocialError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub SocialError);

impl From<SocialError> for ApiError {
    fn from(error: SocialError) -> Self {
        Self(error)
    }
}

/// Wire name and status for an error kind.
pub fn classify(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
        ErrorKind::InvalidOperation => (StatusCode::BAD_REQUEST, "invalid_operation"),
        ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ErrorKind::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = classify(self.0.kind());

        // Storage details stay in the log.
        let message = match self.0.kind() {
            ErrorKind::Internal => {
                tracing::error!(event = "storage_failure", error = %self.0, "Request failed");
                "Internal storage error".to_string()
            }
            _ => self.0.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
