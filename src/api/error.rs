//! Shared error handling for API endpoints.
//!
//! Handlers return `ApiError` and let `IntoResponse` shape the JSON body.
//! Messages must be safe to show callers; anything diagnostic goes to the
//! log, not the response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// Handler error carrying the response status and a caller-safe message.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    /// Log the real cause, answer with a generic 500.
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Extension trait for concise error mapping on Results. Any failure from
/// storage or a blocking task becomes a logged, generic internal error.
pub trait ResultExt<T> {
    fn db_err(self, context: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal(context, e))
    }
}

/// Validate a UUID path parameter before it reaches a query.
pub fn validate_uuid(uuid: &str) -> Result<(), ApiError> {
    uuid::Uuid::parse_str(uuid)
        .map(|_| ())
        .map_err(|_| ApiError::bad_request("Invalid UUID format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_hides_cause() {
        let error = ApiError::internal("Failed to list chirps", "disk I/O error");
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Server error");
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("8c5b9a2e-3f41-4a7b-9c8d-1e2f3a4b5c6d").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
        assert!(validate_uuid("8c5b9a2e-3f41-4a7b-9c8d-1e2f3a4b5c6d-extra").is_err());
    }
}
