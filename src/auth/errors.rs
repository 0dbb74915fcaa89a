//! Authentication error types.
//!
//! Failure kinds are distinguished internally for logging but collapse to a
//! single generic 401 at the response boundary, so a caller cannot probe
//! which check failed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Internal auth failure kind used by the authentication gate.
#[derive(Debug)]
pub enum AuthErrorKind {
    TokenMissing,
    TokenMalformed,
    TokenBadSignature,
    TokenExpired,
    IdentityNotFound,
    /// Identity store unreachable or over its lookup budget
    UpstreamFailure,
}

/// Authentication rejection returned by the `Auth` extractor.
#[derive(Debug)]
pub struct AuthError {
    kind: AuthErrorKind,
}

impl AuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::TokenMissing
            | AuthErrorKind::TokenMalformed
            | AuthErrorKind::TokenBadSignature
            | AuthErrorKind::TokenExpired
            | AuthErrorKind::IdentityNotFound => StatusCode::UNAUTHORIZED,
            AuthErrorKind::UpstreamFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The generic message exposed to callers. Deliberately identical for
    /// every 401-class failure.
    fn message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => "Not authenticated",
            _ => "Server error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
