//! Cross-site request forgery gate.
//!
//! State-free middleware evaluated once per request. Safe methods pass
//! unconditionally; every other method must carry a proof header whose
//! value verifies against a pre-hashed shared secret. The comparison is an
//! argon2 hash verification, never plain string equality against a stored
//! plaintext.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{self, PasswordHash, SaltString},
};
use rand_core::OsRng;
use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

/// Request header carrying the CSRF proof.
pub const CSRF_HEADER: &str = "chirper-csrf-token";

/// CSRF configuration: the argon2 PHC hash of the shared secret, read-only
/// after startup.
pub struct CsrfConfig {
    secret_hash: String,
}

impl CsrfConfig {
    pub fn new(secret_hash: impl Into<String>) -> Self {
        Self {
            secret_hash: secret_hash.into(),
        }
    }

    /// Verify a proof against the stored hash. `Ok(false)` is a mismatch;
    /// `Err` means the stored hash itself is unusable.
    fn verify(&self, proof: &str) -> Result<bool, password_hash::Error> {
        let hash = PasswordHash::new(&self.secret_hash)?;
        match Argon2::default().verify_password(proof.as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Hash a plaintext CSRF secret into the PHC string the gate consumes.
/// Used when provisioning the shared secret.
pub fn hash_csrf_secret(secret: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

#[derive(Debug)]
enum CsrfRejection {
    Missing,
    Invalid,
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CsrfRejection::Missing | CsrfRejection::Invalid => {
                (StatusCode::FORBIDDEN, "Failed CSRF check")
            }
            CsrfRejection::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Middleware rejecting mutating requests without a valid CSRF proof.
pub async fn csrf_gate(
    State(config): State<Arc<CsrfConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return next.run(request).await;
    }

    // Origin is logged with rejections for abuse diagnostics, nothing more.
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let Some(proof) = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        warn!(origin = %origin, "Missing required \"{}\" header", CSRF_HEADER);
        return CsrfRejection::Missing.into_response();
    };

    // Argon2 verification is CPU-heavy; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || config.verify(&proof)).await;

    match result {
        Ok(Ok(true)) => next.run(request).await,
        Ok(Ok(false)) => {
            warn!(origin = %origin, "Value provided in \"{}\" header does not validate", CSRF_HEADER);
            CsrfRejection::Invalid.into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "CSRF secret hash is unusable");
            CsrfRejection::Internal.into_response()
        }
        Err(e) => {
            error!(error = %e, "CSRF verification task failed");
            CsrfRejection::Internal.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_proof_verifies() {
        let hash = hash_csrf_secret("shared-csrf-secret").unwrap();
        let config = CsrfConfig::new(hash);

        assert!(config.verify("shared-csrf-secret").unwrap());
    }

    #[test]
    fn test_mismatched_proof_is_rejected() {
        let hash = hash_csrf_secret("shared-csrf-secret").unwrap();
        let config = CsrfConfig::new(hash);

        assert!(!config.verify("guessed-secret").unwrap());
        assert!(!config.verify("").unwrap());
    }

    #[test]
    fn test_garbage_stored_hash_is_an_error() {
        let config = CsrfConfig::new("not-a-phc-string");

        assert!(config.verify("anything").is_err());
    }
}
