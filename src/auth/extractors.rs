//! Axum extractor resolving the authenticated caller.
//!
//! Protected handlers opt in by taking `Auth` as an argument; routes
//! without it are public. The gate reads the token off the wire, verifies
//! it, resolves the identity through the store, and attaches the caller to
//! the request. Every failure mode maps to the same generic rejection.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, error};

use super::cookie::read_token;
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthState;
use crate::jwt::TokenError;

/// Caller resolved by the authentication gate.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Subject id (user UUID) from the verified token
    pub subject_id: String,
    /// Database row id of the resolved user
    pub user_id: i64,
    /// Raw token string the caller presented
    pub token: String,
}

/// Extractor for endpoints that require authentication.
pub struct Auth(pub AuthenticatedUser);

/// Core authentication logic: read token, verify, resolve identity.
async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    let token = read_token(&parts.headers)
        .ok_or(AuthErrorKind::TokenMissing)?
        .to_string();

    let claims = state.jwt().verify(&token).map_err(|e| match e {
        TokenError::Expired => AuthErrorKind::TokenExpired,
        TokenError::BadSignature => AuthErrorKind::TokenBadSignature,
        _ => AuthErrorKind::TokenMalformed,
    })?;

    // The token may outlive the account it was issued for.
    let lookup = state.db().users().find_by_uuid(&claims.sub);
    let user = tokio::time::timeout(state.lookup_timeout(), lookup)
        .await
        .map_err(|_| {
            error!("Identity lookup exceeded its budget");
            AuthErrorKind::UpstreamFailure
        })?
        .map_err(|e| {
            error!("Failed to look up user: {}", e);
            AuthErrorKind::UpstreamFailure
        })?
        .ok_or(AuthErrorKind::IdentityNotFound)?;

    Ok(AuthenticatedUser {
        subject_id: user.uuid,
        user_id: user.id,
        token,
    })
}

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state).await.map(Auth).map_err(|kind| {
            debug!(kind = ?kind, "Authentication rejected");
            AuthError::new(kind)
        })
    }
}
