//! Signup, login, logout, and caller-identity endpoints.
//!
//! Signup and login issue the identity token and write the session cookie;
//! logout clears it. `/me` is the only protected route here.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{PasswordHash, SaltString},
};
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use crate::auth::{Auth, clear_cookie, session_cookie};
use crate::db::{Database, NewUser};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

/// State for issuance and session endpoints.
#[derive(Clone)]
pub struct AuthApiState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub token_lifetime_secs: u64,
    pub secure_cookies: bool,
    pub lookup_timeout: Duration,
}

impl_has_auth_state!(AuthApiState);

pub fn router(state: AuthApiState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct SignupRequest {
    username: String,
    password: String,
    name: String,
    email: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
    username: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

// --- Helpers ---

/// Hash a password on the blocking pool.
async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .db_err("Password hashing task failed")?
    .db_err("Failed to hash password")
}

/// Verify a password against a stored hash on the blocking pool.
async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&hash) {
            Ok(parsed) => parsed,
            Err(e) => return Err(e),
        };
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    })
    .await
    .db_err("Password verification task failed")?
    .db_err("Failed to verify password")
}

/// Issue a token for a subject and build the matching session cookie.
/// The cookie's Max-Age equals the token's lifetime so both expire together.
fn issue_session(
    state: &AuthApiState,
    subject_id: &str,
) -> Result<(String, String), ApiError> {
    let issued = state
        .jwt
        .issue(subject_id, state.token_lifetime_secs)
        .db_err("Failed to issue token")?;
    let cookie = session_cookie(&issued.token, issued.lifetime, state.secure_cookies);
    Ok((issued.token, cookie))
}

// --- Handlers ---

async fn signup(
    State(state): State<AuthApiState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim().to_string();

    if username.len() < 5 {
        return Err(ApiError::bad_request(
            "username should be at least 5 characters",
        ));
    }
    if payload.password.len() < 5 {
        return Err(ApiError::bad_request(
            "password should be at least 5 characters",
        ));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is missing"));
    }
    if !payload.email.contains('@') {
        return Err(ApiError::bad_request("invalid email"));
    }

    let found = state
        .db
        .users()
        .find_by_username(&username)
        .await
        .db_err("Failed to check username")?;
    if found.is_some() {
        return Err(ApiError::conflict(format!("{} already exists", username)));
    }

    let password_hash = hash_password(payload.password).await?;
    let uuid = uuid::Uuid::new_v4().to_string();

    // The find above races concurrent signups; the unique index is the
    // real arbiter, so its violation is a conflict, not a server error.
    state
        .db
        .users()
        .create(NewUser {
            uuid: uuid.clone(),
            username: username.clone(),
            password_hash,
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_string(),
            url: payload.url,
        })
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                ApiError::conflict(format!("{} already exists", username))
            } else {
                ApiError::internal("Failed to create user", e)
            }
        })?;

    let (token, cookie) = issue_session(&state, &uuid)?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse { token, username }),
    ))
}

async fn login(
    State(state): State<AuthApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .find_by_username(payload.username.trim())
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid user or password"))?;

    let valid = verify_password(payload.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid user or password"));
    }

    let (token, cookie) = issue_session(&state, &user.uuid)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse {
            token,
            username: user.username,
        }),
    ))
}

async fn logout(State(state): State<AuthApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_cookie(state.secure_cookies))],
        Json(MessageResponse {
            message: "User has been logged out".to_string(),
        }),
    )
}

async fn me(
    State(state): State<AuthApiState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let found = state
        .db
        .users()
        .find_by_uuid(&user.subject_id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(TokenResponse {
        token: user.token,
        username: found.username,
    }))
}
