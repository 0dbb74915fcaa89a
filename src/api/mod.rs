mod auth;
mod chirps;
mod error;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::db::Database;
use crate::jwt::JwtConfig;

/// Create the API router: issuance/session routes under /auth, the
/// protected chirp CRUD under /chirps.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    token_lifetime_secs: u64,
    secure_cookies: bool,
    lookup_timeout: Duration,
) -> Router {
    let auth_state = auth::AuthApiState {
        db: db.clone(),
        jwt: jwt.clone(),
        token_lifetime_secs,
        secure_cookies,
        lookup_timeout,
    };

    let chirps_state = chirps::ChirpsState {
        db,
        jwt,
        lookup_timeout,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/chirps", chirps::router(chirps_state))
}
