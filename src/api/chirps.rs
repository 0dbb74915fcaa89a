//! Chirp CRUD endpoints.
//!
//! Every route requires an authenticated caller; mutation of another
//! user's chirp is forbidden.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt, validate_uuid};
use crate::auth::Auth;
use crate::db::{Chirp, Database};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

/// State for chirp endpoints.
#[derive(Clone)]
pub struct ChirpsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub lookup_timeout: Duration,
}

impl_has_auth_state!(ChirpsState);

pub fn router(state: ChirpsState) -> Router {
    Router::new()
        .route("/", get(list_chirps).post(create_chirp))
        .route(
            "/{uuid}",
            get(get_chirp).put(update_chirp).delete(delete_chirp),
        )
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct ListParams {
    username: Option<String>,
}

#[derive(Deserialize)]
struct ChirpRequest {
    text: String,
}

#[derive(Serialize)]
struct ChirpResponse {
    id: String,
    text: String,
    created_at: String,
    username: String,
    name: String,
    url: Option<String>,
}

impl From<Chirp> for ChirpResponse {
    fn from(chirp: Chirp) -> Self {
        Self {
            id: chirp.uuid,
            text: chirp.text,
            created_at: chirp.created_at,
            username: chirp.username,
            name: chirp.name,
            url: chirp.url,
        }
    }
}

// --- Helpers ---

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().len() < 3 {
        return Err(ApiError::bad_request(
            "text should be at least 3 characters",
        ));
    }
    Ok(())
}

async fn find_chirp(db: &Database, uuid: &str) -> Result<Chirp, ApiError> {
    validate_uuid(uuid)?;
    db.chirps()
        .get(uuid)
        .await
        .db_err("Failed to get chirp")?
        .ok_or_else(|| ApiError::not_found(format!("Chirp id({}) not found", uuid)))
}

// --- Handlers ---

async fn list_chirps(
    State(state): State<ChirpsState>,
    Auth(_user): Auth,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let chirps = match params.username.as_deref() {
        Some(username) => state
            .db
            .chirps()
            .list_by_username(username)
            .await
            .db_err("Failed to list chirps")?,
        None => state
            .db
            .chirps()
            .list_all()
            .await
            .db_err("Failed to list chirps")?,
    };

    Ok(Json(
        chirps
            .into_iter()
            .map(ChirpResponse::from)
            .collect::<Vec<_>>(),
    ))
}

async fn get_chirp(
    State(state): State<ChirpsState>,
    Auth(_user): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chirp = find_chirp(&state.db, &uuid).await?;
    Ok(Json(ChirpResponse::from(chirp)))
}

async fn create_chirp(
    State(state): State<ChirpsState>,
    Auth(user): Auth,
    Json(payload): Json<ChirpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&payload.text)?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .chirps()
        .create(&uuid, payload.text.trim(), user.user_id)
        .await
        .db_err("Failed to create chirp")?;

    let chirp = find_chirp(&state.db, &uuid).await?;
    Ok((StatusCode::CREATED, Json(ChirpResponse::from(chirp))))
}

async fn update_chirp(
    State(state): State<ChirpsState>,
    Auth(user): Auth,
    Path(uuid): Path<String>,
    Json(payload): Json<ChirpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_text(&payload.text)?;

    let chirp = find_chirp(&state.db, &uuid).await?;
    if chirp.user_id != user.user_id {
        return Err(ApiError::forbidden("Cannot modify another user's chirp"));
    }

    state
        .db
        .chirps()
        .update(&uuid, payload.text.trim())
        .await
        .db_err("Failed to update chirp")?;

    let updated = find_chirp(&state.db, &uuid).await?;
    Ok(Json(ChirpResponse::from(updated)))
}

async fn delete_chirp(
    State(state): State<ChirpsState>,
    Auth(user): Auth,
    Path(uuid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chirp = find_chirp(&state.db, &uuid).await?;
    if chirp.user_id != user.user_id {
        return Err(ApiError::forbidden("Cannot delete another user's chirp"));
    }

    state
        .db
        .chirps()
        .delete(&uuid)
        .await
        .db_err("Failed to delete chirp")?;

    Ok(StatusCode::NO_CONTENT)
}
