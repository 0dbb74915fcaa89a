pub mod api;
pub mod auth;
pub mod cli;
pub mod csrf;
pub mod db;
pub mod jwt;
pub mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use auth::ClientIpHeader;
use csrf::{CSRF_HEADER, CsrfConfig, csrf_gate};
use db::Database;
use jwt::JwtConfig;
use rate_limit::{RateLimitConfig, rate_limit};

pub struct ServerConfig {
    /// Database handle (cloneable, uses a connection pool internally)
    pub db: Database,
    /// Secret for signing identity tokens
    pub jwt_secret: Vec<u8>,
    /// Identity token lifetime in seconds
    pub token_lifetime_secs: u64,
    /// Argon2 PHC hash of the CSRF shared secret
    pub csrf_secret_hash: String,
    /// Rate limit window in milliseconds
    pub rate_limit_window_ms: u64,
    /// Maximum requests per key per window
    pub rate_limit_max: u32,
    /// Allowed cross-origin source for cookie-bearing requests
    pub allowed_origin: Option<HeaderValue>,
    /// Whether to set the Secure flag on cookies (true in production with HTTPS)
    pub secure_cookies: bool,
    /// Header to read the client IP from (requires running behind a proxy)
    pub client_ip_header: Option<ClientIpHeader>,
    /// Budget in milliseconds for identity-store lookups
    pub lookup_timeout_ms: u64,
}

/// Create the application router with the given configuration.
///
/// Gate order per request: CSRF check (skipped for safe methods), then the
/// rate limiter (always), then route dispatch; protected handlers resolve
/// the caller through the `Auth` extractor. The first rejection
/// short-circuits the rest of the chain, and a terminal panic handler
/// converts anything escaping it into a generic 500.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));
    let csrf = Arc::new(CsrfConfig::new(config.csrf_secret_hash.clone()));
    let limiter = Arc::new(RateLimitConfig::new(
        config.rate_limit_window_ms,
        config.rate_limit_max,
        config.client_ip_header,
    ));

    let api_router = api::create_api_router(
        config.db.clone(),
        jwt,
        config.token_lifetime_secs,
        config.secure_cookies,
        Duration::from_millis(config.lookup_timeout_ms),
    );

    // Layers run top-down for a request: trace, panic catcher, CORS, CSRF
    // gate, rate limiter, then the routes.
    let mut app = api_router
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(middleware::from_fn_with_state(csrf, csrf_gate));

    if let Some(origin) = &config.allowed_origin {
        app = app.layer(cors_layer(origin.clone()));
    }

    app.layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the single allowed cross-origin client. Credentials are allowed
/// so the session cookie flows with API calls.
fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CSRF_HEADER),
        ])
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Terminal handler: log the panic, answer with a generic body.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Server error" })),
    )
        .into_response()
}

/// Run the server on the given listener. This function blocks until the
/// server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
