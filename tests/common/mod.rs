#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use chirper::{ServerConfig, auth::ClientIpHeader, create_app, csrf::hash_csrf_secret, db::Database};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_IP: &str = "127.0.0.1";
pub const CSRF_PROOF: &str = "test-csrf-proof";
pub const CSRF_HEADER: &str = "chirper-csrf-token";
pub const JWT_SECRET: &[u8] = b"test-jwt-secret-at-least-32-bytes!!";

pub struct TestOptions {
    pub token_lifetime_secs: u64,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max: u32,
    pub lookup_timeout_ms: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            token_lifetime_secs: 3600,
            rate_limit_window_ms: 60_000,
            // High enough that only the rate-limit tests ever hit it
            rate_limit_max: 1000,
            lookup_timeout_ms: 3000,
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Database,
}

pub async fn setup() -> TestApp {
    setup_with(TestOptions::default()).await
}

pub async fn setup_with(options: TestOptions) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    setup_with_db(options, db)
}

pub fn setup_with_db(options: TestOptions, db: Database) -> TestApp {
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: JWT_SECRET.to_vec(),
        token_lifetime_secs: options.token_lifetime_secs,
        csrf_secret_hash: hash_csrf_secret(CSRF_PROOF).expect("Failed to hash CSRF secret"),
        rate_limit_window_ms: options.rate_limit_window_ms,
        rate_limit_max: options.rate_limit_max,
        allowed_origin: None,
        secure_cookies: false,
        // Header-based extraction so tests control the rate-limit key
        client_ip_header: Some(ClientIpHeader::XForwardedFor),
        lookup_timeout_ms: options.lookup_timeout_ms,
    };
    TestApp {
        app: create_app(&config),
        db,
    }
}

// --- Request builders ---

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", TEST_IP);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", TEST_IP)
        .header(CSRF_HEADER, CSRF_PROOF)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    json_request("POST", uri, token, body)
}

pub fn put_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    json_request("PUT", uri, token, body)
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("x-forwarded-for", TEST_IP)
        .header(CSRF_HEADER, CSRF_PROOF);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone()
        .oneshot(request)
        .await
        .expect("Request failed")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

// --- Flow helpers ---

/// Sign up a user and return the issued token.
pub async fn signup(app: &Router, username: &str) -> String {
    let response = send(
        app,
        post_json(
            "/auth/signup",
            None,
            json!({
                "username": username,
                "password": "password123",
                "name": "Test User",
                "email": format!("{}@example.com", username),
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["token"].as_str().expect("No token in body").to_string()
}

/// Create a chirp and return its id.
pub async fn create_chirp(app: &Router, token: &str, text: &str) -> String {
    let response = send(
        app,
        post_json("/chirps", Some(token), json!({ "text": text })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["id"].as_str().expect("No id in body").to_string()
}

// --- Cookie helpers ---

/// Extract Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Find the session cookie value (the `token=` cookie) in Set-Cookie headers.
pub fn session_cookie_value(cookies: &[String]) -> Option<String> {
    cookies.iter().find_map(|c| {
        let value = c.strip_prefix("token=")?;
        Some(value.split(';').next().unwrap_or("").to_string())
    })
}
