//! Tests for the CSRF gate.
//!
//! Safe methods pass without a proof header; state-changing methods
//! must carry the shared secret, and rejected requests never reach the
//! rate limiter.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common::*;
use serde_json::json;

/// Build a POST without the CSRF proof header.
fn post_without_csrf(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", TEST_IP)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a POST with an arbitrary CSRF proof value.
fn post_with_csrf(uri: &str, proof: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-forwarded-for", TEST_IP)
        .header(CSRF_HEADER, proof)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_get_passes_without_csrf_header() {
    let TestApp { app, .. } = setup().await;

    // Unauthenticated, so 401 from the auth gate, not 403 from CSRF.
    let request = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .header("x-forwarded-for", TEST_IP)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_post_without_csrf_header_is_forbidden() {
    let TestApp { app, .. } = setup().await;

    let response = send(
        &app,
        post_without_csrf(
            "/auth/signup",
            json!({
                "username": "alice_a",
                "password": "password123",
                "name": "Alice",
                "email": "alice@example.com",
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed CSRF check");
}

#[tokio::test]
async fn test_post_with_wrong_csrf_proof_is_forbidden() {
    let TestApp { app, .. } = setup().await;

    let response = send(
        &app,
        post_with_csrf(
            "/auth/signup",
            "not-the-real-proof",
            json!({
                "username": "alice_a",
                "password": "password123",
                "name": "Alice",
                "email": "alice@example.com",
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed CSRF check");
}

#[tokio::test]
async fn test_missing_and_wrong_proof_rejections_match() {
    let TestApp { app, .. } = setup().await;

    let missing = send(&app, post_without_csrf("/auth/logout", json!({}))).await;
    let missing_status = missing.status();
    let missing_body = body_json(missing).await;

    let wrong = send(
        &app,
        post_with_csrf("/auth/logout", "wrong-proof", json!({})),
    )
    .await;

    // Absent and invalid proofs are indistinguishable to the caller.
    assert_eq!(missing_status, wrong.status());
    assert_eq!(missing_body["error"], body_json(wrong).await["error"]);
}

#[tokio::test]
async fn test_post_with_valid_proof_passes() {
    let TestApp { app, .. } = setup().await;

    // The common helpers send the correct proof; a signup going through
    // proves the gate admits it.
    signup(&app, "alice_a").await;
}

#[tokio::test]
async fn test_csrf_rejection_does_not_consume_rate_limit() {
    let TestApp { app, .. } = setup_with(TestOptions {
        rate_limit_max: 1,
        ..TestOptions::default()
    })
    .await;

    // CSRF rejections happen before the limiter, so none of these
    // consume the single slot in the window.
    for _ in 0..3 {
        let response = send(&app, post_without_csrf("/auth/logout", json!({}))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    // The slot is still available for a request that clears the gate.
    let response = send(&app, get("/auth/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // And now the window is exhausted.
    let response = send(&app, get("/auth/me", None)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
