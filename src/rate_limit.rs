//! Fixed-window request rate limiting.
//!
//! Counts requests per client key within discrete windows. Every request
//! counts toward its window exactly once, rejected or not, so a burst past
//! the limit does not free room later in the same window. Windows are keyed
//! by client IP (socket peer address, or a configured proxy header).

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::Serialize;
use tracing::warn;

use crate::auth::{ClientIpHeader, extract_client_ip};

/// Per-key counter for the current window.
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Rate limiting configuration and state. Owns the window table; entries
/// are created lazily per key and live for the process lifetime.
pub struct RateLimitConfig {
    window: Duration,
    max: u32,
    client_ip_header: Option<ClientIpHeader>,
    windows: DashMap<String, RateWindow>,
}

impl RateLimitConfig {
    pub fn new(window_ms: u64, max: u32, client_ip_header: Option<ClientIpHeader>) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            max,
            client_ip_header,
            windows: DashMap::new(),
        }
    }

    /// Count one request for `key` and decide admission. The map's entry
    /// guard serializes racing requests for the same key, so two requests
    /// cannot both observe the last free slot.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(key.to_string()).or_insert(RateWindow {
            count: 0,
            window_start: now,
        });

        if now.duration_since(window.window_start) >= self.window {
            window.count = 0;
            window.window_start = now;
        }

        window.count = window.count.saturating_add(1);
        window.count <= self.max
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

fn reject(status: StatusCode, message: &'static str) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

/// Middleware bounding request throughput per client key.
pub async fn rate_limit(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let key = match extract_client_ip(&request, config.client_ip_header) {
        Ok(ip) => ip,
        Err(reason) => {
            warn!(reason, "Unable to determine client IP for rate limiting");
            return reject(StatusCode::FORBIDDEN, "Unable to determine client IP.");
        }
    };

    if config.check(&key) {
        next.run(request).await
    } else {
        reject(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
    }
}
