//! Token transport: session cookie plus a legacy bearer-header fallback.

use axum::http::{HeaderMap, header};

/// Cookie name for the identity token.
pub const TOKEN_COOKIE_NAME: &str = "token";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract a token from the Authorization header (legacy clients).
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

/// Read the identity token from a request. The Authorization header takes
/// precedence over the session cookie. `None` means no token was presented,
/// which is an expected outcome, not an error.
pub fn read_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| get_cookie(headers, TOKEN_COOKIE_NAME))
}

/// Build the Set-Cookie value carrying a freshly issued token.
///
/// `max_age_secs` must be the token's remaining lifetime so cookie expiry
/// and token expiry stay in sync. SameSite=None lets the configured
/// cross-origin client send the cookie on API calls.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=None; Path=/; Max-Age={}{}",
        TOKEN_COOKIE_NAME, token, max_age_secs, secure
    )
}

/// Build the Set-Cookie value that clears the session cookie. Idempotent.
pub fn clear_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=None; Path=/; Max-Age=0{}",
        TOKEN_COOKIE_NAME, secure
    )
}
