//! Caller authentication: token transport and the authentication gate.
//!
//! A single signed, expiring token identifies the caller. It travels in an
//! HttpOnly session cookie, with an `Authorization: Bearer` header kept as a
//! read-only fallback for legacy non-cookie clients.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;

pub use cookie::{
    TOKEN_COOKIE_NAME, bearer_token, clear_cookie, get_cookie, read_token, session_cookie,
};
pub use errors::{AuthError, AuthErrorKind};
pub use extractors::{Auth, AuthenticatedUser};
pub use ip::{ClientIpHeader, HasHeadersAndExtensions, extract_client_ip};
pub use state::HasAuthState;
