//! CLI argument parsing, validation, and startup helpers.

use axum::http::HeaderValue;
use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::auth::ClientIpHeader;
use crate::db::Database;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Chirper", about = "A small social-post service with token gatekeeping")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "chirper.db")]
    pub database: String,

    /// Identity token lifetime in seconds
    #[arg(long, default_value = "172800")]
    pub token_lifetime: u64,

    /// Path to file containing the token signing secret. Prefer using the
    /// JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Path to file containing the argon2 PHC hash of the CSRF shared
    /// secret. Prefer using the CSRF_SECRET_HASH env var instead
    #[arg(long)]
    pub csrf_secret_file: Option<String>,

    /// Rate limit window in milliseconds
    #[arg(long, default_value = "60000")]
    pub rate_limit_window_ms: u64,

    /// Maximum requests per client per window
    #[arg(long, default_value = "100")]
    pub rate_limit_max: u32,

    /// Allowed cross-origin source for cookie-bearing requests
    #[arg(long)]
    pub allowed_origin: Option<String>,

    /// Set the Secure flag on session cookies (required when serving HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Header to read the client IP from (requires running behind a proxy)
    #[arg(long, value_enum)]
    pub client_ip_header: Option<ClientIpHeader>,

    /// Budget in milliseconds for identity-store lookups
    #[arg(long, default_value = "3000")]
    pub lookup_timeout_ms: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the token signing secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load the pre-hashed CSRF shared secret from environment variable or
/// file, and check it parses as a PHC string so the gate cannot hit a
/// malformed hash at request time.
pub fn load_csrf_secret_hash(csrf_secret_file: Option<&str>) -> Option<String> {
    let hash = if let Ok(hash) = std::env::var("CSRF_SECRET_HASH") {
        hash
    } else if let Some(path) = csrf_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read CSRF secret file");
                return None;
            }
        }
    } else {
        error!(
            "CSRF secret hash is required. Set CSRF_SECRET_HASH environment variable or use --csrf-secret-file"
        );
        return None;
    };

    if let Err(e) = argon2::password_hash::PasswordHash::new(&hash) {
        error!(error = %e, "CSRF secret hash is not a valid PHC string");
        return None;
    }

    Some(hash)
}

/// Parse and validate the allowed CORS origin.
/// Returns None and logs an error if the value is not a valid header value.
pub fn validate_allowed_origin(origin: Option<&str>) -> Result<Option<HeaderValue>, ()> {
    match origin {
        None => Ok(None),
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                error!(origin = %origin, error = %e, "Invalid allowed-origin value");
                Err(())
            }
        },
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    csrf_secret_hash: String,
    allowed_origin: Option<HeaderValue>,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        token_lifetime_secs: args.token_lifetime,
        csrf_secret_hash,
        rate_limit_window_ms: args.rate_limit_window_ms,
        rate_limit_max: args.rate_limit_max,
        allowed_origin,
        secure_cookies: args.secure_cookies,
        client_ip_header: args.client_ip_header,
        lookup_timeout_ms: args.lookup_timeout_ms,
    }
}
