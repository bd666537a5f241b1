use pagetree_core::bulk::{DEFAULT_ASYNC_THRESHOLD, MAX_BULK_SIZE};
use pagetree_core::locking::{validate_lock_ttl, DEFAULT_LOCK_TTL_MINS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background bulk runs after shutdown starts
    /// (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT verification settings.
    pub jwt: JwtConfig,
    /// Lifetime of a resource lock in minutes (default: `30`).
    pub lock_ttl_mins: i64,
    /// Bulk batches larger than this run in the background (default: `50`).
    pub bulk_async_threshold: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `LOCK_TTL_MINS`        | `30` (1..=240)             |
    /// | `BULK_ASYNC_THRESHOLD` | `50` (at most 500)         |
    ///
    /// # Panics
    ///
    /// Panics on malformed or out-of-range values so misconfiguration fails
    /// at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let lock_ttl_mins: i64 = std::env::var("LOCK_TTL_MINS")
            .unwrap_or_else(|_| DEFAULT_LOCK_TTL_MINS.to_string())
            .parse()
            .expect("LOCK_TTL_MINS must be a valid i64");
        if let Err(e) = validate_lock_ttl(lock_ttl_mins) {
            panic!("Invalid LOCK_TTL_MINS: {e}");
        }

        let bulk_async_threshold: usize = std::env::var("BULK_ASYNC_THRESHOLD")
            .unwrap_or_else(|_| DEFAULT_ASYNC_THRESHOLD.to_string())
            .parse()
            .expect("BULK_ASYNC_THRESHOLD must be a valid usize");
        assert!(
            bulk_async_threshold <= MAX_BULK_SIZE,
            "BULK_ASYNC_THRESHOLD must be at most {MAX_BULK_SIZE}"
        );

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            lock_ttl_mins,
            bulk_async_threshold,
        }
    }
}
