use std::time::Duration;

use campus_core::retry::{
    RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
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
    /// How long in-flight requests may drain after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// RSVP lock and retry tuning.
    pub rsvp: RsvpConfig,
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

        let request_timeout_secs = env_or("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs = env_or("SHUTDOWN_TIMEOUT_SECS", 30);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            rsvp: RsvpConfig::from_env(),
        }
    }
}

/// Lock wait and retry settings for RSVP mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsvpConfig {
    /// Upper bound on waiting for a per-(event, user) lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Retries after a retryable conflict before the request fails with 503.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for RsvpConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 2000,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            retry_max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl RsvpConfig {
    /// Load RSVP settings from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `RSVP_LOCK_TIMEOUT_MS`     | `2000`  |
    /// | `RSVP_MAX_RETRIES`         | `3`     |
    /// | `RSVP_RETRY_BASE_DELAY_MS` | `25`    |
    /// | `RSVP_RETRY_MAX_DELAY_MS`  | `500`   |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lock_timeout_ms: env_or("RSVP_LOCK_TIMEOUT_MS", defaults.lock_timeout_ms),
            max_retries: env_or("RSVP_MAX_RETRIES", defaults.max_retries),
            retry_base_delay_ms: env_or("RSVP_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            retry_max_delay_ms: env_or("RSVP_RETRY_MAX_DELAY_MS", defaults.retry_max_delay_ms),
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse.
fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e}")),
        Err(_) => default,
    }
}
