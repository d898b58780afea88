use std::sync::Arc;

use campus_core::retry::RetryPolicy;
use campus_core::rsvp::RsvpManager;
use campus_db::PgRsvpStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: campus_db::DbPool,
    /// Server configuration (JWT validation, RSVP tuning).
    pub config: Arc<ServerConfig>,
    /// The only path through which RSVP rows and `attending` counters change.
    pub rsvp: Arc<RsvpManager<PgRsvpStore>>,
    /// Applied around RSVP mutations that fail with a retryable conflict.
    pub retry: RetryPolicy,
}

impl AppState {
    /// Wire the RSVP manager and retry policy from `config`.
    pub fn new(pool: campus_db::DbPool, config: ServerConfig) -> Self {
        let store = PgRsvpStore::new(pool.clone(), config.rsvp.lock_timeout());
        Self {
            pool,
            rsvp: Arc::new(RsvpManager::new(store)),
            retry: config.rsvp.retry_policy(),
            config: Arc::new(config),
        }
    }
}
