use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// Input outside the accepted domain (e.g. an unknown RSVP status).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Lock or transaction contention on a single key. Safe to retry.
    #[error("Conflict (retryable): {0}")]
    ConflictRetryable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failed operation may be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConflictRetryable(_))
    }
}
