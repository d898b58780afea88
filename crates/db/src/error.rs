//! Mapping of sqlx errors onto the domain error taxonomy.

use campus_core::error::CoreError;

/// PostgreSQL SQLSTATE codes that mean "contention, try again".
const RETRYABLE_SQLSTATES: &[&str] = &[
    "55P03", // lock_not_available (lock_timeout expired)
    "40001", // serialization_failure
    "40P01", // deadlock_detected
];

/// SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for a foreign key violation.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

/// The SQLSTATE code of a database error, if any.
pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Classify a sqlx error raised inside the RSVP store.
///
/// Lock timeouts, serialization failures, deadlocks, pool exhaustion and a
/// duplicate RSVP key become [`CoreError::ConflictRetryable`]; everything else
/// becomes [`CoreError::Internal`].
pub fn classify_store_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::PoolTimedOut = err {
        return CoreError::ConflictRetryable("Timed out acquiring a database connection".into());
    }

    match sqlstate(&err).as_deref() {
        Some(code) if RETRYABLE_SQLSTATES.contains(&code) => {
            CoreError::ConflictRetryable(format!("Database contention ({code}): {err}"))
        }
        Some(UNIQUE_VIOLATION) => {
            CoreError::ConflictRetryable(format!("Concurrent RSVP insert: {err}"))
        }
        _ => {
            tracing::error!(error = %err, "RSVP store database error");
            CoreError::Internal(err.to_string())
        }
    }
}
