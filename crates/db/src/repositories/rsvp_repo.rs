//! Repository for the `event_rsvps` table.
//!
//! Reads are public. The write primitives are crate-private: the only caller
//! is [`PgRsvpStore`](crate::PgRsvpStore), which pairs every row change with
//! its `attending` delta inside one transaction.

use campus_core::rsvp::{RsvpStatus, StatusCounts};
use campus_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::rsvp::RsvpRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "event_id, user_id, status, created_at, updated_at";

/// Provides queries over RSVP rows.
pub struct RsvpRepo;

impl RsvpRepo {
    /// Find the RSVP for one `(event, user)` pair.
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
        user_id: DbId,
    ) -> Result<Option<RsvpRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM event_rsvps WHERE event_id = $1 AND user_id = $2");
        sqlx::query_as::<_, RsvpRow>(&query)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// List RSVPs for an event ordered by last status change, then user ID.
    pub async fn list_for_event<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
        status: Option<RsvpStatus>,
    ) -> Result<Vec<RsvpRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM event_rsvps \
             WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY updated_at ASC, user_id ASC"
        );
        sqlx::query_as::<_, RsvpRow>(&query)
            .bind(event_id)
            .bind(status.map(RsvpStatus::as_str))
            .fetch_all(executor)
            .await
    }

    /// Count RSVP rows per status for an event. Missing statuses count as zero.
    pub async fn count_by_status<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
    ) -> Result<StatusCounts, sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM event_rsvps WHERE event_id = $1 GROUP BY status",
        )
        .bind(event_id)
        .fetch_all(executor)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            match status.parse::<RsvpStatus>() {
                Ok(status) => counts.add(status, n),
                Err(_) => tracing::warn!(event_id, status = %status, "Skipping unknown RSVP status"),
            }
        }
        Ok(counts)
    }

    /// Insert-or-update the RSVP for a pair. `updated_at` records the change.
    pub(crate) async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
        user_id: DbId,
        status: RsvpStatus,
    ) -> Result<RsvpRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO event_rsvps (event_id, user_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, clock_timestamp(), clock_timestamp()) \
             ON CONFLICT (event_id, user_id) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 updated_at = clock_timestamp() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RsvpRow>(&query)
            .bind(event_id)
            .bind(user_id)
            .bind(status.as_str())
            .fetch_one(executor)
            .await
    }

    /// Delete the RSVP for a pair, returning the removed row.
    pub(crate) async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
        user_id: DbId,
    ) -> Result<Option<RsvpRow>, sqlx::Error> {
        let query = format!(
            "DELETE FROM event_rsvps WHERE event_id = $1 AND user_id = $2 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RsvpRow>(&query)
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Apply `attending = attending + delta` as a single statement.
    ///
    /// Returns `false` if the event does not exist.
    pub(crate) async fn adjust_attending<'e, E: PgExecutor<'e>>(
        executor: E,
        event_id: DbId,
        delta: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE events SET attending = attending + $2 WHERE id = $1")
            .bind(event_id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
