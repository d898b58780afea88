//! Repository for the `events` table.
//!
//! There is deliberately no method that writes `attending`; the RSVP store
//! owns that column.

use campus_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::{CreateEvent, Event};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, description, location, starts_at, capacity, attending, \
                       created_by, created_at, updated_at";

/// Provides create/read/delete operations for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event with `attending = 0`, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEvent,
        created_by: Option<DbId>,
    ) -> Result<Event, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (title, description, location, starts_at, capacity, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(&input.location)
            .bind(input.starts_at)
            .bind(input.capacity)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find an event by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List events newest-first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Hard-delete an event. Its RSVPs are removed by `ON DELETE CASCADE`.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
