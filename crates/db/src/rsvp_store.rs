//! PostgreSQL implementation of the RSVP persistence contract.
//!
//! Each [`PgRsvpUnit`] is one transaction. It sets a transaction-local
//! `lock_timeout`, then takes a transaction-scoped advisory lock derived from
//! the `(event_id, user_id)` key, so concurrent upserts for the same pair are
//! serialized while different pairs never wait on each other. The lock is
//! released on commit or rollback.

use std::time::Duration;

use async_trait::async_trait;
use campus_core::error::CoreError;
use campus_core::rsvp::{
    EventSnapshot, Rsvp, RsvpKey, RsvpStatus, RsvpStore, RsvpUnit, StatusCounts,
};
use campus_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{classify_store_error, sqlstate, FOREIGN_KEY_VIOLATION};
use crate::repositories::{EventRepo, RsvpRepo};

/// Default bound on lock waits inside an RSVP transaction.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Event columns the RSVP flow reads.
const EVENT_SNAPSHOT_QUERY: &str = "SELECT id, capacity, attending FROM events WHERE id = $1";

/// RSVP store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgRsvpStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgRsvpStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `lock_timeout` setting value; PostgreSQL treats `0` as "wait forever".
    fn lock_timeout_setting(&self) -> String {
        format!("{}ms", self.lock_timeout.as_millis().max(1))
    }
}

fn rows_to_rsvps(rows: Vec<crate::models::rsvp::RsvpRow>) -> Result<Vec<Rsvp>, CoreError> {
    rows.into_iter().map(Rsvp::try_from).collect()
}

#[async_trait]
impl RsvpStore for PgRsvpStore {
    type Unit = PgRsvpUnit;

    async fn get_event(&self, event_id: DbId) -> Result<Option<EventSnapshot>, CoreError> {
        let event = EventRepo::find_by_id(&self.pool, event_id)
            .await
            .map_err(classify_store_error)?;
        Ok(event.as_ref().map(EventSnapshot::from))
    }

    async fn get_rsvp(&self, key: RsvpKey) -> Result<Option<Rsvp>, CoreError> {
        RsvpRepo::find(&self.pool, key.event_id, key.user_id)
            .await
            .map_err(classify_store_error)?
            .map(Rsvp::try_from)
            .transpose()
    }

    async fn list_rsvps(
        &self,
        event_id: DbId,
        status: Option<RsvpStatus>,
    ) -> Result<Vec<Rsvp>, CoreError> {
        let rows = RsvpRepo::list_for_event(&self.pool, event_id, status)
            .await
            .map_err(classify_store_error)?;
        rows_to_rsvps(rows)
    }

    async fn count_by_status(&self, event_id: DbId) -> Result<StatusCounts, CoreError> {
        RsvpRepo::count_by_status(&self.pool, event_id)
            .await
            .map_err(classify_store_error)
    }

    async fn begin(&self, key: RsvpKey) -> Result<PgRsvpUnit, CoreError> {
        let mut tx = self.pool.begin().await.map_err(classify_store_error)?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(self.lock_timeout_setting())
            .execute(&mut *tx)
            .await
            .map_err(classify_store_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key.to_string())
            .execute(&mut *tx)
            .await
            .map_err(classify_store_error)?;

        tracing::trace!(%key, "Acquired RSVP key lock");
        Ok(PgRsvpUnit { key, tx })
    }
}

/// One RSVP transaction holding the advisory lock for its key.
///
/// Dropping it without [`RsvpUnit::commit`] rolls the transaction back.
pub struct PgRsvpUnit {
    key: RsvpKey,
    tx: Transaction<'static, Postgres>,
}

impl PgRsvpUnit {
    /// Map a failed row write, turning a foreign key violation into `NotFound`.
    fn classify_write_error(&self, err: sqlx::Error) -> CoreError {
        if sqlstate(&err).as_deref() != Some(FOREIGN_KEY_VIOLATION) {
            return classify_store_error(err);
        }
        let on_user = match &err {
            sqlx::Error::Database(db_err) => {
                db_err.constraint().is_some_and(|c| c.contains("user_id"))
            }
            _ => false,
        };
        if on_user {
            CoreError::NotFound {
                entity: "User",
                id: self.key.user_id,
            }
        } else {
            CoreError::NotFound {
                entity: "Event",
                id: self.key.event_id,
            }
        }
    }
}

#[async_trait]
impl RsvpUnit for PgRsvpUnit {
    fn key(&self) -> RsvpKey {
        self.key
    }

    async fn get_event(&mut self) -> Result<Option<EventSnapshot>, CoreError> {
        let row: Option<(DbId, i32, i32)> = sqlx::query_as(EVENT_SNAPSHOT_QUERY)
            .bind(self.key.event_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(classify_store_error)?;
        Ok(row.map(|(id, capacity, attending)| EventSnapshot {
            id,
            capacity,
            attending,
        }))
    }

    async fn user_exists(&mut self) -> Result<bool, CoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(self.key.user_id)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(classify_store_error)
    }

    async fn get_rsvp(&mut self) -> Result<Option<Rsvp>, CoreError> {
        RsvpRepo::find(&mut *self.tx, self.key.event_id, self.key.user_id)
            .await
            .map_err(classify_store_error)?
            .map(Rsvp::try_from)
            .transpose()
    }

    async fn upsert_rsvp_row(&mut self, status: RsvpStatus) -> Result<Rsvp, CoreError> {
        let result =
            RsvpRepo::upsert(&mut *self.tx, self.key.event_id, self.key.user_id, status).await;
        match result {
            Ok(row) => Rsvp::try_from(row),
            Err(err) => Err(self.classify_write_error(err)),
        }
    }

    async fn delete_rsvp_row(&mut self) -> Result<Option<Rsvp>, CoreError> {
        RsvpRepo::delete(&mut *self.tx, self.key.event_id, self.key.user_id)
            .await
            .map_err(classify_store_error)?
            .map(Rsvp::try_from)
            .transpose()
    }

    async fn update_event_attending_count(&mut self, delta: i32) -> Result<(), CoreError> {
        let updated = RsvpRepo::adjust_attending(&mut *self.tx, self.key.event_id, delta)
            .await
            .map_err(classify_store_error)?;
        if updated {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "Event",
                id: self.key.event_id,
            })
        }
    }

    async fn commit(self) -> Result<(), CoreError> {
        self.tx.commit().await.map_err(classify_store_error)
    }
}
