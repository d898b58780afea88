//! Persistence contract consumed by [`RsvpManager`](super::RsvpManager).
//!
//! Reads that need no isolation go straight through [`RsvpStore`]. Every
//! mutation happens inside an [`RsvpUnit`] obtained from [`RsvpStore::begin`],
//! which holds the lock for one `(event_id, user_id)` key until it is
//! committed or dropped. Dropping a unit without committing discards all of
//! its writes.

use async_trait::async_trait;

use super::{EventSnapshot, Rsvp, RsvpKey, RsvpStatus, StatusCounts};
use crate::error::CoreError;
use crate::types::DbId;

/// Storage for events and their RSVP rows.
#[async_trait]
pub trait RsvpStore: Send + Sync {
    /// Unit of work type returned by [`RsvpStore::begin`].
    type Unit: RsvpUnit;

    async fn get_event(&self, event_id: DbId) -> Result<Option<EventSnapshot>, CoreError>;

    async fn get_rsvp(&self, key: RsvpKey) -> Result<Option<Rsvp>, CoreError>;

    /// RSVP rows for an event ordered by `updated_at` then `user_id`, ascending.
    async fn list_rsvps(
        &self,
        event_id: DbId,
        status: Option<RsvpStatus>,
    ) -> Result<Vec<Rsvp>, CoreError>;

    /// Aggregate row counts per status, computed from the rows themselves.
    async fn count_by_status(&self, event_id: DbId) -> Result<StatusCounts, CoreError>;

    /// Open a unit of work holding the lock for `key`.
    ///
    /// Waits a bounded time for the lock and fails with
    /// [`CoreError::ConflictRetryable`] instead of blocking indefinitely.
    async fn begin(&self, key: RsvpKey) -> Result<Self::Unit, CoreError>;
}

/// One atomic read-modify-write span over a single RSVP key.
#[async_trait]
pub trait RsvpUnit: Send + Sized {
    fn key(&self) -> RsvpKey;

    async fn get_event(&mut self) -> Result<Option<EventSnapshot>, CoreError>;

    async fn user_exists(&mut self) -> Result<bool, CoreError>;

    /// The row for this unit's key, reflecting writes staged in this unit.
    async fn get_rsvp(&mut self) -> Result<Option<Rsvp>, CoreError>;

    /// Insert-or-update the row for this unit's key.
    async fn upsert_rsvp_row(&mut self, status: RsvpStatus) -> Result<Rsvp, CoreError>;

    /// Remove the row for this unit's key, returning it if it existed.
    async fn delete_rsvp_row(&mut self) -> Result<Option<Rsvp>, CoreError>;

    /// Apply `attending = attending + delta` to this unit's event.
    ///
    /// Fails with [`CoreError::NotFound`] if the event no longer exists.
    async fn update_event_attending_count(&mut self, delta: i32) -> Result<(), CoreError>;

    async fn commit(self) -> Result<(), CoreError>;
}
