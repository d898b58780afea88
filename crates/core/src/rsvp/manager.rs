//! The RSVP manager: single entry point for RSVP mutations.

use super::store::{RsvpStore, RsvpUnit};
use super::{attending_delta, AttendanceSummary, Rsvp, RsvpKey, RsvpStatus, StatusCounts};
use crate::error::CoreError;
use crate::events::spots_left;
use crate::types::DbId;

/// Owns the `(event, user) -> status` mapping and keeps each event's
/// `attending` counter equal to its number of `going` rows.
///
/// Row changes and counter deltas are always applied together inside one
/// [`RsvpUnit`]; if either fails the unit is dropped and nothing persists.
#[derive(Debug, Clone)]
pub struct RsvpManager<S> {
    store: S,
}

impl<S: RsvpStore> RsvpManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record `status` for `user_id` on `event_id`.
    ///
    /// Re-sending the current status is a no-op that returns the stored row
    /// unchanged.
    pub async fn upsert_rsvp(
        &self,
        event_id: DbId,
        user_id: DbId,
        status: RsvpStatus,
    ) -> Result<Rsvp, CoreError> {
        let mut unit = self.store.begin(RsvpKey::new(event_id, user_id)).await?;

        unit.get_event().await?.ok_or(CoreError::NotFound {
            entity: "Event",
            id: event_id,
        })?;
        if !unit.user_exists().await? {
            return Err(CoreError::NotFound {
                entity: "User",
                id: user_id,
            });
        }

        let previous = unit.get_rsvp().await?;
        if let Some(existing) = previous.as_ref().filter(|r| r.status == status) {
            tracing::debug!(event_id, user_id, status = %status, "RSVP unchanged");
            return Ok(existing.clone());
        }

        let row = unit.upsert_rsvp_row(status).await?;
        let delta = attending_delta(previous.as_ref().map(|r| r.status), Some(status));
        if delta != 0 {
            unit.update_event_attending_count(delta).await?;
        }
        unit.commit().await?;

        tracing::info!(
            event_id,
            user_id,
            previous = ?previous.map(|r| r.status),
            status = %status,
            delta,
            "RSVP updated",
        );

        Ok(row)
    }

    /// Remove the user's RSVP, returning the removed row.
    ///
    /// Returns `Ok(None)` if the user had no RSVP for the event.
    pub async fn withdraw_rsvp(
        &self,
        event_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Rsvp>, CoreError> {
        let mut unit = self.store.begin(RsvpKey::new(event_id, user_id)).await?;

        unit.get_event().await?.ok_or(CoreError::NotFound {
            entity: "Event",
            id: event_id,
        })?;

        let Some(removed) = unit.delete_rsvp_row().await? else {
            return Ok(None);
        };
        let delta = attending_delta(Some(removed.status), None);
        if delta != 0 {
            unit.update_event_attending_count(delta).await?;
        }
        unit.commit().await?;

        tracing::info!(
            event_id,
            user_id,
            previous = %removed.status,
            delta,
            "RSVP withdrawn",
        );

        Ok(Some(removed))
    }

    /// The user's current RSVP, or `None` if they never responded.
    pub async fn get_user_status(
        &self,
        event_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Rsvp>, CoreError> {
        self.require_event(event_id).await?;
        self.store.get_rsvp(RsvpKey::new(event_id, user_id)).await
    }

    /// RSVP rows for the event, oldest change first, optionally filtered.
    pub async fn list_attendees(
        &self,
        event_id: DbId,
        status: Option<RsvpStatus>,
    ) -> Result<Vec<Rsvp>, CoreError> {
        self.require_event(event_id).await?;
        self.store.list_rsvps(event_id, status).await
    }

    pub async fn count_by_status(&self, event_id: DbId) -> Result<StatusCounts, CoreError> {
        self.require_event(event_id).await?;
        self.store.count_by_status(event_id).await
    }

    /// Compare the event's cached `attending` counter with its live rows.
    pub async fn attendance_summary(&self, event_id: DbId) -> Result<AttendanceSummary, CoreError> {
        let event = self.require_event(event_id).await?;
        let counts = self.store.count_by_status(event_id).await?;
        let consistent = counts.going == i64::from(event.attending);

        if !consistent {
            tracing::warn!(
                event_id,
                attending = event.attending,
                going = counts.going,
                "Attending counter drifted from RSVP rows",
            );
        }

        Ok(AttendanceSummary {
            event_id,
            capacity: event.capacity,
            attending: event.attending,
            spots_left: spots_left(event.capacity, event.attending),
            counts,
            consistent,
        })
    }

    async fn require_event(&self, event_id: DbId) -> Result<super::EventSnapshot, CoreError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Event",
                id: event_id,
            })
    }
}
