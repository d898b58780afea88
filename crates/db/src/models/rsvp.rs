//! RSVP row model and DTOs.

use campus_core::error::CoreError;
use campus_core::rsvp::Rsvp;
use campus_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::FromRow;

/// A row from the `event_rsvps` table, status still in its text form.
#[derive(Debug, Clone, FromRow)]
pub struct RsvpRow {
    pub event_id: DbId,
    pub user_id: DbId,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<RsvpRow> for Rsvp {
    type Error = CoreError;

    fn try_from(row: RsvpRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Stored RSVP ({}, {}) has unknown status '{}'",
                row.event_id, row.user_id, row.status
            ))
        })?;
        Ok(Rsvp {
            event_id: row.event_id,
            user_id: row.user_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for setting the caller's RSVP. `status` is parsed by the handler so
/// an unknown token yields a validation error rather than a JSON rejection.
#[derive(Debug, Deserialize)]
pub struct UpsertRsvp {
    pub status: String,
}
