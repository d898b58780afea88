//! Event entity model and DTOs.

use campus_core::rsvp::EventSnapshot;
use campus_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub capacity: i32,
    /// Number of `going` RSVPs. Maintained by the RSVP manager only.
    pub attending: i32,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Event> for EventSnapshot {
    fn from(event: &Event) -> Self {
        EventSnapshot {
            id: event.id,
            capacity: event.capacity,
            attending: event.attending,
        }
    }
}

/// DTO for creating a new event. `attending` always starts at zero.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<Timestamp>,
    pub capacity: i32,
}
