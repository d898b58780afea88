//! Event RSVP domain: statuses, rows, counts, and the attendance delta rule.
//!
//! The [`RsvpManager`] is the only component allowed to mutate RSVP rows or
//! an event's cached `attending` counter. It talks to storage through the
//! [`RsvpStore`] / [`RsvpUnit`] contract so the same logic runs against
//! PostgreSQL in production and [`InMemoryRsvpStore`] in tests.

pub mod manager;
pub mod memory;
pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

pub use manager::RsvpManager;
pub use memory::InMemoryRsvpStore;
pub use store::{RsvpStore, RsvpUnit};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// A user's declared attendance intention for an event.
///
/// Serialized as the lowercase tokens `going`, `maybe`, `not_going`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

impl RsvpStatus {
    /// Every status, in display order.
    pub const ALL: [RsvpStatus; 3] = [RsvpStatus::Going, RsvpStatus::Maybe, RsvpStatus::NotGoing];

    /// Return the wire/database token for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            RsvpStatus::Going => "going",
            RsvpStatus::Maybe => "maybe",
            RsvpStatus::NotGoing => "not_going",
        }
    }

    /// Whether this status counts towards an event's `attending` total.
    pub fn is_going(self) -> bool {
        self == RsvpStatus::Going
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "going" => Ok(RsvpStatus::Going),
            "maybe" => Ok(RsvpStatus::Maybe),
            "not_going" => Ok(RsvpStatus::NotGoing),
            other => Err(CoreError::Validation(format!(
                "Invalid RSVP status '{other}'. Must be one of: going, maybe, not_going"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Rows and snapshots
// ---------------------------------------------------------------------------

/// Composite identity of an RSVP row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RsvpKey {
    pub event_id: DbId,
    pub user_id: DbId,
}

impl RsvpKey {
    pub fn new(event_id: DbId, user_id: DbId) -> Self {
        Self { event_id, user_id }
    }
}

impl fmt::Display for RsvpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rsvp:{}:{}", self.event_id, self.user_id)
    }
}

/// A persisted RSVP row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rsvp {
    pub event_id: DbId,
    pub user_id: DbId,
    pub status: RsvpStatus,
    pub created_at: Timestamp,
    /// Time of the last status change.
    pub updated_at: Timestamp,
}

impl Rsvp {
    pub fn key(&self) -> RsvpKey {
        RsvpKey::new(self.event_id, self.user_id)
    }
}

/// The parts of an event row the RSVP flow reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventSnapshot {
    pub id: DbId,
    pub capacity: i32,
    pub attending: i32,
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Number of RSVP rows per status for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub going: i64,
    pub maybe: i64,
    pub not_going: i64,
}

impl StatusCounts {
    /// Add `n` rows of the given status.
    pub fn add(&mut self, status: RsvpStatus, n: i64) {
        match status {
            RsvpStatus::Going => self.going += n,
            RsvpStatus::Maybe => self.maybe += n,
            RsvpStatus::NotGoing => self.not_going += n,
        }
    }

    pub fn get(&self, status: RsvpStatus) -> i64 {
        match status {
            RsvpStatus::Going => self.going,
            RsvpStatus::Maybe => self.maybe,
            RsvpStatus::NotGoing => self.not_going,
        }
    }

    pub fn total(&self) -> i64 {
        self.going + self.maybe + self.not_going
    }
}

impl<'a> FromIterator<&'a Rsvp> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a Rsvp>>(iter: I) -> Self {
        let mut counts = StatusCounts::default();
        for rsvp in iter {
            counts.add(rsvp.status, 1);
        }
        counts
    }
}

/// Cached counter vs. live aggregate for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub event_id: DbId,
    pub capacity: i32,
    /// The event's cached `attending` column.
    pub attending: i32,
    pub spots_left: i32,
    pub counts: StatusCounts,
    /// `counts.going == attending`.
    pub consistent: bool,
}

// ---------------------------------------------------------------------------
// Transition rule
// ---------------------------------------------------------------------------

/// Change to an event's `attending` counter implied by moving one RSVP from
/// `previous` to `next`. `None` stands for "no row".
///
/// +1 when entering `going`, -1 when leaving it, 0 otherwise.
pub fn attending_delta(previous: Option<RsvpStatus>, next: Option<RsvpStatus>) -> i32 {
    let was_going = previous.is_some_and(RsvpStatus::is_going);
    let is_going = next.is_some_and(RsvpStatus::is_going);
    match (was_going, is_going) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}
