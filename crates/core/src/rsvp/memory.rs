//! In-memory [`RsvpStore`] for deterministic tests and local runs.
//!
//! Tables live behind one `std::sync::Mutex` that is never held across an
//! `.await`. Per-key serialization uses a `tokio::sync::Mutex` per
//! [`RsvpKey`], acquired with a timeout. A unit stages its writes and applies
//! them under the table lock at commit, so a dropped unit leaves no trace.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;

use super::store::{RsvpStore, RsvpUnit};
use super::{EventSnapshot, Rsvp, RsvpKey, RsvpStatus, StatusCounts};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Default bound on how long [`RsvpStore::begin`] waits for a key lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<DbId, EventSnapshot>,
    users: HashSet<DbId>,
    rsvps: HashMap<RsvpKey, Rsvp>,
    next_event_id: DbId,
    last_timestamp: Option<Timestamp>,
}

impl Tables {
    /// Wall-clock time, nudged forward so successive writes never tie.
    fn next_timestamp(&mut self) -> Timestamp {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

type KeyLocks = HashMap<RsvpKey, Arc<tokio::sync::Mutex<()>>>;

/// HashMap-backed event/RSVP storage.
///
/// Cheap to clone; clones share the same tables.
#[derive(Debug, Clone)]
pub struct InMemoryRsvpStore {
    tables: Arc<Mutex<Tables>>,
    key_locks: Arc<Mutex<KeyLocks>>,
    lock_timeout: Duration,
    fail_count_update: Arc<AtomicBool>,
}

impl Default for InMemoryRsvpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRsvpStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            key_locks: Arc::new(Mutex::new(HashMap::new())),
            lock_timeout,
            fail_count_update: Arc::new(AtomicBool::new(false)),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        lock_tables(&self.tables)
    }

    /// Create an event with `attending = 0`.
    pub fn insert_event(&self, capacity: i32) -> EventSnapshot {
        let mut tables = self.tables();
        tables.next_event_id += 1;
        let event = EventSnapshot {
            id: tables.next_event_id,
            capacity,
            attending: 0,
        };
        tables.events.insert(event.id, event);
        event
    }

    /// Delete an event together with its RSVP rows.
    pub fn delete_event(&self, event_id: DbId) -> bool {
        let mut tables = self.tables();
        let existed = tables.events.remove(&event_id).is_some();
        tables.rsvps.retain(|key, _| key.event_id != event_id);
        existed
    }

    pub fn insert_user(&self, user_id: DbId) {
        self.tables().users.insert(user_id);
    }

    pub fn event(&self, event_id: DbId) -> Option<EventSnapshot> {
        self.tables().events.get(&event_id).copied()
    }

    /// Total RSVP rows across all events.
    pub fn rsvp_count(&self) -> usize {
        self.tables().rsvps.len()
    }

    /// Make the next counter update inside a unit fail.
    #[cfg(test)]
    pub(crate) fn fail_next_count_update(&self) {
        self.fail_count_update.store(true, Ordering::SeqCst);
    }

    fn key_lock(&self, key: RsvpKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Drop entries nobody else references before adding a new one.
        locks.retain(|k, lock| *k == key || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(key).or_default())
    }
}

fn lock_tables(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RsvpStore for InMemoryRsvpStore {
    type Unit = InMemoryUnit;

    async fn get_event(&self, event_id: DbId) -> Result<Option<EventSnapshot>, CoreError> {
        Ok(self.event(event_id))
    }

    async fn get_rsvp(&self, key: RsvpKey) -> Result<Option<Rsvp>, CoreError> {
        Ok(self.tables().rsvps.get(&key).cloned())
    }

    async fn list_rsvps(
        &self,
        event_id: DbId,
        status: Option<RsvpStatus>,
    ) -> Result<Vec<Rsvp>, CoreError> {
        let mut rows: Vec<Rsvp> = self
            .tables()
            .rsvps
            .values()
            .filter(|r| r.event_id == event_id)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.updated_at, r.user_id));
        Ok(rows)
    }

    async fn count_by_status(&self, event_id: DbId) -> Result<StatusCounts, CoreError> {
        Ok(self
            .tables()
            .rsvps
            .values()
            .filter(|r| r.event_id == event_id)
            .collect())
    }

    async fn begin(&self, key: RsvpKey) -> Result<InMemoryUnit, CoreError> {
        let lock = self.key_lock(key);
        let guard = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                CoreError::ConflictRetryable(format!(
                    "Timed out after {:?} waiting for lock on {key}",
                    self.lock_timeout
                ))
            })?;

        Ok(InMemoryUnit {
            key,
            tables: Arc::clone(&self.tables),
            fail_count_update: Arc::clone(&self.fail_count_update),
            staged: None,
            attending_delta: 0,
            _guard: guard,
        })
    }
}

#[derive(Debug)]
enum StagedRow {
    Upsert(Rsvp),
    Delete,
}

/// Unit of work over one key of an [`InMemoryRsvpStore`].
#[derive(Debug)]
pub struct InMemoryUnit {
    key: RsvpKey,
    tables: Arc<Mutex<Tables>>,
    fail_count_update: Arc<AtomicBool>,
    staged: Option<StagedRow>,
    attending_delta: i32,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryUnit {
    fn current_row(&self) -> Option<Rsvp> {
        match &self.staged {
            Some(StagedRow::Upsert(row)) => Some(row.clone()),
            Some(StagedRow::Delete) => None,
            None => lock_tables(&self.tables).rsvps.get(&self.key).cloned(),
        }
    }
}

#[async_trait]
impl RsvpUnit for InMemoryUnit {
    fn key(&self) -> RsvpKey {
        self.key
    }

    async fn get_event(&mut self) -> Result<Option<EventSnapshot>, CoreError> {
        let tables = lock_tables(&self.tables);
        Ok(tables.events.get(&self.key.event_id).map(|event| EventSnapshot {
            attending: event.attending + self.attending_delta,
            ..*event
        }))
    }

    async fn user_exists(&mut self) -> Result<bool, CoreError> {
        Ok(lock_tables(&self.tables).users.contains(&self.key.user_id))
    }

    async fn get_rsvp(&mut self) -> Result<Option<Rsvp>, CoreError> {
        Ok(self.current_row())
    }

    async fn upsert_rsvp_row(&mut self, status: RsvpStatus) -> Result<Rsvp, CoreError> {
        let previous = self.current_row();
        let now = lock_tables(&self.tables).next_timestamp();
        let row = Rsvp {
            event_id: self.key.event_id,
            user_id: self.key.user_id,
            status,
            created_at: previous.map_or(now, |r| r.created_at),
            updated_at: now,
        };
        self.staged = Some(StagedRow::Upsert(row.clone()));
        Ok(row)
    }

    async fn delete_rsvp_row(&mut self) -> Result<Option<Rsvp>, CoreError> {
        let previous = self.current_row();
        if previous.is_some() {
            self.staged = Some(StagedRow::Delete);
        }
        Ok(previous)
    }

    async fn update_event_attending_count(&mut self, delta: i32) -> Result<(), CoreError> {
        if self.fail_count_update.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Internal(format!(
                "Injected failure updating attending count for event {}",
                self.key.event_id
            )));
        }
        if !lock_tables(&self.tables).events.contains_key(&self.key.event_id) {
            return Err(CoreError::NotFound {
                entity: "Event",
                id: self.key.event_id,
            });
        }
        self.attending_delta += delta;
        Ok(())
    }

    async fn commit(self) -> Result<(), CoreError> {
        let mut tables = lock_tables(&self.tables);

        let Some(event) = tables.events.get(&self.key.event_id).copied() else {
            return Err(CoreError::NotFound {
                entity: "Event",
                id: self.key.event_id,
            });
        };
        let attending = event.attending + self.attending_delta;
        if attending < 0 {
            return Err(CoreError::Internal(format!(
                "Attending count for event {} would become negative",
                event.id
            )));
        }

        match self.staged {
            Some(StagedRow::Upsert(row)) => {
                tables.rsvps.insert(self.key, row);
            }
            Some(StagedRow::Delete) => {
                tables.rsvps.remove(&self.key);
            }
            None => {}
        }
        tables
            .events
            .insert(event.id, EventSnapshot { attending, ..event });
        Ok(())
    }
}
