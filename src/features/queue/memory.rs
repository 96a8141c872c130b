//! In-process queue store.
//!
//! Same semantics as the `SQLite` store without durability. Used by tests and
//! by callers that only want the queue for the life of the process.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::record::{ensure_queueable, DiscardedRequest, NewQueuedRequest, QueuedRequest};
use super::store::{lease_expiry, QueueStore};
use crate::error::PantryError;

#[derive(Default)]
struct State {
    last_id: i64,
    queue: BTreeMap<i64, QueuedRequest>,
    discarded: Vec<DiscardedRequest>,
    lease: Option<(String, DateTime<Utc>)>,
}

/// Queue store held entirely in memory.
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<State>,
}

impl MemoryQueueStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, PantryError> {
        self.state
            .lock()
            .map_err(|_| PantryError::Database("Queue lock poisoned".to_string()))
    }
}

impl QueueStore for MemoryQueueStore {
    fn enqueue(&self, record: NewQueuedRequest) -> Result<QueuedRequest, PantryError> {
        ensure_queueable(record.method)?;
        let mut state = self.state()?;
        state.last_id += 1;
        let queued = record.with_id(state.last_id);
        state.queue.insert(queued.id, queued.clone());
        Ok(queued)
    }

    fn list_all(&self) -> Result<Vec<QueuedRequest>, PantryError> {
        Ok(self.state()?.queue.values().cloned().collect())
    }

    fn remove(&self, id: i64) -> Result<(), PantryError> {
        self.state()?.queue.remove(&id);
        Ok(())
    }

    fn discard(&self, id: i64, status: u16) -> Result<(), PantryError> {
        let mut state = self.state()?;
        if let Some(request) = state.queue.remove(&id) {
            state.discarded.push(DiscardedRequest {
                request,
                status,
                discarded_at: Utc::now(),
            });
        }
        Ok(())
    }

    fn discarded(&self) -> Result<Vec<DiscardedRequest>, PantryError> {
        Ok(self.state()?.discarded.clone())
    }

    fn clear_discarded(&self) -> Result<usize, PantryError> {
        let mut state = self.state()?;
        let count = state.discarded.len();
        state.discarded.clear();
        Ok(count)
    }

    fn len(&self) -> Result<usize, PantryError> {
        Ok(self.state()?.queue.len())
    }

    fn clear(&self) -> Result<usize, PantryError> {
        let mut state = self.state()?;
        let count = state.queue.len();
        state.queue.clear();
        Ok(count)
    }

    fn acquire_lease(&self, holder: &str, ttl: Duration) -> Result<bool, PantryError> {
        let mut state = self.state()?;
        let free = state
            .lease
            .as_ref()
            .map_or(true, |(owner, expires)| owner == holder || *expires <= Utc::now());
        if free {
            state.lease = Some((holder.to_string(), lease_expiry(ttl)));
        }
        Ok(free)
    }

    fn release_lease(&self, holder: &str) -> Result<(), PantryError> {
        let mut state = self.state()?;
        if state.lease.as_ref().is_some_and(|(owner, _)| owner == holder) {
            state.lease = None;
        }
        Ok(())
    }
}
