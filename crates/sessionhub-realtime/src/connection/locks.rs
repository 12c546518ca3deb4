//! Keyed async locks, one mutex per session id.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use sessionhub_core::types::SessionId;

/// Serialises work per session id.
///
/// Entries are created on first use and dropped once no task holds or
/// waits on them, so the map only holds sessions with work in flight.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

/// Guard for one session's lock. Releasing it prunes the map entry when
/// no other task is queued on it.
#[derive(Debug)]
pub struct SessionLockGuard<'a> {
    owner: &'a SessionLocks,
    session_id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and acquires the lock for `session_id`.
    pub async fn lock(&self, session_id: SessionId) -> SessionLockGuard<'_> {
        let mutex = self
            .locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        SessionLockGuard {
            owner: self,
            session_id,
            guard: Some(guard),
        }
    }

    /// Number of sessions with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock entries exist.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl SessionLockGuard<'_> {
    /// Session this guard locks.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Drop for SessionLockGuard<'_> {
    fn drop(&mut self) {
        // the owned guard holds its own Arc; release it first so the map
        // entry is the only remaining reference when nobody is waiting
        self.guard.take();
        self.owner
            .locks
            .remove_if(&self.session_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
