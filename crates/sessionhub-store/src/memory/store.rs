//! In-memory session table backed by a sharded concurrent map.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use sessionhub_core::result::AppResult;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::{Session, SessionId};

/// In-memory session repository.
///
/// Each operation takes the shard lock for its key only, so operations on
/// the same id are atomic with respect to each other.
#[derive(Debug, Clone)]
pub struct MemorySessionRepository {
    /// Session id → record.
    sessions: Arc<DashMap<SessionId, Session>>,
    /// Interval assigned to new sessions.
    default_max_inactive_interval: Duration,
}

impl MemorySessionRepository {
    /// Create an empty repository.
    pub fn new(default_max_inactive_interval: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            default_max_inactive_interval,
        }
    }

    /// Number of stored records, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the repository holds no records.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    fn create_session(&self) -> Session {
        Session::new(self.default_max_inactive_interval)
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .sessions
            .get(id)
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        if self.sessions.remove(id).is_some() {
            debug!(session_id = %id, "Session deleted");
        }
        Ok(())
    }

    async fn session_ids(&self) -> AppResult<Vec<SessionId>> {
        Ok(self.sessions.iter().map(|entry| *entry.key()).collect())
    }

    async fn expiry_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<SessionId>> {
        Ok(self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| *entry.key())
            .collect())
    }

    async fn remove_if_expired(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .remove_if(id, |_, session| session.is_expired_at(now))
            .map(|(_, session)| session))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
