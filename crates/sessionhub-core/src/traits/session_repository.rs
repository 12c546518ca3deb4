//! Session table trait for pluggable store backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::{Session, SessionId};

/// Authoritative store of session records keyed by session id.
///
/// Implementations must make each operation atomic with respect to the
/// others for the same id. Expired records are invisible to `find_by_id`
/// and `get` even before the sweeper removes them.
#[async_trait]
pub trait SessionRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Allocate a fresh session with the configured default interval.
    /// The session is not stored until [`save`](Self::save) is called.
    fn create_session(&self) -> Session;

    /// Insert or overwrite the record with the session's id.
    async fn save(&self, session: &Session) -> AppResult<()>;

    /// Find a live session. Returns `None` if absent or expired.
    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>>;

    /// Remove a session. Removing an unknown id is not an error.
    async fn delete(&self, id: &SessionId) -> AppResult<()>;

    /// Ids of every stored record, live or expired.
    async fn session_ids(&self) -> AppResult<Vec<SessionId>>;

    /// Ids the sweeper should check at `now`.
    ///
    /// Must include every record that is expired at `now`; may include
    /// live ones. Defaults to [`session_ids`](Self::session_ids).
    async fn expiry_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<SessionId>> {
        let _ = now;
        self.session_ids().await
    }

    /// Remove the record only if it is expired at `now`, returning it.
    async fn remove_if_expired(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>>;

    /// Whether the backing store is reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Get a live session or fail with `NotFound`.
    async fn get(&self, id: &SessionId) -> AppResult<Session> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Session {id} not found")))
    }
}
