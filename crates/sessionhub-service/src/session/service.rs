//! Session service called by the request and connection layers.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use sessionhub_core::error::AppError;
use sessionhub_core::events::DisconnectReason;
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::{ConnectionId, Session, SessionId};
use sessionhub_realtime::{ActiveConnectionRegistry, EvictionReport};

/// Session lifecycle and presence facade.
///
/// Operations that read and then write a session record run under the
/// session's registry lock, so they cannot interleave with a connect, a
/// logout or the sweeper deciding the same session.
#[derive(Debug, Clone)]
pub struct SessionService {
    /// Session table (retrying).
    sessions: Arc<dyn SessionRepository>,
    /// Connection registry.
    registry: Arc<ActiveConnectionRegistry>,
}

impl SessionService {
    /// Creates a new session service.
    pub fn new(sessions: Arc<dyn SessionRepository>, registry: Arc<ActiveConnectionRegistry>) -> Self {
        Self { sessions, registry }
    }

    /// Resolves the caller's session, creating one when needed.
    ///
    /// A live session has its last-access time bumped and saved. An absent,
    /// unparsable, unknown or expired id yields a freshly created and saved
    /// session instead.
    pub async fn lookup_or_create_session(&self, raw_id: Option<&str>) -> AppResult<Session> {
        if let Some(id) = raw_id.and_then(|raw| raw.parse::<SessionId>().ok()) {
            let _guard = self.registry.lock_session(id).await;
            if let Some(mut session) = self.sessions.find_by_id(&id).await? {
                session.touch();
                self.sessions.save(&session).await?;
                debug!(session_id = %id, "Session resumed");
                return Ok(session);
            }
            debug!(session_id = %id, "Requested session absent or expired");
        } else if raw_id.is_some() {
            debug!("Unparsable session id presented");
        }

        let session = self.sessions.create_session();
        self.sessions.save(&session).await?;
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Stores a session, overwriting any record with the same id.
    pub async fn save(&self, session: &Session) -> AppResult<()> {
        self.sessions.save(session).await
    }

    /// Gets a live session or fails with `NotFound`.
    pub async fn get(&self, session_id: &SessionId) -> AppResult<Session> {
        self.sessions.get(session_id).await
    }

    /// Marks a session as accessed without other changes.
    ///
    /// Called for traffic on a connection so that an HTTP session with an
    /// open socket does not expire underneath it.
    pub async fn touch(&self, session_id: SessionId) -> AppResult<Session> {
        let _guard = self.registry.lock_session(session_id).await;
        let mut session = self.sessions.get(&session_id).await?;
        session.touch();
        self.sessions.save(&session).await?;
        Ok(session)
    }

    /// Ends a session: deletes the record and force-closes its connections.
    pub async fn logout(&self, session_id: SessionId) -> AppResult<EvictionReport> {
        let guard = self.registry.lock_session(session_id).await;
        self.sessions.delete(&session_id).await?;
        let report = self
            .registry
            .evict_locked(&guard, DisconnectReason::LoggedOut)
            .await;
        info!(
            session_id = %session_id,
            connections_closed = report.connections_closed,
            "Session logged out"
        );
        Ok(report)
    }

    /// Registers a new connection for a session.
    ///
    /// Returns `true` if the connection was new. Fails with `SessionInvalid`
    /// if the session is absent or expired.
    pub async fn notify_connect(
        &self,
        session_id: SessionId,
        connection_id: ConnectionId,
    ) -> AppResult<bool> {
        self.registry.on_connect(session_id, connection_id).await
    }

    /// Like [`notify_connect`](Self::notify_connect) for an id in wire form.
    pub async fn notify_connect_raw(
        &self,
        raw_session_id: &str,
        connection_id: ConnectionId,
    ) -> AppResult<bool> {
        let session_id = raw_session_id.parse::<SessionId>().map_err(|e| {
            AppError::session_invalid(format!("Malformed session id '{raw_session_id}': {e}"))
        })?;
        self.notify_connect(session_id, connection_id).await
    }

    /// Removes a closed connection. Returns `true` if it was known.
    pub async fn notify_disconnect(
        &self,
        session_id: SessionId,
        connection_id: ConnectionId,
    ) -> bool {
        self.registry.on_disconnect(session_id, connection_id).await
    }

    /// Whether the session has at least one live connection.
    pub fn is_online(&self, session_id: &SessionId) -> bool {
        self.registry.is_active(session_id)
    }

    /// Sessions with at least one live connection.
    pub fn online_sessions(&self) -> HashSet<SessionId> {
        self.registry.active_session_ids()
    }
}
