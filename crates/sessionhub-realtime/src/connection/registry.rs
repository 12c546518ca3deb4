//! Active-connection registry: which sessions have live connections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, info, warn};

use sessionhub_core::error::AppError;
use sessionhub_core::events::{DisconnectReason, PresenceEvent};
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::{ConnectionTransport, SessionRepository};
use sessionhub_core::types::{ConnectionId, SessionId};

use super::locks::{SessionLockGuard, SessionLocks};
use crate::message::types::OutboundMessage;
use crate::metrics::PresenceMetrics;
use crate::presence::notifier::PresenceNotifier;

/// Result of force-closing a session's connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Connections removed from the registry.
    pub connections_closed: usize,
    /// Transport close calls that failed.
    pub transport_errors: usize,
}

/// Maps session ids to their live connections and publishes presence.
///
/// Every mutation for a session runs under that session's lock, and the
/// resulting event is published before the lock is released. Presence
/// events for one session are therefore delivered in mutation order.
#[derive(Debug)]
pub struct ActiveConnectionRegistry {
    /// Session ID → live connection IDs. An entry exists only while non-empty.
    entries: DashMap<SessionId, HashSet<ConnectionId>>,
    /// Session table used to validate connects.
    sessions: Arc<dyn SessionRepository>,
    /// Presence fan-out.
    notifier: Arc<PresenceNotifier>,
    /// Transport used to force-close connections.
    transport: Arc<dyn ConnectionTransport>,
    /// Metrics.
    metrics: Arc<PresenceMetrics>,
    /// Per-session locks.
    locks: SessionLocks,
}

impl ActiveConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        notifier: Arc<PresenceNotifier>,
        transport: Arc<dyn ConnectionTransport>,
        metrics: Arc<PresenceMetrics>,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            sessions,
            notifier,
            transport,
            metrics,
            locks: SessionLocks::new(),
        }
    }

    /// Registers a connection for a live session.
    ///
    /// Returns `true` if the connection was new. Registering a connection
    /// twice is a no-op and publishes nothing. Fails with `SessionInvalid`
    /// if the session is absent or expired.
    pub async fn on_connect(
        &self,
        session_id: SessionId,
        connection_id: ConnectionId,
    ) -> AppResult<bool> {
        let _guard = self.locks.lock(session_id).await;

        if self.sessions.find_by_id(&session_id).await?.is_none() {
            self.metrics.connect_rejected();
            warn!(
                session_id = %session_id,
                connection_id = %connection_id,
                "Connect rejected: session absent or expired"
            );
            return Err(AppError::session_invalid(format!(
                "Session {session_id} is absent or expired"
            )));
        }

        let count = {
            let mut entry = self.entries.entry(session_id).or_default();
            if !entry.insert(connection_id) {
                debug!(session_id = %session_id, connection_id = %connection_id, "Connection already registered");
                return Ok(false);
            }
            entry.len()
        };

        self.metrics.connection_opened();
        info!(
            session_id = %session_id,
            connection_id = %connection_id,
            connection_count = count,
            "Connection registered"
        );

        self.notifier
            .publish(&PresenceEvent::connected(session_id, connection_id, count))
            .await;
        Ok(true)
    }

    /// Removes a connection the transport reported closed.
    ///
    /// Returns `true` if the connection was known. Unknown connections
    /// publish nothing.
    pub async fn on_disconnect(&self, session_id: SessionId, connection_id: ConnectionId) -> bool {
        let _guard = self.locks.lock(session_id).await;

        let Some(count) = self.detach(&session_id, &connection_id) else {
            debug!(session_id = %session_id, connection_id = %connection_id, "Disconnect for unknown connection ignored");
            return false;
        };

        self.metrics.connection_closed();
        info!(
            session_id = %session_id,
            connection_id = %connection_id,
            connection_count = count,
            "Connection removed"
        );

        self.notifier
            .publish(&PresenceEvent::disconnected(
                session_id,
                connection_id,
                count,
                DisconnectReason::Closed,
            ))
            .await;
        true
    }

    /// Whether the session has at least one live connection.
    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.entries.contains_key(session_id)
    }

    /// Sessions with at least one live connection.
    pub fn active_session_ids(&self) -> HashSet<SessionId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Number of live connections for a session.
    pub fn connection_count(&self, session_id: &SessionId) -> usize {
        self.entries.get(session_id).map(|e| e.len()).unwrap_or(0)
    }

    /// Live connections for a session, in id order.
    pub fn connections(&self, session_id: &SessionId) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .entries
            .get(session_id)
            .map(|e| e.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Live connection counts for every active session.
    pub fn snapshot(&self) -> HashMap<SessionId, usize> {
        self.entries
            .iter()
            .map(|e| (*e.key(), e.value().len()))
            .collect()
    }

    /// Takes a session's lock for a multi-step decision such as a sweep.
    ///
    /// While the guard is held no connect or disconnect for the session can
    /// interleave. Pass it to [`evict_locked`](Self::evict_locked).
    pub async fn lock_session(&self, session_id: SessionId) -> SessionLockGuard<'_> {
        self.locks.lock(session_id).await
    }

    /// Force-closes every connection of a session.
    pub async fn evict_session(
        &self,
        session_id: SessionId,
        reason: DisconnectReason,
    ) -> EvictionReport {
        let guard = self.locks.lock(session_id).await;
        self.evict_locked(&guard, reason).await
    }

    /// Force-closes every connection of the session whose lock is held.
    ///
    /// Each connection gets a `session_ended` notice, is closed through the
    /// transport and yields one `Disconnected` event. Counts in the events
    /// decrease to zero. Transport failures are logged and counted; the
    /// connection is removed from the registry regardless.
    pub async fn evict_locked(
        &self,
        guard: &SessionLockGuard<'_>,
        reason: DisconnectReason,
    ) -> EvictionReport {
        let session_id = guard.session_id();
        let mut report = EvictionReport::default();
        let connections = self.connections(&session_id);
        if connections.is_empty() {
            return report;
        }

        let notice = match OutboundMessage::session_ended(session_id, reason).to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to encode session_ended notice");
                None
            }
        };

        for connection_id in connections {
            let Some(count) = self.detach(&session_id, &connection_id) else {
                continue;
            };

            if let Some(notice) = &notice {
                if let Err(e) = self.transport.deliver(connection_id, notice.clone()).await {
                    debug!(connection_id = %connection_id, error = %e, "session_ended notice not delivered");
                }
            }
            if let Err(e) = self.transport.close(connection_id, reason).await {
                report.transport_errors += 1;
                warn!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    error = %e,
                    "Transport failed to close connection"
                );
            }

            self.metrics.connection_closed();
            report.connections_closed += 1;

            self.notifier
                .publish(&PresenceEvent::disconnected(
                    session_id,
                    connection_id,
                    count,
                    reason,
                ))
                .await;
        }

        info!(
            session_id = %session_id,
            reason = reason.as_str(),
            closed = report.connections_closed,
            "Session connections evicted"
        );
        report
    }

    /// Force-closes every tracked connection. Used at shutdown.
    pub async fn close_all(&self, reason: DisconnectReason) -> usize {
        let evictions = self
            .active_session_ids()
            .into_iter()
            .map(|session_id| self.evict_session(session_id, reason));
        join_all(evictions)
            .await
            .iter()
            .map(|r| r.connections_closed)
            .sum()
    }

    /// Removes one connection; caller holds the session lock.
    /// Returns the remaining count, or `None` if the connection was unknown.
    fn detach(&self, session_id: &SessionId, connection_id: &ConnectionId) -> Option<usize> {
        let remaining = {
            let mut entry = self.entries.get_mut(session_id)?;
            if !entry.remove(connection_id) {
                return None;
            }
            entry.len()
        };
        if remaining == 0 {
            self.entries.remove_if(session_id, |_, set| set.is_empty());
        }
        Some(remaining)
    }
}
