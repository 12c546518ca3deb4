//! Presence change events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{ConnectionId, SessionId};

/// Kind of presence change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceKind {
    /// A connection was added to a session.
    Connected,
    /// A connection was removed from a session.
    Disconnected,
}

impl PresenceKind {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Why a connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The transport reported the connection closed.
    Closed,
    /// The session expired and was evicted by the sweeper.
    Expired,
    /// The session was ended explicitly (logout).
    LoggedOut,
    /// The process is shutting down.
    Shutdown,
}

impl DisconnectReason {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Closed => "closed",
            Self::Expired => "expired",
            Self::LoggedOut => "logged_out",
            Self::Shutdown => "shutdown",
        }
    }
}

/// A presence change for one session.
///
/// `connection_count` is the number of live connections the session has
/// after the change; a `Disconnected` event with a count of zero means the
/// session went offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Connected or disconnected.
    pub kind: PresenceKind,
    /// Session the connection belongs to.
    pub session_id: SessionId,
    /// Connection that was added or removed.
    pub connection_id: ConnectionId,
    /// Live connections after the change.
    pub connection_count: usize,
    /// Disconnect cause; `None` for connect events.
    pub reason: Option<DisconnectReason>,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl PresenceEvent {
    /// Build a connect event.
    pub fn connected(
        session_id: SessionId,
        connection_id: ConnectionId,
        connection_count: usize,
    ) -> Self {
        Self {
            kind: PresenceKind::Connected,
            session_id,
            connection_id,
            connection_count,
            reason: None,
            timestamp: Utc::now(),
        }
    }

    /// Build a disconnect event.
    pub fn disconnected(
        session_id: SessionId,
        connection_id: ConnectionId,
        connection_count: usize,
        reason: DisconnectReason,
    ) -> Self {
        Self {
            kind: PresenceKind::Disconnected,
            session_id,
            connection_id,
            connection_count,
            reason: Some(reason),
            timestamp: Utc::now(),
        }
    }

    /// Whether this event took the session offline.
    pub fn is_last_disconnect(&self) -> bool {
        self.kind == PresenceKind::Disconnected && self.connection_count == 0
    }
}
