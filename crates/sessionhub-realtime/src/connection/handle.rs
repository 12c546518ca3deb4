//! Handle to a locally attached client connection.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use sessionhub_core::types::{ConnectionId, SessionId};

/// A handle to a single client connection.
///
/// Holds the sender for pushing serialized frames to the client task,
/// plus the session the connection was opened under.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Session this connection belongs to
    pub session_id: SessionId,
    /// Sender for outbound frames
    sender: mpsc::Sender<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still open
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(session_id: SessionId, sender: mpsc::Sender<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            session_id,
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Push a frame to this connection. Returns `false` if it was dropped.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection_id = %self.id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Get a snapshot of connection info
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            session_id: self.session_id,
            connected_at: self.connected_at,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of connection info (serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Session ID
    pub session_id: SessionId,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Is alive
    pub alive: bool,
}
