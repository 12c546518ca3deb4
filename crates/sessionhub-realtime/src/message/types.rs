//! Outbound message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sessionhub_core::events::{DisconnectReason, PresenceEvent, PresenceKind};
use sessionhub_core::result::AppResult;
use sessionhub_core::types::{ConnectionId, SessionId};

/// Messages pushed to clients, either on a topic or to one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// A session gained or lost a connection.
    PresenceChanged {
        /// Session whose presence changed.
        session_id: SessionId,
        /// Connection that was added or removed.
        connection_id: ConnectionId,
        /// `connected` or `disconnected`.
        status: PresenceKind,
        /// Live connections after the change.
        connection_count: usize,
        /// Whether the session still has a live connection.
        online: bool,
        /// Disconnect cause, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<DisconnectReason>,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// The connection's session is ending; the server closes the connection next.
    SessionEnded {
        /// Session that ended.
        session_id: SessionId,
        /// Why it ended.
        reason: DisconnectReason,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl OutboundMessage {
    /// Build the topic message for a presence event.
    pub fn from_presence(event: &PresenceEvent) -> Self {
        Self::PresenceChanged {
            session_id: event.session_id,
            connection_id: event.connection_id,
            status: event.kind,
            connection_count: event.connection_count,
            online: event.connection_count > 0,
            reason: event.reason,
            timestamp: event.timestamp,
        }
    }

    /// Build the notice sent to a connection before it is force-closed.
    pub fn session_ended(session_id: SessionId, reason: DisconnectReason) -> Self {
        Self::SessionEnded {
            session_id,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_message_shape() {
        let event = PresenceEvent::disconnected(
            SessionId::new(),
            ConnectionId::new(),
            0,
            DisconnectReason::Expired,
        );
        let json: serde_json::Value =
            serde_json::from_str(&OutboundMessage::from_presence(&event).to_json().unwrap())
                .unwrap();

        assert_eq!(json["type"], "presence_changed");
        assert_eq!(json["status"], "disconnected");
        assert_eq!(json["online"], false);
        assert_eq!(json["reason"], "expired");
        assert_eq!(json["session_id"], event.session_id.to_string());
    }

    #[test]
    fn test_connect_message_omits_reason() {
        let event = PresenceEvent::connected(SessionId::new(), ConnectionId::new(), 2);
        let json = OutboundMessage::from_presence(&event).to_json().unwrap();
        assert!(json.contains("\"online\":true"));
        assert!(!json.contains("reason"));
    }
}
