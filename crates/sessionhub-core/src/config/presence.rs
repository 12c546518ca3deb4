//! Presence notification configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Presence notifier and topic bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Topic that receives presence changes for other connected clients.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Upper bound on a single subscriber delivery, in milliseconds.
    #[serde(default = "default_subscriber_timeout")]
    pub subscriber_timeout_ms: u64,
    /// Buffer size for in-memory topic channels.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Outbound buffer per locally attached connection.
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer_size: usize,
    /// Topic publisher: "memory" (single node) or "redis" (PUBLISH, multi-node).
    #[serde(default = "default_pubsub")]
    pub pubsub: String,
}

impl PresenceConfig {
    /// Subscriber delivery timeout as a duration.
    pub fn subscriber_timeout(&self) -> Duration {
        Duration::from_millis(self.subscriber_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.subscriber_timeout_ms == 0 {
            return Err(AppError::configuration(
                "presence.subscriber_timeout_ms must be positive",
            ));
        }
        if !matches!(self.pubsub.as_str(), "memory" | "redis") {
            return Err(AppError::configuration(format!(
                "Unknown presence.pubsub '{}'",
                self.pubsub
            )));
        }
        if self.channel_buffer_size == 0 || self.connection_buffer_size == 0 {
            return Err(AppError::configuration(
                "presence buffer sizes must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            subscriber_timeout_ms: default_subscriber_timeout(),
            channel_buffer_size: default_channel_buffer(),
            connection_buffer_size: default_connection_buffer(),
            pubsub: default_pubsub(),
        }
    }
}

fn default_topic() -> String {
    "/topic/users".to_string()
}

fn default_subscriber_timeout() -> u64 {
    2000
}

fn default_channel_buffer() -> usize {
    256
}

fn default_connection_buffer() -> usize {
    64
}

fn default_pubsub() -> String {
    "memory".to_string()
}
