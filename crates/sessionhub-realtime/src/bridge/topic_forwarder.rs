//! Presence event → topic message forwarding.
//!
//! Turns every presence change into a `presence_changed` message on the
//! configured topic (`/topic/users` by default), so other connected
//! clients learn who came online or went offline.

use std::sync::Arc;

use async_trait::async_trait;

use sessionhub_core::events::PresenceEvent;
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::TopicPublisher;

use crate::message::types::OutboundMessage;
use crate::presence::subscriber::PresenceSubscriber;

/// Presence subscriber that republishes events to a topic.
#[derive(Debug)]
pub struct TopicForwarder {
    /// Destination topic
    topic: String,
    /// Topic publisher
    publisher: Arc<dyn TopicPublisher>,
}

impl TopicForwarder {
    /// Create a forwarder for `topic`
    pub fn new(topic: impl Into<String>, publisher: Arc<dyn TopicPublisher>) -> Self {
        Self {
            topic: topic.into(),
            publisher,
        }
    }

    /// Destination topic
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl PresenceSubscriber for TopicForwarder {
    fn name(&self) -> &str {
        "topic-forwarder"
    }

    async fn on_event(&self, event: &PresenceEvent) -> AppResult<()> {
        let payload = OutboundMessage::from_presence(event).to_json()?;
        self.publisher.publish(&self.topic, payload).await
    }
}
