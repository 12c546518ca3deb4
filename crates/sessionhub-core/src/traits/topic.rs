//! Outbound message-distribution seam.

use async_trait::async_trait;

use crate::result::AppResult;

/// Publishes serialized messages to a named topic (for example
/// `/topic/users`). Delivery to the clients subscribed to that topic is
/// the implementation's concern.
#[async_trait]
pub trait TopicPublisher: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a payload to a topic.
    async fn publish(&self, topic: &str, payload: String) -> AppResult<()>;
}
