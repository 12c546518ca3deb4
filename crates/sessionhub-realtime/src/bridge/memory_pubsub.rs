//! In-memory pub/sub for single-node deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use sessionhub_core::result::AppResult;
use sessionhub_core::traits::TopicPublisher;

/// In-memory pub/sub implementation.
///
/// Publishing to a topic with no subscribers drops the payload.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Topic name → broadcast sender
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Buffer size for channels
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Subscribe to a topic, returns a receiver
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer_size).0);
        tx.subscribe()
    }

    /// Number of live receivers on a topic
    pub async fn receiver_count(&self, topic: &str) -> usize {
        self.channels
            .read()
            .await
            .get(topic)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TopicPublisher for MemoryPubSub {
    async fn publish(&self, topic: &str, payload: String) -> AppResult<()> {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            // no receivers is not an error for a broadcast topic
            let receivers = tx.send(payload).unwrap_or(0);
            trace!(topic, receivers, "Published to topic");
        }
        Ok(())
    }
}
