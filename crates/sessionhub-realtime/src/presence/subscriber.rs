//! Presence subscriber trait and a channel-backed implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use sessionhub_core::error::AppError;
use sessionhub_core::events::PresenceEvent;
use sessionhub_core::result::AppResult;

/// Receives presence events from the [`PresenceNotifier`](super::PresenceNotifier).
///
/// Delivery happens while the registry holds the session's lock, so an
/// implementation must not call back into the registry for the same session.
#[async_trait]
pub trait PresenceSubscriber: Send + Sync + std::fmt::Debug + 'static {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Handle one event.
    async fn on_event(&self, event: &PresenceEvent) -> AppResult<()>;
}

/// Subscriber that forwards events into a bounded channel.
///
/// A full buffer is reported as a delivery failure rather than waited on.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    name: String,
    sender: mpsc::Sender<PresenceEvent>,
}

impl ChannelSubscriber {
    /// Create a subscriber and the receiver that drains it.
    pub fn new(name: impl Into<String>, buffer: usize) -> (Self, mpsc::Receiver<PresenceEvent>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (
            Self {
                name: name.into(),
                sender,
            },
            receiver,
        )
    }
}

#[async_trait]
impl PresenceSubscriber for ChannelSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, event: &PresenceEvent) -> AppResult<()> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::subscriber_failure(format!("Subscriber '{}' buffer full", self.name))
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::subscriber_failure(format!("Subscriber '{}' receiver dropped", self.name))
            }
        })
    }
}
