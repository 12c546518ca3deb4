//! Fan-out of presence events to subscribers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use sessionhub_core::error::AppError;
use sessionhub_core::events::PresenceEvent;
use sessionhub_core::types::SubscriptionId;

use super::subscriber::PresenceSubscriber;
use crate::metrics::PresenceMetrics;

/// A subscriber delivery that failed or timed out.
#[derive(Debug, Clone)]
pub struct SubscriberFailure {
    /// Subscription that failed.
    pub subscription_id: SubscriptionId,
    /// Subscriber name.
    pub subscriber: String,
    /// What went wrong.
    pub error: AppError,
}

/// Outcome of a single publish.
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// Subscribers that accepted the event.
    pub delivered: usize,
    /// Subscribers that failed.
    pub failures: Vec<SubscriberFailure>,
}

/// Delivers presence events to a dynamic list of subscribers.
///
/// Delivery is sequential in subscription order. Each delivery is bounded
/// by a timeout; a subscriber that fails or panics is reported and skipped,
/// never propagated to the publisher or the other subscribers.
#[derive(Debug)]
pub struct PresenceNotifier {
    /// Subscribers in subscription order.
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn PresenceSubscriber>)>>,
    /// Upper bound on one delivery.
    delivery_timeout: Duration,
    /// Metrics.
    metrics: Arc<PresenceMetrics>,
}

impl PresenceNotifier {
    /// Creates a notifier with no subscribers.
    pub fn new(delivery_timeout: Duration, metrics: Arc<PresenceMetrics>) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            delivery_timeout,
            metrics,
        }
    }

    /// Adds a subscriber at the end of the delivery order.
    pub async fn subscribe(&self, subscriber: Arc<dyn PresenceSubscriber>) -> SubscriptionId {
        let id = SubscriptionId::new();
        debug!(subscription_id = %id, subscriber = subscriber.name(), "Presence subscriber added");
        self.subscribers.write().await.push((id, subscriber));
        id
    }

    /// Removes a subscriber. Returns `false` if it was not subscribed.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() < before;
        if removed {
            debug!(subscription_id = %id, "Presence subscriber removed");
        }
        removed
    }

    /// Number of current subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Delivers an event to every current subscriber.
    pub async fn publish(&self, event: &PresenceEvent) -> PublishReport {
        // snapshot so subscribe/unsubscribe never wait on a slow delivery
        let snapshot: Vec<_> = self.subscribers.read().await.clone();
        let mut report = PublishReport::default();

        for (subscription_id, subscriber) in snapshot {
            let delivery = AssertUnwindSafe(subscriber.on_event(event)).catch_unwind();
            let outcome = match tokio::time::timeout(self.delivery_timeout, delivery).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => Err(AppError::subscriber_failure(format!(
                    "Subscriber '{}' panicked: {}",
                    subscriber.name(),
                    panic_message(panic.as_ref())
                ))),
                Err(_) => Err(AppError::subscriber_failure(format!(
                    "Subscriber '{}' timed out after {}ms",
                    subscriber.name(),
                    self.delivery_timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        subscription_id = %subscription_id,
                        subscriber = subscriber.name(),
                        session_id = %event.session_id,
                        kind = event.kind.as_str(),
                        error = %e,
                        "Presence delivery failed"
                    );
                    report.failures.push(SubscriberFailure {
                        subscription_id,
                        subscriber: subscriber.name().to_string(),
                        error: e,
                    });
                }
            }
        }

        self.metrics.event_published(report.failures.len());
        report
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
