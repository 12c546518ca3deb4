//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};

use sessionhub_core::config::AppConfig;
use sessionhub_core::events::PresenceEvent;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::{ConnectionId, Session, SessionId};
use sessionhub_realtime::ChannelSubscriber;
use sessionhub_service::{SessionHub, SessionService};

/// Test application context
pub struct TestHub {
    /// The wired hub
    pub hub: SessionHub,
    /// Every presence event, in publish order
    pub events: mpsc::Receiver<PresenceEvent>,
    /// Raw messages published on the presence topic
    pub topic: broadcast::Receiver<String>,
}

/// Config used by the tests: memory store, five second sessions, fast retries.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.max_inactive_interval_seconds = 5;
    config.session.sweep_interval_seconds = 1;
    config.store.retry.initial_backoff_ms = 1;
    config.store.retry.max_backoff_ms = 4;
    config.logging.format = "pretty".to_string();
    config
}

impl TestHub {
    /// Create a hub from [`test_config`]
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a hub from the given config
    pub async fn with_config(config: AppConfig) -> Self {
        let hub = SessionHub::new(config)
            .await
            .expect("Failed to build hub");
        Self::attach(hub).await
    }

    /// Create a hub around a custom repository
    pub async fn with_repository(config: AppConfig, repository: Arc<dyn SessionRepository>) -> Self {
        let hub = SessionHub::with_repository(config, repository)
            .await
            .expect("Failed to build hub");
        Self::attach(hub).await
    }

    async fn attach(hub: SessionHub) -> Self {
        let (subscriber, events) = ChannelSubscriber::new("integration", 1024);
        hub.notifier().subscribe(Arc::new(subscriber)).await;
        let topic = hub
            .pubsub()
            .expect("memory pubsub")
            .subscribe(&hub.config().presence.topic)
            .await;
        Self { hub, events, topic }
    }

    /// Service facade
    pub fn service(&self) -> &SessionService {
        self.hub.service()
    }

    /// Create and save a fresh session
    pub async fn new_session(&self) -> Session {
        self.service()
            .lookup_or_create_session(None)
            .await
            .expect("Failed to create session")
    }

    /// Attach a local connection and register it
    pub async fn connect(&self, session_id: SessionId) -> (ConnectionId, mpsc::Receiver<String>) {
        let (connection_id, frames) = self.hub.transport().attach(session_id);
        self.service()
            .notify_connect(session_id, connection_id)
            .await
            .expect("Failed to connect");
        (connection_id, frames)
    }

    /// Store the session as if it was last accessed `secs` seconds ago
    pub async fn backdate(&self, session: &Session, secs: i64) -> Session {
        let mut stale = session.clone();
        stale.last_accessed_at = Utc::now() - chrono::Duration::seconds(secs);
        self.service()
            .save(&stale)
            .await
            .expect("Failed to save session");
        stale
    }

    /// All presence events published so far
    pub fn drain(&mut self) -> Vec<PresenceEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// All topic messages published so far, parsed as JSON
    pub fn drain_topic(&mut self) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(raw) = self.topic.try_recv() {
            out.push(serde_json::from_str(&raw).expect("topic payload is JSON"));
        }
        out
    }
}
