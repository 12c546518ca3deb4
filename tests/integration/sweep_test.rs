//! Integration tests for the expiry sweeper.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sessionhub_core::error::AppError;
use sessionhub_core::events::{DisconnectReason, PresenceEvent, PresenceKind};
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::{Session, SessionId};
use sessionhub_realtime::PresenceSubscriber;
use sessionhub_store::memory::MemorySessionRepository;

#[tokio::test]
async fn test_expired_session_with_one_connection() {
    let mut app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    assert_eq!(session.max_inactive_interval_seconds, 5);

    let (cid, mut frames) = app.connect(session.id).await;
    let connected = app.drain();
    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].connection_count, 1);

    // no activity for six seconds
    app.backdate(&session, 6).await;
    let report = app.hub.sweeper().sweep_once().await;
    assert_eq!(report.evicted, 1);
    assert_eq!(report.connections_closed, 1);

    let events = app.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, PresenceKind::Disconnected);
    assert_eq!(events[0].connection_id, cid);
    assert_eq!(events[0].connection_count, 0);
    assert_eq!(events[0].reason, Some(DisconnectReason::Expired));

    assert!(!app.service().is_online(&session.id));
    assert!(app.service().get(&session.id).await.unwrap_err().is_not_found());

    let notice: serde_json::Value = serde_json::from_str(&frames.recv().await.unwrap()).unwrap();
    assert_eq!(notice["type"], "session_ended");
    assert_eq!(notice["reason"], "expired");
    assert_eq!(frames.recv().await, None);

    let topic = app.drain_topic();
    assert_eq!(topic.last().unwrap()["online"], false);
}

#[tokio::test]
async fn test_sweeper_never_removes_live_sessions() {
    let mut app = helpers::TestHub::new().await;

    let mut live = HashSet::new();
    let mut stale = HashSet::new();
    for i in 0..10 {
        let session = app.new_session().await;
        if i % 2 == 0 {
            app.backdate(&session, 60).await;
            stale.insert(session.id);
        } else {
            app.connect(session.id).await;
            live.insert(session.id);
        }
    }
    app.drain();

    let report = app.hub.sweeper().sweep_once().await;
    assert_eq!(report.examined, 10);
    assert_eq!(report.evicted, 5);
    assert_eq!(report.errors, 0);

    for id in &live {
        assert!(app.service().get(id).await.is_ok());
        assert!(app.service().is_online(id));
    }
    for id in &stale {
        assert!(app.service().get(id).await.unwrap_err().is_not_found());
    }
    assert_eq!(app.service().online_sessions(), live);
    assert!(app.drain().is_empty());
}

#[tokio::test]
async fn test_expired_session_is_absent_before_sweep() {
    let app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    app.backdate(&session, 6).await;

    // not swept yet, but already invisible
    assert!(app.service().get(&session.id).await.unwrap_err().is_not_found());
    let replacement = app
        .service()
        .lookup_or_create_session(Some(&session.id.to_string()))
        .await
        .unwrap();
    assert_ne!(replacement.id, session.id);
}

/// Memory store whose `remove_if_expired` always fails for one id.
#[derive(Debug)]
struct PoisonedStore {
    inner: MemorySessionRepository,
    poisoned: SessionId,
}

#[async_trait]
impl SessionRepository for PoisonedStore {
    fn create_session(&self) -> Session {
        self.inner.create_session()
    }
    async fn save(&self, session: &Session) -> AppResult<()> {
        self.inner.save(session).await
    }
    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        self.inner.find_by_id(id).await
    }
    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        self.inner.delete(id).await
    }
    async fn session_ids(&self) -> AppResult<Vec<SessionId>> {
        self.inner.session_ids().await
    }
    async fn remove_if_expired(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        if *id == self.poisoned {
            return Err(AppError::store_unavailable("shard offline"));
        }
        self.inner.remove_if_expired(id, now).await
    }
    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn test_store_failure_does_not_abort_cycle() {
    let config = helpers::test_config();
    let inner = MemorySessionRepository::new(config.session.max_inactive_interval());
    let poisoned = inner.create_session();
    inner.save(&poisoned).await.unwrap();
    let store = Arc::new(PoisonedStore {
        inner,
        poisoned: poisoned.id,
    });

    let app = helpers::TestHub::with_repository(config, store.clone()).await;
    let healthy = app.new_session().await;
    app.backdate(&healthy, 6).await;
    app.backdate(&poisoned, 6).await;

    let report = app.hub.sweeper().sweep_once().await;
    assert_eq!(report.examined, 2);
    assert_eq!(report.evicted, 1);
    assert_eq!(report.errors, 1);
    assert!(!store.session_ids().await.unwrap().contains(&healthy.id));

    // the next cycle still runs
    let again = app.hub.sweeper().sweep_once().await;
    assert_eq!(again.errors, 1);
    assert_eq!(app.hub.metrics().snapshot().sweeps_completed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_started_hub_sweeps_on_interval_until_shutdown() {
    let mut app = helpers::TestHub::new().await;
    app.hub.start().await.unwrap();

    let session = app.new_session().await;
    app.connect(session.id).await;
    app.backdate(&session, 6).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!app.service().is_online(&session.id));
    assert!(app.drain().last().unwrap().is_last_disconnect());

    app.hub.shutdown().await.unwrap();
    let sweeps = app.hub.metrics().snapshot().sweeps_completed;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(app.hub.metrics().snapshot().sweeps_completed, sweeps);
}

#[tokio::test]
async fn test_cron_schedule_is_accepted() {
    let mut config = helpers::test_config();
    config.session.sweep_cron = Some("0 * * * * *".to_string());
    let app = helpers::TestHub::with_config(config).await;

    app.hub.start().await.unwrap();
    app.hub.shutdown().await.unwrap();
}

/// Subscriber with a bug that fires on every disconnect.
#[derive(Debug)]
struct PanicsOnDisconnect;

#[async_trait]
impl PresenceSubscriber for PanicsOnDisconnect {
    fn name(&self) -> &str {
        "panics-on-disconnect"
    }

    async fn on_event(&self, event: &PresenceEvent) -> AppResult<()> {
        if event.kind == PresenceKind::Disconnected {
            panic!("disconnect handler bug");
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_subscriber_does_not_stop_sweeping() {
    let mut app = helpers::TestHub::new().await;
    app.hub
        .notifier()
        .subscribe(Arc::new(PanicsOnDisconnect))
        .await;
    app.hub.start().await.unwrap();

    let first = app.new_session().await;
    let (_cid, mut frames) = app.connect(first.id).await;
    app.backdate(&first, 6).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!app.service().is_online(&first.id));
    assert!(app.drain().last().unwrap().is_last_disconnect());
    assert!(frames.recv().await.unwrap().contains("session_ended"));
    let sweeps = app.hub.metrics().snapshot().sweeps_completed;
    assert!(sweeps >= 1);

    let second = app.new_session().await;
    app.backdate(&second, 6).await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    let snapshot = app.hub.metrics().snapshot();
    assert!(snapshot.sweeps_completed > sweeps);
    assert!(snapshot.subscriber_failures >= 1);
    assert!(!app.hub.sweeper().is_stopped());
    // both sessions were evicted, not merely hidden
    assert_eq!(snapshot.sessions_expired, 2);
    assert!(app.hub.registry().active_session_ids().is_empty());

    app.hub.shutdown().await.unwrap();
    assert!(app.hub.sweeper().is_stopped());
}
