//! Integration tests for connection registration and presence events.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::events::{PresenceEvent, PresenceKind};
use sessionhub_core::result::AppResult;
use sessionhub_core::types::{ConnectionId, SessionId};
use sessionhub_realtime::PresenceSubscriber;

#[tokio::test]
async fn test_two_connections_one_session() {
    let mut app = helpers::TestHub::new().await;
    let session = app.new_session().await;

    let (c1, _f1) = app.connect(session.id).await;
    let (c2, _f2) = app.connect(session.id).await;

    assert!(app.service().notify_disconnect(session.id, c1).await);
    assert!(app.service().is_online(&session.id));

    assert!(app.service().notify_disconnect(session.id, c2).await);
    assert!(!app.service().is_online(&session.id));

    let events: Vec<(PresenceKind, ConnectionId, usize)> = app
        .drain()
        .into_iter()
        .map(|e| (e.kind, e.connection_id, e.connection_count))
        .collect();
    assert_eq!(
        events,
        vec![
            (PresenceKind::Connected, c1, 1),
            (PresenceKind::Connected, c2, 2),
            (PresenceKind::Disconnected, c1, 1),
            (PresenceKind::Disconnected, c2, 0),
        ]
    );

    let topic = app.drain_topic();
    assert_eq!(topic.len(), 4);
    assert_eq!(topic[0]["type"], "presence_changed");
    assert_eq!(topic[0]["online"], true);
    assert_eq!(topic[3]["status"], "disconnected");
    assert_eq!(topic[3]["online"], false);
}

#[tokio::test]
async fn test_disconnect_of_unknown_handle_is_silent() {
    let mut app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    let (known, _frames) = app.connect(session.id).await;
    app.drain();

    assert!(
        !app.service()
            .notify_disconnect(session.id, ConnectionId::new())
            .await
    );
    assert!(
        !app.service()
            .notify_disconnect(SessionId::new(), known)
            .await
    );

    assert!(app.drain().is_empty());
    assert_eq!(app.hub.registry().connections(&session.id), vec![known]);
}

#[tokio::test]
async fn test_duplicate_connect_is_silent() {
    let mut app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    let (cid, _frames) = app.connect(session.id).await;

    assert!(!app.service().notify_connect(session.id, cid).await.unwrap());
    assert_eq!(app.drain().len(), 1);
    assert_eq!(app.hub.registry().connection_count(&session.id), 1);
}

#[tokio::test]
async fn test_connect_requires_live_session() {
    let mut app = helpers::TestHub::new().await;

    let unknown = app
        .service()
        .notify_connect(SessionId::new(), ConnectionId::new())
        .await
        .unwrap_err();
    assert_eq!(unknown.kind, ErrorKind::SessionInvalid);

    let session = app.new_session().await;
    app.backdate(&session, 6).await;
    let expired = app
        .service()
        .notify_connect(session.id, ConnectionId::new())
        .await
        .unwrap_err();
    assert_eq!(expired.kind, ErrorKind::SessionInvalid);

    assert!(app.drain().is_empty());
    assert!(app.service().online_sessions().is_empty());
    assert_eq!(app.hub.metrics().snapshot().connects_rejected, 2);
}

#[derive(Debug)]
struct AlwaysFails;

#[async_trait]
impl PresenceSubscriber for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    async fn on_event(&self, _event: &PresenceEvent) -> AppResult<()> {
        Err(AppError::internal("subscriber exploded"))
    }
}

#[tokio::test]
async fn test_failing_subscriber_does_not_block_others() {
    let mut app = helpers::TestHub::new().await;
    app.hub.notifier().subscribe(Arc::new(AlwaysFails)).await;
    let session = app.new_session().await;

    let (cid, _frames) = app.connect(session.id).await;
    assert!(app.service().notify_disconnect(session.id, cid).await);

    assert_eq!(app.drain().len(), 2);
    assert_eq!(app.drain_topic().len(), 2);
    assert_eq!(app.hub.metrics().snapshot().subscriber_failures, 2);
}

#[tokio::test]
async fn test_unsubscribed_subscriber_receives_nothing_more() {
    let mut app = helpers::TestHub::new().await;
    let (extra, mut extra_rx) = sessionhub_realtime::ChannelSubscriber::new("extra", 16);
    let id = app.hub.notifier().subscribe(Arc::new(extra)).await;
    let session = app.new_session().await;

    let (c1, _f1) = app.connect(session.id).await;
    assert!(app.hub.notifier().unsubscribe(id).await);
    app.service().notify_disconnect(session.id, c1).await;

    assert_eq!(extra_rx.try_recv().unwrap().kind, PresenceKind::Connected);
    assert!(extra_rx.try_recv().is_err());
    assert_eq!(app.drain().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_churn_keeps_per_session_order() {
    let mut app = helpers::TestHub::new().await;
    let app_service = Arc::new(app.service().clone());

    let mut sessions = Vec::new();
    for _ in 0..4 {
        sessions.push(app.new_session().await.id);
    }

    let mut tasks = Vec::new();
    for &session_id in &sessions {
        for _ in 0..8 {
            let service = app_service.clone();
            tasks.push(tokio::spawn(async move {
                let cid = ConnectionId::new();
                service.notify_connect(session_id, cid).await.unwrap();
                tokio::task::yield_now().await;
                assert!(service.notify_disconnect(session_id, cid).await);
            }));
        }
    }
    for task in tasks {
        task.await.unwrap();
    }

    // replay each session's events: every count must follow from the last
    let mut counts: HashMap<SessionId, usize> = HashMap::new();
    for event in app.drain() {
        let count = counts.entry(event.session_id).or_default();
        match event.kind {
            PresenceKind::Connected => *count += 1,
            PresenceKind::Disconnected => *count -= 1,
        }
        assert_eq!(*count, event.connection_count);
    }

    assert_eq!(counts.len(), sessions.len());
    assert!(counts.values().all(|&c| c == 0));
    assert!(app.service().online_sessions().is_empty());
}
