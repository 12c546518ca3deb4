//! Integration tests for the session table and session service.

mod helpers;

use std::collections::HashSet;

use serde_json::json;

use sessionhub_core::config::AppConfig;
use sessionhub_core::error::ErrorKind;
use sessionhub_core::events::DisconnectReason;
use sessionhub_core::types::{ConnectionId, SessionId};

#[tokio::test]
async fn test_saved_session_reads_back_equal() {
    let app = helpers::TestHub::new().await;
    let mut session = app.new_session().await;
    session.set_attribute("user", json!({"name": "ada", "roles": ["admin"]}));
    session.set_attribute("theme", json!("dark"));

    app.service().save(&session).await.unwrap();
    let loaded = app.service().get(&session.id).await.unwrap();

    assert_eq!(loaded, session);
    assert_eq!(loaded.attribute_names(), vec!["theme", "user"]);
}

#[tokio::test]
async fn test_last_write_wins() {
    let app = helpers::TestHub::new().await;
    let session = app.new_session().await;

    let mut first = session.clone();
    first.set_attribute("step", json!(1));
    let mut second = session.clone();
    second.set_attribute("other", json!(true));

    app.service().save(&first).await.unwrap();
    app.service().save(&second).await.unwrap();

    let loaded = app.service().get(&session.id).await.unwrap();
    assert!(loaded.attribute("step").is_none());
    assert_eq!(loaded.attribute("other"), Some(&json!(true)));
}

#[tokio::test]
async fn test_new_session_ids_are_unique() {
    let app = helpers::TestHub::new().await;
    let mut ids = HashSet::new();
    for _ in 0..200 {
        assert!(ids.insert(app.new_session().await.id));
    }
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = helpers::TestHub::new().await;
    let err = app.service().get(&SessionId::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_lookup_resumes_and_touches() {
    let app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    let stale = app.backdate(&session, 3).await;

    let resumed = app
        .service()
        .lookup_or_create_session(Some(&session.id.to_string()))
        .await
        .unwrap();

    assert_eq!(resumed.id, session.id);
    assert!(resumed.last_accessed_at > stale.last_accessed_at);
    assert!(resumed.expires_at() > stale.expires_at());
}

#[tokio::test]
async fn test_lookup_with_garbage_creates_fresh_session() {
    let app = helpers::TestHub::new().await;
    let session = app
        .service()
        .lookup_or_create_session(Some("definitely-not-a-uuid"))
        .await
        .unwrap();
    assert!(app.service().get(&session.id).await.is_ok());
}

#[tokio::test]
async fn test_touch_keeps_session_alive() {
    let app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    app.backdate(&session, 4).await;

    app.service().touch(session.id).await.unwrap();
    let report = app
        .hub
        .sweeper()
        .sweep_at(chrono::Utc::now() + chrono::Duration::seconds(3))
        .await;

    assert_eq!(report.evicted, 0);
    assert!(app.service().get(&session.id).await.is_ok());
}

#[tokio::test]
async fn test_logout_closes_every_connection() {
    let mut app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    let (_c1, mut f1) = app.connect(session.id).await;
    let (_c2, _f2) = app.connect(session.id).await;
    app.drain();

    let report = app.service().logout(session.id).await.unwrap();
    assert_eq!(report.connections_closed, 2);

    let events = app.drain();
    assert_eq!(
        events.iter().map(|e| e.connection_count).collect::<Vec<_>>(),
        vec![1, 0]
    );
    assert!(
        events
            .iter()
            .all(|e| e.reason == Some(DisconnectReason::LoggedOut))
    );

    let notice: serde_json::Value = serde_json::from_str(&f1.recv().await.unwrap()).unwrap();
    assert_eq!(notice["reason"], "logged_out");
    assert!(app.service().get(&session.id).await.unwrap_err().is_not_found());

    // a second logout is harmless
    let again = app.service().logout(session.id).await.unwrap();
    assert_eq!(again.connections_closed, 0);
}

#[tokio::test]
async fn test_connect_after_logout_is_rejected() {
    let app = helpers::TestHub::new().await;
    let session = app.new_session().await;
    app.service().logout(session.id).await.unwrap();

    let err = app
        .service()
        .notify_connect(session.id, ConnectionId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionInvalid);
}

#[tokio::test]
async fn test_config_from_toml_drives_hub() {
    let config = AppConfig::from_toml_str(
        r#"
        [session]
        max_inactive_interval_seconds = 90

        [presence]
        topic = "/topic/presence"
        "#,
    )
    .unwrap();

    let app = helpers::TestHub::with_config(config).await;
    let session = app.new_session().await;
    assert_eq!(session.max_inactive_interval_seconds, 90);
    assert_eq!(app.hub.config().presence.topic, "/topic/presence");
}

#[tokio::test]
async fn test_unknown_pubsub_is_configuration_error() {
    let err = AppConfig::from_toml_str(
        r#"
        [presence]
        pubsub = "kafka"
        "#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}
