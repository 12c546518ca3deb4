//! Redis session repository implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::{debug, warn};

use sessionhub_core::result::AppResult;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::{Session, SessionId};

use super::client::RedisClient;
use crate::keys;

/// Redis-backed session repository.
///
/// Each session is a JSON string under `session:{id}`. A sorted set indexes
/// every id by its expiry deadline, so the sweeper only reads records whose
/// deadline has passed.
/// Keys outlive their deadline by `expiry_grace` so expiry is observed by
/// the sweeper rather than silently applied by Redis.
#[derive(Debug, Clone)]
pub struct RedisSessionRepository {
    /// Redis client.
    client: RedisClient,
    /// Interval assigned to new sessions.
    default_max_inactive_interval: Duration,
    /// Key lifetime past the inactivity deadline.
    expiry_grace: Duration,
}

impl RedisSessionRepository {
    /// Create a new Redis session repository.
    pub fn new(
        client: RedisClient,
        default_max_inactive_interval: Duration,
        expiry_grace_seconds: u64,
    ) -> Self {
        Self {
            client,
            default_max_inactive_interval,
            expiry_grace: Duration::from_secs(expiry_grace_seconds),
        }
    }

    async fn load(&self, id: &SessionId) -> AppResult<Option<Session>> {
        let key = self.client.prefixed_key(&keys::session_by_id(id));
        let mut conn = self.client.conn_mut();
        let raw: Option<String> = self.client.bounded("GET", conn.get(&key)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

/// Parse index members, skipping entries that are not session ids.
fn parse_members(members: Vec<String>) -> Vec<SessionId> {
    members
        .into_iter()
        .filter_map(|member| match member.parse::<SessionId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(member = %member, error = %e, "Skipping malformed session index entry");
                None
            }
        })
        .collect()
}

/// Seconds a session key should live from `now`.
fn key_ttl_seconds(session: &Session, now: DateTime<Utc>, grace: Duration) -> u64 {
    let remaining = (session.expires_at() - now).num_seconds().max(0) as u64;
    remaining.saturating_add(grace.as_secs()).max(1)
}

#[async_trait]
impl SessionRepository for RedisSessionRepository {
    fn create_session(&self) -> Session {
        Session::new(self.default_max_inactive_interval)
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        let key = self.client.prefixed_key(&keys::session_by_id(&session.id));
        let index = self.client.prefixed_key(keys::session_index());
        let payload = serde_json::to_string(session)?;
        let ttl = key_ttl_seconds(session, Utc::now(), self.expiry_grace);
        let score = session.expires_at().timestamp();

        let mut conn = self.client.conn_mut();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_ex(&key, payload, ttl)
            .ignore()
            .zadd(&index, session.id.to_string(), score)
            .ignore();

        let _: () = self
            .client
            .bounded("SAVE", pipe.query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        let now = Utc::now();
        Ok(self
            .load(id)
            .await?
            .filter(|session| !session.is_expired_at(now)))
    }

    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        let key = self.client.prefixed_key(&keys::session_by_id(id));
        let index = self.client.prefixed_key(keys::session_index());

        let mut conn = self.client.conn_mut();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .del(&key)
            .ignore()
            .zrem(&index, id.to_string())
            .ignore();

        let _: () = self
            .client
            .bounded("DELETE", pipe.query_async(&mut conn))
            .await?;
        debug!(session_id = %id, "Session deleted");
        Ok(())
    }

    async fn session_ids(&self) -> AppResult<Vec<SessionId>> {
        let index = self.client.prefixed_key(keys::session_index());
        let mut conn = self.client.conn_mut();
        let members: Vec<String> = self
            .client
            .bounded("ZRANGE", conn.zrange(&index, 0, -1))
            .await?;
        Ok(parse_members(members))
    }

    async fn expiry_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<SessionId>> {
        // scores are whole seconds, so a deadline that passed within the
        // current second is still included
        let index = self.client.prefixed_key(keys::session_index());
        let mut conn = self.client.conn_mut();
        let members: Vec<String> = self
            .client
            .bounded(
                "ZRANGEBYSCORE",
                conn.zrangebyscore(&index, "-inf", now.timestamp()),
            )
            .await?;
        Ok(parse_members(members))
    }

    async fn remove_if_expired(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        match self.load(id).await? {
            Some(session) if session.is_expired_at(now) => {
                self.delete(id).await?;
                Ok(Some(session))
            }
            Some(_) => Ok(None),
            None => {
                // key gone but index entry left behind
                let index = self.client.prefixed_key(keys::session_index());
                let mut conn = self.client.conn_mut();
                let _: () = self
                    .client
                    .bounded("ZREM", conn.zrem(&index, id.to_string()))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = self
            .client
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(pong == "PONG")
    }
}
