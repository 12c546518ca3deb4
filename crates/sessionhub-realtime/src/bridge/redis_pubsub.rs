//! Redis pub/sub bridge for multi-node deployments.

#[cfg(feature = "redis-pubsub")]
pub mod implementation {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use tracing::{info, trace};

    use sessionhub_core::error::{AppError, ErrorKind};
    use sessionhub_core::result::AppResult;
    use sessionhub_core::traits::TopicPublisher;

    /// Redis pub/sub bridge relaying topic messages to every node.
    ///
    /// The topic name is used as the Redis channel name.
    #[derive(Clone)]
    pub struct RedisPubSubBridge {
        /// Reconnecting connection.
        conn: ConnectionManager,
        /// Upper bound for a single PUBLISH.
        timeout: Duration,
    }

    impl std::fmt::Debug for RedisPubSubBridge {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisPubSubBridge")
                .field("timeout", &self.timeout)
                .finish()
        }
    }

    impl RedisPubSubBridge {
        /// Connects to Redis.
        pub async fn connect(url: &str, timeout: Duration) -> AppResult<Self> {
            let client = redis::Client::open(url).map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Invalid Redis URL", e)
            })?;
            let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
                .await?
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::StoreUnavailable,
                        "Redis pub/sub connection failed",
                        e,
                    )
                })?;
            info!("Redis pub/sub bridge connected");
            Ok(Self { conn, timeout })
        }
    }

    #[async_trait]
    impl TopicPublisher for RedisPubSubBridge {
        async fn publish(&self, topic: &str, payload: String) -> AppResult<()> {
            let mut conn = self.conn.clone();
            let receivers: i64 = tokio::time::timeout(
                self.timeout,
                redis::cmd("PUBLISH")
                    .arg(topic)
                    .arg(payload)
                    .query_async(&mut conn),
            )
            .await?
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Redis PUBLISH failed: {e}"),
                    e,
                )
            })?;
            trace!(topic, receivers, "Published to Redis channel");
            Ok(())
        }
    }
}

#[cfg(not(feature = "redis-pubsub"))]
pub mod implementation {
    use std::time::Duration;

    use async_trait::async_trait;

    use sessionhub_core::error::AppError;
    use sessionhub_core::result::AppResult;
    use sessionhub_core::traits::TopicPublisher;

    /// Placeholder when the `redis-pubsub` feature is disabled.
    #[derive(Debug, Clone)]
    pub struct RedisPubSubBridge;

    impl RedisPubSubBridge {
        /// Always fails: the feature is not compiled in.
        pub async fn connect(_url: &str, _timeout: Duration) -> AppResult<Self> {
            Err(AppError::configuration(
                "presence.pubsub = \"redis\" requires the redis-pubsub feature",
            ))
        }
    }

    #[async_trait]
    impl TopicPublisher for RedisPubSubBridge {
        async fn publish(&self, _topic: &str, _payload: String) -> AppResult<()> {
            Err(AppError::configuration("redis-pubsub feature is disabled"))
        }
    }
}

pub use implementation::RedisPubSubBridge;
