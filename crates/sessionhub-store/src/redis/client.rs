//! Redis connection management.

use std::future::Future;
use std::time::Duration;

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use sessionhub_core::config::RedisStoreConfig;
use sessionhub_core::error::{AppError, ErrorKind};
use sessionhub_core::result::AppResult;

/// Redis client wrapper with connection management and bounded commands.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis connection manager (reconnecting).
    conn: ConnectionManager,
    /// Key prefix for all keys.
    key_prefix: String,
    /// Upper bound for a single command.
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("key_prefix", &self.key_prefix)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl RedisClient {
    /// Create a new Redis client from configuration.
    pub async fn connect(config: &RedisStoreConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting to Redis");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Invalid Redis URL", e)
        })?;

        let conn = tokio::time::timeout(config.operation_timeout(), ConnectionManager::new(client))
            .await
            .map_err(|_| AppError::store_unavailable("Timed out connecting to Redis"))?
            .map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Failed to connect to Redis", e)
            })?;

        info!("Successfully connected to Redis");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            operation_timeout: config.operation_timeout(),
        })
    }

    /// Get a mutable clone of the connection manager.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    /// Run a command future under the configured timeout.
    ///
    /// Both a timeout and a Redis error surface as `StoreUnavailable`.
    pub async fn bounded<T, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::with_source(
                ErrorKind::StoreUnavailable,
                format!("Redis {operation} failed: {e}"),
                e,
            )),
            Err(_) => Err(AppError::store_unavailable(format!(
                "Redis {operation} timed out after {}ms",
                self.operation_timeout.as_millis()
            ))),
        }
    }
}

/// Mask password in Redis URL for safe logging.
fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
