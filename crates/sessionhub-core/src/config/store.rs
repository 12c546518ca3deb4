//! Session store backend configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Top-level session store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis-specific settings.
    #[serde(default)]
    pub redis: RedisStoreConfig,
    /// Retry policy for transient store failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl StoreConfig {
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        match self.provider.as_str() {
            "memory" | "redis" => {}
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        }
        if self.redis.operation_timeout_ms == 0 {
            return Err(AppError::configuration(
                "store.redis.operation_timeout_ms must be positive",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::configuration(
                "store.retry.max_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis: RedisStoreConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Redis store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all SessionHub keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Upper bound for a single Redis command, in milliseconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
    /// Extra lifetime given to session keys past their inactivity deadline,
    /// so the sweeper observes expiry before Redis drops the key.
    #[serde(default = "default_expiry_grace")]
    pub expiry_grace_seconds: u64,
}

impl RedisStoreConfig {
    /// Command timeout as a duration.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            operation_timeout_ms: default_operation_timeout(),
            expiry_grace_seconds: default_expiry_grace(),
        }
    }
}

/// Exponential backoff policy for `StoreUnavailable` errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds. Doubles each retry.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Upper bound on a single backoff delay, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "sessionhub:".to_string()
}

fn default_operation_timeout() -> u64 {
    500
}

fn default_expiry_grace() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    50
}

fn default_max_backoff() -> u64 {
    1000
}
