//! Store manager that dispatches to the configured session repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use sessionhub_core::config::{RetryConfig, SessionConfig, StoreConfig};
use sessionhub_core::error::AppError;
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::{Session, SessionId};

use crate::retry::with_retry;

/// Session store manager wrapping the configured backend.
///
/// The backend is selected at construction time based on configuration.
/// Every call goes through [`with_retry`], so transient `StoreUnavailable`
/// failures are retried with backoff before reaching the caller.
#[derive(Debug, Clone)]
pub struct SessionStoreManager {
    /// The inner repository.
    inner: Arc<dyn SessionRepository>,
    /// Retry policy.
    retry: RetryConfig,
}

impl SessionStoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(store: &StoreConfig, session: &SessionConfig) -> AppResult<Self> {
        let inner: Arc<dyn SessionRepository> = match store.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis session store");
                let client = crate::redis::RedisClient::connect(&store.redis).await?;
                Arc::new(crate::redis::RedisSessionRepository::new(
                    client,
                    session.max_inactive_interval(),
                    store.redis.expiry_grace_seconds,
                ))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory session store");
                Arc::new(crate::memory::MemorySessionRepository::new(
                    session.max_inactive_interval(),
                ))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self {
            inner,
            retry: store.retry.clone(),
        })
    }

    /// Create a store manager from an existing repository (for testing).
    pub fn from_repository(repository: Arc<dyn SessionRepository>, retry: RetryConfig) -> Self {
        Self {
            inner: repository,
            retry,
        }
    }

    /// Get a reference to the inner repository.
    pub fn repository(&self) -> &dyn SessionRepository {
        self.inner.as_ref()
    }
}

#[async_trait]
impl SessionRepository for SessionStoreManager {
    fn create_session(&self) -> Session {
        self.inner.create_session()
    }

    async fn save(&self, session: &Session) -> AppResult<()> {
        with_retry(&self.retry, "save", || self.inner.save(session)).await
    }

    async fn find_by_id(&self, id: &SessionId) -> AppResult<Option<Session>> {
        with_retry(&self.retry, "find_by_id", || self.inner.find_by_id(id)).await
    }

    async fn delete(&self, id: &SessionId) -> AppResult<()> {
        with_retry(&self.retry, "delete", || self.inner.delete(id)).await
    }

    async fn session_ids(&self) -> AppResult<Vec<SessionId>> {
        with_retry(&self.retry, "session_ids", || self.inner.session_ids()).await
    }

    async fn expiry_candidates(&self, now: DateTime<Utc>) -> AppResult<Vec<SessionId>> {
        with_retry(&self.retry, "expiry_candidates", || {
            self.inner.expiry_candidates(now)
        })
        .await
    }

    async fn remove_if_expired(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        with_retry(&self.retry, "remove_if_expired", || {
            self.inner.remove_if_expired(id, now)
        })
        .await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
