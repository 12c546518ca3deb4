//! Retry with exponential backoff for transient store failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use sessionhub_core::config::RetryConfig;
use sessionhub_core::result::AppResult;

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Only `StoreUnavailable` errors are retried.
pub async fn with_retry<T, F, Fut>(policy: &RetryConfig, operation: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let max_backoff = Duration::from_millis(policy.max_backoff_ms);
    let mut backoff = Duration::from_millis(policy.initial_backoff_ms);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Store operation failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max_backoff);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
