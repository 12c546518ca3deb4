//! Cron schedule for the expiry sweeper.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use sessionhub_core::error::AppError;

use crate::sweeper::ExpirySweeper;

/// Runs the sweeper on a six-field cron expression (`sec min hour dom mon dow`)
pub struct CronSweepScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Sweeper driven by the schedule
    sweeper: Arc<ExpirySweeper>,
    /// Cron expression
    expression: String,
}

impl std::fmt::Debug for CronSweepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronSweepScheduler")
            .field("expression", &self.expression)
            .finish()
    }
}

impl CronSweepScheduler {
    /// Create a scheduler and register the sweep job
    pub async fn new(sweeper: Arc<ExpirySweeper>, expression: &str) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        let job_sweeper = Arc::clone(&sweeper);
        let job = CronJob::new_async(expression, move |_uuid, _lock| {
            let sweeper = Arc::clone(&job_sweeper);
            Box::pin(async move {
                tracing::trace!("Scheduled expiry sweep firing");
                sweeper.sweep_once().await;
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid session.sweep_cron '{}': {}", expression, e))
        })?;

        scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add expiry sweep schedule: {}", e))
        })?;

        tracing::info!(cron = expression, "Registered: expiry_sweep");
        Ok(Self {
            scheduler,
            sweeper,
            expression: expression.to_string(),
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron sweep scheduler started");
        Ok(())
    }

    /// Stop scheduling and wait for a running sweep to finish.
    ///
    /// Job tasks already spawned by the scheduler may still call into the
    /// sweeper; stopping it turns those calls into no-ops.
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        let stopped = self
            .scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)));

        self.sweeper.stop().await;
        stopped?;
        tracing::info!("Cron sweep scheduler shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sessionhub_realtime::{
        ActiveConnectionRegistry, LocalTransport, PresenceMetrics, PresenceNotifier,
    };
    use sessionhub_store::memory::MemorySessionRepository;

    fn sweeper() -> Arc<ExpirySweeper> {
        let repo = Arc::new(MemorySessionRepository::new(Duration::from_secs(5)));
        let metrics = Arc::new(PresenceMetrics::new());
        let notifier = Arc::new(PresenceNotifier::new(
            Duration::from_secs(1),
            metrics.clone(),
        ));
        let registry = Arc::new(ActiveConnectionRegistry::new(
            repo.clone(),
            notifier,
            Arc::new(LocalTransport::new(8)),
            metrics.clone(),
        ));
        Arc::new(ExpirySweeper::new(repo, registry, metrics))
    }

    #[tokio::test]
    async fn test_invalid_expression_is_configuration_error() {
        let err = CronSweepScheduler::new(sweeper(), "every minute")
            .await
            .unwrap_err();
        assert_eq!(err.kind, sessionhub_core::error::ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_every_minute_expression_is_accepted() {
        let mut scheduler = CronSweepScheduler::new(sweeper(), "0 * * * * *")
            .await
            .unwrap();
        scheduler.start().await.unwrap();
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_late_job_runs() {
        let sweeper = sweeper();
        let mut scheduler = CronSweepScheduler::new(sweeper.clone(), "0 * * * * *")
            .await
            .unwrap();
        scheduler.start().await.unwrap();
        scheduler.shutdown().await.unwrap();

        assert!(sweeper.is_stopped());
        // a job task spawned just before shutdown lands here
        assert_eq!(sweeper.sweep_once().await, crate::SweepReport::default());
    }
}
