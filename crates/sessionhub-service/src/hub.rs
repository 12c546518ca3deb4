//! Component wiring and background lifecycle.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use sessionhub_core::config::AppConfig;
use sessionhub_core::error::AppError;
use sessionhub_core::events::DisconnectReason;
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::{SessionRepository, TopicPublisher};
use sessionhub_core::types::SubscriptionId;
use sessionhub_realtime::{
    ActiveConnectionRegistry, LocalTransport, MemoryPubSub, PresenceMetrics, PresenceNotifier,
    RedisPubSubBridge, TopicForwarder,
};
use sessionhub_store::SessionStoreManager;
use sessionhub_worker::{CronSweepScheduler, ExpirySweeper, SweepRunner};

use crate::session::SessionService;

/// How the sweeper is being driven.
#[derive(Debug)]
enum Background {
    /// Fixed-interval loop on its own task.
    Interval(JoinHandle<()>),
    /// Cron schedule.
    Cron(CronSweepScheduler),
}

/// Fully wired SessionHub instance.
///
/// Built from an [`AppConfig`]; [`start`](Self::start) launches the expiry
/// sweeper and [`shutdown`](Self::shutdown) stops it, letting a running
/// cycle finish, then closes every remaining connection.
#[derive(Debug)]
pub struct SessionHub {
    /// Configuration.
    config: AppConfig,
    /// Session table with retry.
    sessions: Arc<dyn SessionRepository>,
    /// Counters.
    metrics: Arc<PresenceMetrics>,
    /// Presence fan-out.
    notifier: Arc<PresenceNotifier>,
    /// In-process topic pub/sub, when that provider is selected.
    pubsub: Option<Arc<MemoryPubSub>>,
    /// Local connection transport.
    transport: Arc<LocalTransport>,
    /// Connection registry.
    registry: Arc<ActiveConnectionRegistry>,
    /// Expiry sweeper.
    sweeper: Arc<ExpirySweeper>,
    /// Service facade.
    service: SessionService,
    /// Topic forwarder subscription.
    forwarder: SubscriptionId,
    /// Shutdown signal for the interval runner.
    shutdown_tx: watch::Sender<bool>,
    /// Running sweeper, if started.
    background: Mutex<Option<Background>>,
}

impl SessionHub {
    /// Builds every component from configuration.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        info!(provider = %config.store.provider, "Initializing session store");
        let store = SessionStoreManager::new(&config.store, &config.session).await?;
        Self::assemble(config, Arc::new(store)).await
    }

    /// Builds the hub around an existing repository, wrapped in the
    /// configured retry policy.
    pub async fn with_repository(
        config: AppConfig,
        repository: Arc<dyn SessionRepository>,
    ) -> AppResult<Self> {
        config.validate()?;
        let store = SessionStoreManager::from_repository(repository, config.store.retry.clone());
        Self::assemble(config, Arc::new(store)).await
    }

    async fn assemble(config: AppConfig, sessions: Arc<dyn SessionRepository>) -> AppResult<Self> {
        let metrics = Arc::new(PresenceMetrics::new());
        let notifier = Arc::new(PresenceNotifier::new(
            config.presence.subscriber_timeout(),
            Arc::clone(&metrics),
        ));

        let (publisher, pubsub): (Arc<dyn TopicPublisher>, Option<Arc<MemoryPubSub>>) =
            match config.presence.pubsub.as_str() {
                "redis" => {
                    info!("Presence topic published through Redis");
                    let bridge = RedisPubSubBridge::connect(
                        &config.store.redis.url,
                        config.store.redis.operation_timeout(),
                    )
                    .await?;
                    (Arc::new(bridge), None)
                }
                "memory" => {
                    let memory = Arc::new(MemoryPubSub::new(config.presence.channel_buffer_size));
                    (memory.clone(), Some(memory))
                }
                other => {
                    return Err(AppError::configuration(format!(
                        "Unknown presence.pubsub '{other}'"
                    )));
                }
            };

        let forwarder = notifier
            .subscribe(Arc::new(TopicForwarder::new(
                config.presence.topic.clone(),
                publisher,
            )))
            .await;

        let transport = Arc::new(LocalTransport::new(config.presence.connection_buffer_size));
        let registry = Arc::new(ActiveConnectionRegistry::new(
            Arc::clone(&sessions),
            Arc::clone(&notifier),
            transport.clone(),
            Arc::clone(&metrics),
        ));
        let sweeper = Arc::new(ExpirySweeper::new(
            Arc::clone(&sessions),
            Arc::clone(&registry),
            Arc::clone(&metrics),
        ));
        let service = SessionService::new(Arc::clone(&sessions), Arc::clone(&registry));
        let (shutdown_tx, _) = watch::channel(false);

        info!(
            topic = %config.presence.topic,
            max_inactive_interval_secs = config.session.max_inactive_interval_seconds,
            "SessionHub assembled"
        );

        Ok(Self {
            config,
            sessions,
            metrics,
            notifier,
            pubsub,
            transport,
            registry,
            sweeper,
            service,
            forwarder,
            shutdown_tx,
            background: Mutex::new(None),
        })
    }

    /// Starts the expiry sweeper. Calling it again is a no-op.
    pub async fn start(&self) -> AppResult<()> {
        let mut background = self.background.lock().await;
        if background.is_some() {
            warn!("Expiry sweeper already running");
            return Ok(());
        }

        let started = match &self.config.session.sweep_cron {
            Some(expression) => {
                let scheduler =
                    CronSweepScheduler::new(Arc::clone(&self.sweeper), expression).await?;
                scheduler.start().await?;
                Background::Cron(scheduler)
            }
            None => {
                let runner = SweepRunner::new(
                    Arc::clone(&self.sweeper),
                    self.config.session.sweep_interval(),
                );
                Background::Interval(runner.spawn(self.shutdown_tx.subscribe()))
            }
        };

        *background = Some(started);
        Ok(())
    }

    /// Stops the sweeper and closes every remaining connection.
    pub async fn shutdown(&self) -> AppResult<()> {
        info!("SessionHub shutting down");
        let _ = self.shutdown_tx.send(true);

        match self.background.lock().await.take() {
            Some(Background::Interval(handle)) => {
                if let Err(e) = handle.await {
                    warn!(error = %e, "Sweep runner ended abnormally");
                }
            }
            Some(Background::Cron(mut scheduler)) => {
                if let Err(e) = scheduler.shutdown().await {
                    warn!(error = %e, "Cron sweep scheduler failed to shut down cleanly");
                }
            }
            None => {}
        }
        self.sweeper.stop().await;

        let closed = self.registry.close_all(DisconnectReason::Shutdown).await;
        self.notifier.unsubscribe(self.forwarder).await;
        info!(connections_closed = closed, "SessionHub stopped");
        Ok(())
    }

    /// Whether the session store is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.sessions.health_check().await
    }

    /// Service facade for the request and connection layers.
    pub fn service(&self) -> &SessionService {
        &self.service
    }

    /// Connection registry.
    pub fn registry(&self) -> &Arc<ActiveConnectionRegistry> {
        &self.registry
    }

    /// Presence notifier, for adding subscribers.
    pub fn notifier(&self) -> &Arc<PresenceNotifier> {
        &self.notifier
    }

    /// Local transport for in-process clients.
    pub fn transport(&self) -> &Arc<LocalTransport> {
        &self.transport
    }

    /// In-process topic pub/sub, if the memory provider is configured.
    pub fn pubsub(&self) -> Option<&Arc<MemoryPubSub>> {
        self.pubsub.as_ref()
    }

    /// Expiry sweeper, for running a cycle on demand.
    pub fn sweeper(&self) -> &Arc<ExpirySweeper> {
        &self.sweeper
    }

    /// Counters.
    pub fn metrics(&self) -> &Arc<PresenceMetrics> {
        &self.metrics
    }

    /// Active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
