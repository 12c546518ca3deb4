//! SessionHub Server: session store with connection-scoped presence
//!
//! Main entry point that loads configuration, wires all crates together and
//! runs until a shutdown signal arrives.

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use sessionhub_core::config::AppConfig;
use sessionhub_core::error::AppError;
use sessionhub_service::SessionHub;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SESSIONHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SessionHub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        store = %config.store.provider,
        pubsub = %config.presence.pubsub,
        max_inactive_interval_secs = config.session.max_inactive_interval_seconds,
        sweep_interval_secs = config.session.sweep_interval_seconds,
        sweep_cron = ?config.session.sweep_cron,
        "Configuration loaded"
    );

    let hub = SessionHub::new(config).await?;
    if !hub.health_check().await? {
        tracing::warn!("Session store health check failed; continuing");
    }
    hub.start().await?;
    tracing::info!("SessionHub running");

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    hub.shutdown().await?;
    let metrics = hub.metrics().snapshot();
    tracing::info!(
        connections_total = metrics.connections_total,
        sessions_expired = metrics.sessions_expired,
        sweeps_completed = metrics.sweeps_completed,
        "SessionHub shut down complete"
    );
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
