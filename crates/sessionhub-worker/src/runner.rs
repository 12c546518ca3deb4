//! Fixed-interval loop around the expiry sweeper.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::sweeper::ExpirySweeper;

/// Runs the sweeper every `interval` until the cancel signal is received
#[derive(Debug)]
pub struct SweepRunner {
    /// Sweeper to drive
    sweeper: Arc<ExpirySweeper>,
    /// Delay between cycles
    interval: Duration,
}

impl SweepRunner {
    /// Create a new sweep runner
    pub fn new(sweeper: Arc<ExpirySweeper>, interval: Duration) -> Self {
        Self { sweeper, interval }
    }

    /// Start the runner on its own task
    pub fn spawn(self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Run until the cancel signal is received.
    ///
    /// A cycle that has started always completes; the signal is only
    /// observed between cycles. A cycle that panics is logged and the
    /// schedule continues.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    // a dropped sender counts as shutdown
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!("Expiry sweeper received shutdown signal");
                        break;
                    }
                }
                _ = time::sleep(self.interval) => {
                    let cycle = AssertUnwindSafe(self.sweeper.sweep_once()).catch_unwind();
                    if cycle.await.is_err() {
                        tracing::error!("Expiry sweep cycle panicked; continuing on schedule");
                    }
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }
}
