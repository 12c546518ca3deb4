//! Evicts sessions past their inactivity deadline.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sessionhub_core::events::DisconnectReason;
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::SessionRepository;
use sessionhub_core::types::SessionId;
use sessionhub_realtime::{ActiveConnectionRegistry, EvictionReport, PresenceMetrics};

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Session ids inspected.
    pub examined: usize,
    /// Sessions evicted.
    pub evicted: usize,
    /// Connections force-closed.
    pub connections_closed: usize,
    /// Store or transport failures encountered.
    pub errors: usize,
}

/// Removes expired sessions and disconnects their live connections.
///
/// The session table and the registry are enumerated without a global
/// lock; each session is decided and evicted under its own registry lock,
/// so a concurrent connect either happens before the eviction (and is
/// closed by it) or after it (and is rejected as invalid).
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Session table
    sessions: Arc<dyn SessionRepository>,
    /// Connection registry
    registry: Arc<ActiveConnectionRegistry>,
    /// Metrics
    metrics: Arc<PresenceMetrics>,
    /// Held for the duration of a cycle
    cycle: Mutex<()>,
    /// Set once by [`stop`](ExpirySweeper::stop); later cycles are skipped
    stopped: AtomicBool,
}

impl ExpirySweeper {
    /// Create a new sweeper
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        registry: Arc<ActiveConnectionRegistry>,
        metrics: Arc<PresenceMetrics>,
    ) -> Self {
        Self {
            sessions,
            registry,
            metrics,
            cycle: Mutex::new(()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Run one cycle against the current time.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Run one cycle treating `now` as the current time.
    ///
    /// Never fails: per-session errors are logged and counted, and the
    /// remaining sessions are still processed. Returns an empty report
    /// without touching anything once the sweeper is stopped.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let _cycle = self.cycle.lock().await;
        let mut report = SweepReport::default();
        if self.stopped.load(Ordering::SeqCst) {
            debug!("Expiry sweeper stopped; skipping cycle");
            return report;
        }

        let mut ids: BTreeSet<SessionId> = self.registry.active_session_ids().into_iter().collect();
        match self.sessions.expiry_candidates(now).await {
            Ok(stored) => ids.extend(stored),
            Err(e) => {
                report.errors += 1;
                warn!(error = %e, "Failed to enumerate stored sessions; sweeping connected sessions only");
            }
        }

        for session_id in ids {
            report.examined += 1;
            match self.sweep_session(session_id, now).await {
                Ok(Some(eviction)) => {
                    report.evicted += 1;
                    report.connections_closed += eviction.connections_closed;
                    report.errors += eviction.transport_errors;
                }
                Ok(None) => {}
                Err(e) => {
                    report.errors += 1;
                    warn!(session_id = %session_id, error = %e, "Failed to sweep session");
                }
            }
        }

        self.metrics.sweep_completed(report.evicted);
        if report.evicted > 0 || report.errors > 0 {
            info!(
                examined = report.examined,
                evicted = report.evicted,
                connections_closed = report.connections_closed,
                errors = report.errors,
                "Expiry sweep completed"
            );
        } else {
            debug!(examined = report.examined, "Expiry sweep completed");
        }
        report
    }

    /// Waits until no cycle is running.
    pub async fn wait_idle(&self) {
        let _cycle = self.cycle.lock().await;
    }

    /// Stops the sweeper for good and waits for a running cycle to finish.
    ///
    /// A cycle that was already triggered but has not started yet becomes
    /// a no-op.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.wait_idle().await;
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Decide and evict one session under its registry lock.
    async fn sweep_session(
        &self,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<EvictionReport>> {
        let guard = self.registry.lock_session(session_id).await;

        let evict = match self.sessions.remove_if_expired(&session_id, now).await? {
            Some(_) => true,
            // record gone while connections remain
            None if self.registry.is_active(&session_id) => {
                let missing = self.sessions.find_by_id(&session_id).await?.is_none();
                if missing {
                    self.sessions.delete(&session_id).await?;
                }
                missing
            }
            None => false,
        };

        if !evict {
            return Ok(None);
        }

        debug!(session_id = %session_id, "Evicting expired session");
        Ok(Some(
            self.registry
                .evict_locked(&guard, DisconnectReason::Expired)
                .await,
        ))
    }
}
