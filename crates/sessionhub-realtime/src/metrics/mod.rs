//! Presence and sweep counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide counters for connection and sweep activity.
#[derive(Debug, Default)]
pub struct PresenceMetrics {
    /// Total connections accepted
    pub connections_total: AtomicU64,
    /// Connections currently live
    pub connections_active: AtomicU64,
    /// Connect attempts rejected for an invalid session
    pub connects_rejected: AtomicU64,
    /// Presence events published
    pub events_published: AtomicU64,
    /// Subscriber deliveries that failed or timed out
    pub subscriber_failures: AtomicU64,
    /// Sessions evicted by the sweeper
    pub sessions_expired: AtomicU64,
    /// Completed sweep cycles
    pub sweeps_completed: AtomicU64,
}

impl PresenceMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a removed connection
    pub fn connection_closed(&self) {
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a rejected connect
    pub fn connect_rejected(&self) {
        self.connects_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a published event and its failed deliveries
    pub fn event_published(&self, failures: usize) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.subscriber_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
    }

    /// Record a finished sweep cycle
    pub fn sweep_completed(&self, evicted: usize) {
        self.sweeps_completed.fetch_add(1, Ordering::Relaxed);
        self.sessions_expired
            .fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connects_rejected: self.connects_rejected.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            subscriber_failures: self.subscriber_failures.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            sweeps_completed: self.sweeps_completed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total connections ever accepted
    pub connections_total: u64,
    /// Currently live connections
    pub connections_active: u64,
    /// Rejected connect attempts
    pub connects_rejected: u64,
    /// Published presence events
    pub events_published: u64,
    /// Failed subscriber deliveries
    pub subscriber_failures: u64,
    /// Sessions evicted by the sweeper
    pub sessions_expired: u64,
    /// Completed sweep cycles
    pub sweeps_completed: u64,
}
