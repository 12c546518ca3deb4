//! Background session expiry for SessionHub.
//!
//! This crate provides:
//! - The expiry sweeper that evicts stale sessions and force-closes their
//!   connections
//! - A fixed-interval runner driven by a watch-channel shutdown signal
//! - A cron schedule for deployments that sweep on wall-clock boundaries

pub mod runner;
pub mod scheduler;
pub mod sweeper;

pub use runner::SweepRunner;
pub use scheduler::CronSweepScheduler;
pub use sweeper::{ExpirySweeper, SweepReport};
