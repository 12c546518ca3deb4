//! Session lifetime and sweep configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Session lifetime and expiry sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity interval assigned to newly created sessions, in seconds.
    #[serde(default = "default_max_inactive_interval")]
    pub max_inactive_interval_seconds: u64,
    /// Period between expiry sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Six-field cron expression for the sweep. Overrides the fixed period when set.
    #[serde(default)]
    pub sweep_cron: Option<String>,
}

impl SessionConfig {
    /// Default inactivity interval as a duration.
    pub fn max_inactive_interval(&self) -> Duration {
        Duration::from_secs(self.max_inactive_interval_seconds)
    }

    /// Sweep period as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.max_inactive_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.max_inactive_interval_seconds must be positive",
            ));
        }
        if self.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.sweep_interval_seconds must be positive",
            ));
        }
        if let Some(cron) = &self.sweep_cron {
            if cron.split_whitespace().count() != 6 {
                return Err(AppError::configuration(format!(
                    "session.sweep_cron '{cron}' must have six fields (sec min hour dom mon dow)"
                )));
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_inactive_interval_seconds: default_max_inactive_interval(),
            sweep_interval_seconds: default_sweep_interval(),
            sweep_cron: None,
        }
    }
}

fn default_max_inactive_interval() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}
