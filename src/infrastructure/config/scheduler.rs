//! Scheduler timing and retry configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Retry policy for scheduled operations.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Delay before the second attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Cap on the delay between attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_delay_ms() -> u64 {
    1000 // 1 second
}

fn default_max_delay_ms() -> u64 {
    60000 // 60 seconds
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryConfig {
    /// Delay before attempt `attempt + 1`, without jitter.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Sweep intervals and concurrency for the scheduler.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_monitoring_interval_secs")]
    pub monitoring_interval_secs: u64,
    #[serde(default = "default_resolution_interval_secs")]
    pub resolution_interval_secs: u64,
    /// Monitoring cycles allowed in flight at once.
    #[serde(default = "default_max_concurrent_cycles")]
    pub max_concurrent_cycles: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_monitoring_interval_secs() -> u64 {
    60
}

fn default_resolution_interval_secs() -> u64 {
    300
}

fn default_max_concurrent_cycles() -> usize {
    8
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            monitoring_interval_secs: default_monitoring_interval_secs(),
            resolution_interval_secs: default_resolution_interval_secs(),
            max_concurrent_cycles: default_max_concurrent_cycles(),
            retry: RetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.monitoring_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.monitoring_interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.resolution_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.resolution_interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.max_concurrent_cycles == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.max_concurrent_cycles",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let retry = &self.retry;
        if retry.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.retry.initial_delay_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if retry.max_delay_ms < retry.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.retry.max_delay_ms",
                reason: "must be >= initial_delay_ms".to_string(),
            }
            .into());
        }
        if retry.backoff_multiplier.is_nan() || retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.retry.backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.retry.max_attempts",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let retry = RetryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 350,
            backoff_multiplier: 2.0,
            max_attempts: 5,
        };
        assert_eq!(retry.delay_after(1), Duration::from_millis(100));
        assert_eq!(retry.delay_after(2), Duration::from_millis(200));
        assert_eq!(retry.delay_after(3), Duration::from_millis(350));
        assert_eq!(retry.delay_after(10), Duration::from_millis(350));
    }
}
