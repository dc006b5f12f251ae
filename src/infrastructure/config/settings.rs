//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file; the webhook URL may be
//! supplied through the environment instead.
//!
//! # Example
//!
//! ```no_run
//! use driftpool::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::market::MarketConfig;
use super::notification::NotificationConfig;
use super::oracle::OracleConfig;
use super::scheduler::SchedulerConfig;
use crate::application::EngineSettings;
use crate::error::{ConfigError, Result};

/// Environment variable overriding `notifications.webhook_url`.
pub const WEBHOOK_URL_ENV: &str = "DRIFTPOOL_WEBHOOK_URL";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to SQLite database file.
    ///
    /// Defaults to "driftpool.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub market: MarketConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

fn default_database_path() -> String {
    "driftpool.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            logging: LoggingConfig::default(),
            market: MarketConfig::default(),
            oracle: OracleConfig::default(),
            scheduler: SchedulerConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(url) = std::env::var(WEBHOOK_URL_ENV) {
            if !url.trim().is_empty() {
                config.notifications.webhook_url = Some(url);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        self.logging.validate()?;
        self.market.validate()?;
        self.oracle.validate()?;
        self.scheduler.validate()?;
        self.notifications.validate()?;
        Ok(())
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Engine tunables derived from the market and oracle sections.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        let lead = i64::try_from(self.market.min_deadline_lead_secs).unwrap_or(i64::MAX);
        EngineSettings {
            pricing: self.market.pricing(),
            fetch_timeout: Duration::from_secs(self.oracle.fetch_timeout_secs),
            fallback_receipt_base_url: self.oracle.fallback_receipt_base_url.clone(),
            min_deadline_lead: chrono::Duration::try_seconds(lead)
                .unwrap_or_else(chrono::Duration::zero),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.database, "driftpool.db");
        assert_eq!(config.market.fee_rate, dec!(0.05));
        assert_eq!(config.market.default_odds, dec!(2.0));
        assert_eq!(config.oracle.fetch_timeout_secs, 30);
        assert_eq!(config.scheduler.monitoring_interval_secs, 60);
        assert_eq!(config.scheduler.resolution_interval_secs, 300);
        assert_eq!(config.scheduler.max_concurrent_cycles, 8);
        assert_eq!(config.scheduler.retry.max_attempts, 5);
        assert!(config.notifications.log);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
            database = "/var/lib/driftpool/ledger.db"

            [market]
            fee_rate = "0.02"
            min_deadline_lead_secs = 3600

            [oracle]
            fetch_timeout_secs = 10
            mirror_url = "https://mirror.example.com/receipts"

            [scheduler.retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.market.fee_rate, dec!(0.02));
        assert_eq!(config.scheduler.retry.max_attempts, 3);
        assert_eq!(config.scheduler.retry.initial_delay_ms, 1000);

        let settings = config.engine_settings();
        assert_eq!(settings.pricing.fee_rate, dec!(0.02));
        assert_eq!(settings.fetch_timeout, Duration::from_secs(10));
        assert_eq!(settings.min_deadline_lead, chrono::Duration::hours(1));
    }

    #[test]
    fn fee_rate_of_one_is_rejected() {
        let err = Config::parse_toml("[market]\nfee_rate = \"1.0\"").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "market.fee_rate",
                ..
            })
        ));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = Config::parse_toml("[logging]\nformat = \"xml\"").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "logging.format",
                ..
            })
        ));
    }

    #[test]
    fn retry_delays_must_be_ordered() {
        let err = Config::parse_toml(
            "[scheduler.retry]\ninitial_delay_ms = 5000\nmax_delay_ms = 1000",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "scheduler.retry.max_delay_ms",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::parse_toml("database = ").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
