//! Oracle monitoring configuration.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Monitoring fetch and receipt mirror settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Upper bound on one monitoring fetch (seconds).
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Base URL of the receipt mirror. Mirroring is off when unset.
    #[serde(default)]
    pub mirror_url: Option<String>,
    /// Base URL for hash-addressed receipt references.
    #[serde(default = "default_fallback_receipt_base_url")]
    pub fallback_receipt_base_url: String,
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_fallback_receipt_base_url() -> String {
    "https://shdw-drive.genesysgo.net/receipts".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            mirror_url: None,
            fallback_receipt_base_url: default_fallback_receipt_base_url(),
        }
    }
}

impl OracleConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "oracle.fetch_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if let Some(url) = &self.mirror_url {
            url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                field: "oracle.mirror_url",
                reason: e.to_string(),
            })?;
        }
        url::Url::parse(&self.fallback_receipt_base_url).map_err(|e| {
            ConfigError::InvalidValue {
                field: "oracle.fallback_receipt_base_url",
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}
