//! Notification sink configuration.

use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Log every event through tracing.
    #[serde(default = "default_log")]
    pub log: bool,
    /// POST events as JSON to this URL.
    ///
    /// `DRIFTPOOL_WEBHOOK_URL` overrides this value.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

fn default_log() -> bool {
    true
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            log: default_log(),
            webhook_url: None,
        }
    }
}

impl NotificationConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(url) = &self.webhook_url {
            url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                field: "notifications.webhook_url",
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}
