//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::outbound::http::{HttpDriftFetcher, HttpReceiptMirror};
use crate::adapter::outbound::notifier::WebhookNotifier;
use crate::adapter::outbound::sqlite::SqliteLedger;
use crate::application::Engine;
use crate::error::Result;
use crate::infrastructure::config::Config;
use crate::port::{LogNotifier, NotifierRegistry, ReceiptMirror};

/// Connections kept by the ledger pool for a file database.
const LEDGER_POOL_SIZE: u32 = 4;

/// Engine over the SQLite ledger, as wired by the binary.
pub type LedgerEngine = Engine<SqliteLedger>;

/// Open the configured ledger database, applying migrations.
///
/// # Errors
/// Returns an error if the database cannot be opened or migrated.
pub fn open_ledger(config: &Config) -> Result<Arc<SqliteLedger>> {
    let ledger = SqliteLedger::open(&config.database, LEDGER_POOL_SIZE)?;
    info!(database = %config.database, "Ledger opened");
    Ok(Arc::new(ledger))
}

/// Build notifier registry from configuration.
///
/// The webhook notifier spawns its worker, so this must run inside a tokio
/// runtime when a webhook is configured.
pub fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    if config.notifications.log {
        registry.register(Box::new(LogNotifier));
    }
    if let Some(url) = &config.notifications.webhook_url {
        let timeout = Duration::from_secs(config.oracle.fetch_timeout_secs);
        registry.register(Box::new(WebhookNotifier::new(url.clone(), timeout)));
        info!(url = %url, "Webhook notifier enabled");
    }
    registry
}

fn build_mirror(config: &Config) -> Option<Arc<dyn ReceiptMirror>> {
    let url = config.oracle.mirror_url.as_deref()?;
    let timeout = Duration::from_secs(config.oracle.fetch_timeout_secs);
    match HttpReceiptMirror::new(url, timeout) {
        Ok(mirror) => {
            info!(url = %url, "Receipt mirror enabled");
            Some(Arc::new(mirror))
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Receipt mirror disabled");
            None
        }
    }
}

/// Wire the engine from configuration: SQLite ledger, HTTP fetcher,
/// optional mirror, and configured notifiers.
///
/// # Errors
/// Returns an error if the ledger cannot be opened.
pub fn build_engine(config: &Config) -> Result<LedgerEngine> {
    let store = open_ledger(config)?;
    let fetcher = Arc::new(HttpDriftFetcher::new(Duration::from_secs(
        config.oracle.fetch_timeout_secs,
    )));

    let mut builder = Engine::builder(store, fetcher)
        .notifiers(build_notifier_registry(config))
        .settings(config.engine_settings());
    if let Some(mirror) = build_mirror(config) {
        builder = builder.mirror(mirror);
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_notifier_follows_config() {
        let mut config = Config::default();
        config.notifications.log = true;
        assert_eq!(build_notifier_registry(&config).len(), 1);

        config.notifications.log = false;
        assert!(build_notifier_registry(&config).is_empty());
    }

    #[test]
    fn mirror_requires_url() {
        let mut config = Config::default();
        assert!(build_mirror(&config).is_none());

        config.oracle.mirror_url = Some("https://mirror.example.com/r".into());
        assert!(build_mirror(&config).is_some());
    }

    #[tokio::test]
    async fn engine_opens_file_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database = dir.path().join("ledger.db").to_string_lossy().into_owned();
        config.notifications.log = false;

        let engine = build_engine(&config).unwrap();
        assert!(engine.models(false).await.unwrap().is_empty());
    }
}
