//! The market pool and resolution engine.
//!
//! [`Engine`] owns handles to every outbound port and exposes the use cases
//! as async methods, grouped by concern in sibling modules. All ledger
//! mutations run inside a single [`LedgerStore::atomically`] call per
//! operation; notifications are sent only after that call returns.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::domain::PoolPricing;
use crate::error::Result;
use crate::port::{
    Clock, DriftFetcher, Event, LedgerStore, LedgerTx, NotifierRegistry, ReceiptMirror,
    SystemClock,
};

/// Tunables for engine operations.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub pricing: PoolPricing,
    /// Upper bound on one monitoring fetch or mirror upload.
    pub fetch_timeout: Duration,
    /// Base URL for hash-addressed receipt references when mirroring fails.
    pub fallback_receipt_base_url: String,
    /// Minimum time between market creation and its deadline.
    pub min_deadline_lead: chrono::Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            pricing: PoolPricing::default(),
            fetch_timeout: Duration::from_secs(30),
            fallback_receipt_base_url: "https://shdw-drive.genesysgo.net/receipts".to_string(),
            min_deadline_lead: chrono::Duration::zero(),
        }
    }
}

/// Drift market engine.
pub struct Engine<S> {
    pub(crate) store: Arc<S>,
    pub(crate) fetcher: Arc<dyn DriftFetcher>,
    pub(crate) mirror: Option<Arc<dyn ReceiptMirror>>,
    pub(crate) notifiers: Arc<NotifierRegistry>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) settings: EngineSettings,
}

impl<S> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fetcher: Arc::clone(&self.fetcher),
            mirror: self.mirror.clone(),
            notifiers: Arc::clone(&self.notifiers),
            clock: Arc::clone(&self.clock),
            settings: self.settings.clone(),
        }
    }
}

impl<S: LedgerStore> Engine<S> {
    /// Start building an engine over a store and a fetcher.
    #[must_use]
    pub fn builder(store: Arc<S>, fetcher: Arc<dyn DriftFetcher>) -> EngineBuilder<S> {
        EngineBuilder {
            store,
            fetcher,
            mirror: None,
            notifiers: NotifierRegistry::new(),
            clock: Arc::new(SystemClock),
            settings: EngineSettings::default(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[must_use]
    pub fn fee_rate(&self) -> Decimal {
        self.settings.pricing.fee_rate
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Blocking stores run their unit of work in place of the current
    /// worker, so other tasks move to another thread meanwhile.
    pub(crate) fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>,
    {
        if S::BLOCKING && on_multi_thread_runtime() {
            tokio::task::block_in_place(|| self.store.atomically(work))
        } else {
            self.store.atomically(work)
        }
    }

    pub(crate) fn notify(&self, event: Event) {
        self.notifiers.notify_all(event);
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder<S> {
    store: Arc<S>,
    fetcher: Arc<dyn DriftFetcher>,
    mirror: Option<Arc<dyn ReceiptMirror>>,
    notifiers: NotifierRegistry,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl<S: LedgerStore> EngineBuilder<S> {
    #[must_use]
    pub fn mirror(mut self, mirror: Arc<dyn ReceiptMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    #[must_use]
    pub fn notifiers(mut self, notifiers: NotifierRegistry) -> Self {
        self.notifiers = notifiers;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn build(self) -> Engine<S> {
        Engine {
            store: self.store,
            fetcher: self.fetcher,
            mirror: self.mirror,
            notifiers: Arc::new(self.notifiers),
            clock: self.clock,
            settings: self.settings,
        }
    }
}

/// `block_in_place` panics on a current-thread runtime.
fn on_multi_thread_runtime() -> bool {
    Handle::try_current()
        .map(|handle| matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryLedger;
    use crate::adapter::outbound::sqlite::SqliteLedger;

    #[test]
    fn sqlite_units_of_work_are_offloaded() {
        assert!(<SqliteLedger as LedgerStore>::BLOCKING);
        assert!(!<MemoryLedger as LedgerStore>::BLOCKING);
    }

    #[test]
    fn no_runtime_runs_inline() {
        assert!(!on_multi_thread_runtime());
    }

    #[tokio::test]
    async fn current_thread_runtime_runs_inline() {
        assert!(!on_multi_thread_runtime());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multi_thread_runtime_offloads() {
        assert!(on_multi_thread_runtime());
    }
}
