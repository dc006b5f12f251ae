//! In-memory engine wired with test doubles.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::clock::ManualClock;
use super::domain::{new_market, new_model, snapshot};
use super::fetcher::ScriptedFetcher;
use super::notifier::RecordingNotifier;
use crate::adapter::outbound::memory::MemoryLedger;
use crate::application::{Engine, EngineSettings};
use crate::domain::{Market, Model};
use crate::error::Result;
use crate::port::{LedgerStore, NotifierRegistry, ReceiptMirror};

/// Endpoint used by [`TestEngine::model_with_market`].
pub const MODEL_ENDPOINT: &str = "https://models.test/fraud/metrics";

/// An engine plus handles to every double it was built with.
pub struct TestEngine<S = MemoryLedger> {
    pub engine: Engine<S>,
    pub store: Arc<S>,
    pub clock: Arc<ManualClock>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: RecordingNotifier,
}

impl TestEngine<MemoryLedger> {
    /// Memory ledger, no mirror, default settings.
    pub fn new() -> Self {
        Self::build(Arc::new(MemoryLedger::new()), None, EngineSettings::default())
    }

    pub fn with_mirror(mirror: Arc<dyn ReceiptMirror>) -> Self {
        Self::build(Arc::new(MemoryLedger::new()), Some(mirror), EngineSettings::default())
    }
}

impl Default for TestEngine<MemoryLedger> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LedgerStore> TestEngine<S> {
    pub fn build(store: Arc<S>, mirror: Option<Arc<dyn ReceiptMirror>>, settings: EngineSettings) -> Self {
        let clock = Arc::new(ManualClock::epoch());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let notifier = RecordingNotifier::new();
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(notifier.clone()));

        let mut builder = Engine::builder(Arc::clone(&store), fetcher.clone())
            .clock(clock.clone())
            .notifiers(registry)
            .settings(settings);
        if let Some(mirror) = mirror {
            builder = builder.mirror(mirror);
        }
        Self {
            engine: builder.build(),
            store,
            clock,
            fetcher,
            notifier,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use crate::port::Clock;
        self.clock.now()
    }

    /// Register a model at [`MODEL_ENDPOINT`] and open a market on it that
    /// closes in `lead`.
    pub async fn model_with_market(&self, lead: Duration) -> Result<(Model, Market)> {
        let model = self
            .engine
            .register_model(new_model("owner", MODEL_ENDPOINT))
            .await?;
        let market = self
            .engine
            .create_market(new_market(&model.id, self.now() + lead))
            .await?;
        Ok((model, market))
    }

    /// Script the endpoint to report `accuracy` from now on.
    pub fn report_accuracy(&self, accuracy: f64) {
        self.fetcher
            .respond(MODEL_ENDPOINT, snapshot(&[("accuracy", accuracy)]));
    }
}
