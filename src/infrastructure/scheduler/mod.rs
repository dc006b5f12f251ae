//! Background sweeps driving monitoring and resolution.
//!
//! Two loops run on fixed intervals. The monitoring sweep runs a cycle for
//! every due model, concurrently up to a semaphore limit. The resolution
//! sweep resolves every active market past its deadline. Each operation is
//! retried with backoff; when retries run out the model or market is flagged
//! for attention instead of being resolved on incomplete data.

mod retry;

pub use retry::retry_with_backoff;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::application::Engine;
use crate::domain::{MarketId, ModelId};
use crate::error::Error;
use crate::infrastructure::config::scheduler::SchedulerConfig;
use crate::port::LedgerStore;

/// Outcome counts for one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Models or markets the sweep picked up.
    pub attempted: usize,
    pub succeeded: usize,
    /// Subjects flagged for attention this sweep.
    pub flagged: usize,
}

/// Periodic driver for the engine.
pub struct Scheduler<S> {
    engine: Engine<S>,
    config: SchedulerConfig,
    permits: Arc<Semaphore>,
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config.clone(),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl<S: LedgerStore> Scheduler<S> {
    #[must_use]
    pub fn new(engine: Engine<S>, config: SchedulerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_cycles.max(1)));
        Self {
            engine,
            config,
            permits,
        }
    }

    /// Spawn both sweep loops.
    #[must_use]
    pub fn start(engine: Engine<S>, config: SchedulerConfig) -> SchedulerHandle {
        Self::new(engine, config).spawn()
    }

    /// Spawn both sweep loops for this scheduler.
    #[must_use]
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let monitoring_period = Duration::from_secs(self.config.monitoring_interval_secs);
        let resolution_period = Duration::from_secs(self.config.resolution_interval_secs);

        let monitor = self.clone();
        let monitoring = tokio::spawn(run_loop(
            "monitoring",
            monitoring_period,
            receiver.clone(),
            move || {
                let scheduler = monitor.clone();
                async move {
                    scheduler.monitoring_sweep().await;
                }
            },
        ));

        let resolver = self;
        let resolution = tokio::spawn(run_loop(
            "resolution",
            resolution_period,
            receiver,
            move || {
                let scheduler = resolver.clone();
                async move {
                    scheduler.resolution_sweep().await;
                }
            },
        ));

        info!(
            monitoring_secs = monitoring_period.as_secs(),
            resolution_secs = resolution_period.as_secs(),
            "Scheduler started"
        );
        SchedulerHandle {
            shutdown,
            tasks: vec![monitoring, resolution],
        }
    }

    /// Run one monitoring cycle for every due model.
    pub async fn monitoring_sweep(&self) -> SweepReport {
        let due = match self.engine.models_due(self.engine.now()).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "Failed to list models due for monitoring");
                return SweepReport::default();
            }
        };
        let mut report = SweepReport {
            attempted: due.len(),
            ..SweepReport::default()
        };
        if due.is_empty() {
            return report;
        }
        debug!(models = due.len(), "Monitoring sweep");

        let mut cycles = JoinSet::new();
        for model in due {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                warn!("Monitoring semaphore closed");
                break;
            };
            let scheduler = self.clone();
            cycles.spawn(async move {
                let _permit = permit;
                scheduler.monitor_model(&model.id).await
            });
        }

        while let Some(joined) = cycles.join_next().await {
            match joined {
                Ok(Outcome::Succeeded) => report.succeeded += 1,
                Ok(Outcome::Flagged) => report.flagged += 1,
                Ok(Outcome::Skipped) => {}
                Err(e) => error!(error = %e, "Monitoring task panicked"),
            }
        }
        report
    }

    /// Resolve every active market past its deadline.
    pub async fn resolution_sweep(&self) -> SweepReport {
        let due = match self.engine.markets_due().await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "Failed to list markets due for resolution");
                return SweepReport::default();
            }
        };
        let mut report = SweepReport {
            attempted: due.len(),
            ..SweepReport::default()
        };
        for market in due {
            match self.resolve_market(&market.id).await {
                Outcome::Succeeded => report.succeeded += 1,
                Outcome::Flagged => report.flagged += 1,
                Outcome::Skipped => {}
            }
        }
        report
    }

    async fn monitor_model(&self, model_id: &ModelId) -> Outcome {
        let operation = format!("monitor model {model_id}");
        let result = retry_with_backoff(&self.config.retry, &operation, || {
            self.engine.run_monitoring_cycle(model_id)
        })
        .await;
        match result {
            Ok(report) => {
                if !report.failed.is_empty() {
                    warn!(
                        model_id = %model_id,
                        failed = report.failed.len(),
                        "Some markets failed to resolve after monitoring"
                    );
                }
                Outcome::Succeeded
            }
            Err(e) => {
                let reason = attention_reason(&e, self.config.retry.max_attempts);
                if let Err(flag_err) = self.engine.flag_model_attention(model_id, &reason).await {
                    error!(model_id = %model_id, error = %flag_err, "Failed to flag model");
                }
                Outcome::Flagged
            }
        }
    }

    async fn resolve_market(&self, market_id: &MarketId) -> Outcome {
        let operation = format!("resolve market {market_id}");
        let result = retry_with_backoff(&self.config.retry, &operation, || {
            self.engine.resolve_if_due(market_id)
        })
        .await;
        match result {
            Ok(Some(_)) => Outcome::Succeeded,
            Ok(None) => Outcome::Skipped,
            Err(e) => {
                let reason = attention_reason(&e, self.config.retry.max_attempts);
                if let Err(flag_err) = self.engine.flag_market_attention(market_id, &reason).await {
                    error!(market_id = %market_id, error = %flag_err, "Failed to flag market");
                }
                Outcome::Flagged
            }
        }
    }
}

enum Outcome {
    Succeeded,
    Skipped,
    Flagged,
}

fn attention_reason(error: &Error, max_attempts: u32) -> String {
    if error.is_retryable() {
        format!("gave up after {max_attempts} attempts: {error}")
    } else {
        error.to_string()
    }
}

async fn run_loop<F, Fut>(name: &'static str, period: Duration, mut shutdown: watch::Receiver<bool>, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => tick().await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!(sweep = name, "Sweep loop stopped");
}

/// Handle to the running sweep loops.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal both loops and wait for them to finish their current sweep.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Sweep loop ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }
}
