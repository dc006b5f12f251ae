//! Oracle monitoring pipeline.
//!
//! One cycle: fetch, compute drift, mirror (best effort), persist the
//! receipt, update model health, notify, then resolve this model's due
//! markets. The receipt write is the first durable effect. Failures after it
//! are logged and left for the next cycle.

use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::engine::Engine;
use crate::domain::{
    compute_drift, HealthStatus, MarketId, Model, ModelId, MonitoringReceipt, ReceiptEvidence,
    ReceiptId,
};
use crate::error::{Entity, Error, Result};
use crate::port::{DriftEvent, Event, LedgerStore, MarketFilter};

/// Summary of one monitoring cycle.
#[derive(Debug, Clone)]
pub struct MonitoringReport {
    pub receipt: MonitoringReceipt,
    pub health: HealthStatus,
    pub resolved: Vec<MarketId>,
    /// Markets whose resolution failed this cycle; retried later.
    pub failed: Vec<MarketId>,
}

impl<S: LedgerStore> Engine<S> {
    /// Run one monitoring cycle for a model.
    ///
    /// # Errors
    ///
    /// `Fetch` or `Timeout` when the endpoint cannot be read, `NotFound` or
    /// `Validation` for an unknown or inactive model, and storage errors from
    /// the receipt write. No ledger writes happen on any of these.
    pub async fn run_monitoring_cycle(&self, model_id: &ModelId) -> Result<MonitoringReport> {
        let model = self.model(model_id).await?;
        if !model.is_active {
            return Err(Error::Validation(format!("model {model_id} is not active")));
        }

        let limit = self.settings.fetch_timeout;
        let snapshot = timeout(
            limit,
            self.fetcher.fetch(&model.monitoring_endpoint, &model.auth),
        )
        .await
        .map_err(|_| Error::Timeout {
            operation: format!("fetch metrics for model {model_id}"),
            seconds: limit.as_secs(),
        })??;

        let now = self.now();
        let reading = compute_drift(&model.baseline_metrics, &snapshot.metrics);
        let current_metrics = snapshot.metrics.clone();
        let mut receipt = MonitoringReceipt::record(
            model.id.clone(),
            snapshot,
            reading,
            model.drift_threshold_percent,
            now,
        )?;
        receipt.evidence = Some(self.mirror_receipt(&receipt).await);

        self.atomically(|tx| tx.append_receipt(&receipt))?;
        info!(
            model_id = %model_id,
            receipt_id = %receipt.id,
            drift = receipt.drift_percentage,
            comparable = receipt.comparable_metrics,
            low_confidence = receipt.low_confidence,
            hash = %receipt.content_hash,
            "Monitoring receipt recorded"
        );

        let health = HealthStatus::classify(receipt.drift_percentage, model.drift_threshold_percent);
        if let Err(e) = self.record_health(model_id, health, current_metrics, now) {
            warn!(model_id = %model_id, error = %e, "Failed to update model health");
        }

        if receipt.drift_detected {
            self.notify(Event::DriftDetected(DriftEvent {
                owner_id: model.owner_id.clone(),
                model_id: model.id.clone(),
                model_name: model.name.clone(),
                drift_percentage: receipt.drift_percentage,
                threshold_percent: model.drift_threshold_percent,
                severity: health,
            }));
        }

        let (resolved, failed) = self.resolve_due_markets_for(&model).await;
        Ok(MonitoringReport {
            receipt,
            health,
            resolved,
            failed,
        })
    }

    /// Recompute a stored receipt's hash.
    ///
    /// # Errors
    ///
    /// `DataIntegrity` on mismatch.
    pub async fn verify_receipt(&self, receipt_id: &ReceiptId) -> Result<MonitoringReceipt> {
        let receipt = self
            .atomically(|tx| tx.receipt(receipt_id))?
            .ok_or_else(|| Error::not_found(Entity::Receipt, receipt_id))?;
        if let Err(e) = receipt.verify() {
            warn!(receipt_id = %receipt_id, error = %e, "Receipt failed verification");
            return Err(e);
        }
        Ok(receipt)
    }

    /// Check a downstream copy of a stored receipt.
    pub async fn verify_receipt_copy(&self, receipt_id: &ReceiptId, bytes: &[u8]) -> Result<()> {
        let receipt = self.verify_receipt(receipt_id).await?;
        receipt.verify_copy(bytes)
    }

    pub async fn receipts(&self, model_id: &ModelId) -> Result<Vec<MonitoringReceipt>> {
        self.atomically(|tx| tx.receipts_for_model(model_id))
    }

    async fn mirror_receipt(&self, receipt: &MonitoringReceipt) -> ReceiptEvidence {
        let fallback = || ReceiptEvidence {
            url: receipt.fallback_url(&self.settings.fallback_receipt_base_url),
            proof: None,
            mirrored: false,
        };
        let Some(mirror) = &self.mirror else {
            return fallback();
        };
        let bytes = match receipt.canonical_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(receipt_id = %receipt.id, error = %e, "Failed to encode receipt for mirror");
                return fallback();
            }
        };

        match timeout(
            self.settings.fetch_timeout,
            mirror.upload(&receipt.content_hash, &bytes),
        )
        .await
        {
            Ok(Ok(upload)) => {
                debug!(receipt_id = %receipt.id, mirror = mirror.name(), url = %upload.url, "Receipt mirrored");
                ReceiptEvidence {
                    url: upload.url,
                    proof: upload.proof,
                    mirrored: true,
                }
            }
            Ok(Err(e)) => {
                warn!(receipt_id = %receipt.id, mirror = mirror.name(), error = %e, "Receipt mirror failed, using fallback reference");
                fallback()
            }
            Err(_) => {
                warn!(receipt_id = %receipt.id, mirror = mirror.name(), "Receipt mirror timed out, using fallback reference");
                fallback()
            }
        }
    }

    fn record_health(
        &self,
        model_id: &ModelId,
        health: HealthStatus,
        metrics: std::collections::BTreeMap<String, f64>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Model> {
        self.atomically(|tx| {
            let mut model = tx
                .model(model_id)?
                .ok_or_else(|| Error::not_found(Entity::Model, model_id))?;
            model.health_status = health;
            model.current_metrics = Some(metrics);
            model.last_monitored_at = Some(now);
            model.total_monitoring_cycles += 1;
            model.attention = None;
            tx.save_model(&model)?;
            Ok(model)
        })
    }

    /// Resolve due markets tied to `model`. Never touches other models.
    async fn resolve_due_markets_for(&self, model: &Model) -> (Vec<MarketId>, Vec<MarketId>) {
        let filter = MarketFilter::due(self.now()).for_model(model.id.clone());
        let due = match self.atomically(|tx| tx.markets(&filter)) {
            Ok(due) => due,
            Err(e) => {
                warn!(model_id = %model.id, error = %e, "Failed to list due markets");
                return (Vec::new(), Vec::new());
            }
        };

        let mut resolved = Vec::new();
        let mut failed = Vec::new();
        for market in due {
            match self.resolve_if_due(&market.id).await {
                Ok(Some(_)) => resolved.push(market.id),
                Ok(None) => {}
                Err(e) => {
                    warn!(market_id = %market.id, error = %e, "Resolution after monitoring failed");
                    failed.push(market.id);
                }
            }
        }
        (resolved, failed)
    }
}
