//! Model registry use cases.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::engine::Engine;
use crate::domain::{HealthStatus, Model, ModelId, NewModel};
use crate::error::{Entity, Error, Result};
use crate::port::{AttentionEvent, AttentionSubject, Event, LedgerStore};

impl<S: LedgerStore> Engine<S> {
    /// Register a model for monitoring.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty name, a non-HTTP endpoint, missing
    /// baselines, a non-positive threshold, or a zero frequency.
    pub async fn register_model(&self, input: NewModel) -> Result<Model> {
        validate_model(&input)?;
        let model = Model {
            id: ModelId::generate(),
            owner_id: input.owner_id,
            name: input.name,
            monitoring_endpoint: input.monitoring_endpoint,
            auth: input.auth,
            baseline_metrics: input.baseline_metrics,
            drift_threshold_percent: input.drift_threshold_percent,
            monitoring_frequency_hours: input.monitoring_frequency_hours,
            health_status: HealthStatus::Unknown,
            current_metrics: None,
            last_monitored_at: None,
            total_monitoring_cycles: 0,
            is_active: true,
            attention: None,
            created_at: self.now(),
        };
        self.atomically(|tx| tx.save_model(&model))?;
        info!(model_id = %model.id, name = %model.name, "Model registered");
        Ok(model)
    }

    /// Stop monitoring a model. Models are never deleted.
    pub async fn deactivate_model(&self, model_id: &ModelId) -> Result<Model> {
        let model = self.atomically(|tx| {
            let mut model = tx
                .model(model_id)?
                .ok_or_else(|| Error::not_found(Entity::Model, model_id))?;
            model.is_active = false;
            tx.save_model(&model)?;
            Ok(model)
        })?;
        info!(model_id = %model_id, "Model deactivated");
        Ok(model)
    }

    pub async fn model(&self, model_id: &ModelId) -> Result<Model> {
        self.atomically(|tx| tx.model(model_id))?
            .ok_or_else(|| Error::not_found(Entity::Model, model_id))
    }

    pub async fn models(&self, active_only: bool) -> Result<Vec<Model>> {
        self.atomically(|tx| tx.models(active_only))
    }

    /// Active models whose monitoring interval has elapsed at `now`.
    pub async fn models_due(&self, now: DateTime<Utc>) -> Result<Vec<Model>> {
        let models = self.atomically(|tx| tx.models(true))?;
        Ok(models.into_iter().filter(|m| m.is_due(now)).collect())
    }

    /// Flag a model for manual attention and notify operators.
    pub async fn flag_model_attention(&self, model_id: &ModelId, reason: &str) -> Result<()> {
        self.atomically(|tx| {
            let mut model = tx
                .model(model_id)?
                .ok_or_else(|| Error::not_found(Entity::Model, model_id))?;
            model.attention = Some(reason.to_string());
            tx.save_model(&model)
        })?;
        warn!(model_id = %model_id, reason = %reason, "Model flagged for attention");
        self.notify(Event::AttentionRequired(AttentionEvent {
            subject: AttentionSubject::Model(model_id.clone()),
            reason: reason.to_string(),
        }));
        Ok(())
    }
}

fn validate_model(input: &NewModel) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::Validation("model name must not be empty".into()));
    }
    let endpoint = url::Url::parse(&input.monitoring_endpoint).map_err(|e| {
        Error::Validation(format!(
            "invalid monitoring endpoint '{}': {e}",
            input.monitoring_endpoint
        ))
    })?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "monitoring endpoint must use http or https, got '{}'",
            endpoint.scheme()
        )));
    }
    if input.baseline_metrics.is_empty() {
        return Err(Error::Validation("baseline metrics must not be empty".into()));
    }
    if let Some((name, _)) = input
        .baseline_metrics
        .iter()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(Error::Validation(format!(
            "baseline metric '{name}' is not a finite number"
        )));
    }
    if !(input.drift_threshold_percent.is_finite() && input.drift_threshold_percent > 0.0) {
        return Err(Error::Validation(
            "drift threshold must be a positive percentage".into(),
        ));
    }
    if input.monitoring_frequency_hours == 0 {
        return Err(Error::Validation(
            "monitoring frequency must be at least one hour".into(),
        ));
    }
    Ok(())
}
