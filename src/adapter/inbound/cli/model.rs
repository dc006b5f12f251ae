//! Handlers for model registration, listing, and on-demand monitoring.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::Tabled;

use crate::adapter::inbound::cli::command::{ListModelsArgs, ModelArg, RegisterModelArgs};
use crate::adapter::inbound::cli::context::Context;
use crate::adapter::inbound::cli::output;
use crate::domain::{
    EndpointAuth, HealthStatus, Model, ModelId, MonitoringReceipt, NewModel, UserId,
};
use crate::error::{Error, Result};

#[derive(Tabled, Serialize)]
struct ModelRow {
    #[tabled(rename = "Model")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Health")]
    health: String,
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Every")]
    frequency: String,
    #[tabled(rename = "Last monitored")]
    last_monitored: String,
    #[tabled(rename = "Active")]
    active: bool,
}

impl From<&Model> for ModelRow {
    fn from(model: &Model) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name.clone(),
            health: model.health_status.to_string(),
            threshold: format!("{}%", model.drift_threshold_percent),
            frequency: format!("{}h", model.monitoring_frequency_hours),
            last_monitored: model
                .last_monitored_at
                .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string()),
            active: model.is_active,
        }
    }
}

#[derive(Tabled, Serialize)]
struct ReceiptRow {
    #[tabled(rename = "Receipt")]
    id: String,
    #[tabled(rename = "Recorded")]
    recorded_at: String,
    #[tabled(rename = "Drift")]
    drift: String,
    #[tabled(rename = "Detected")]
    detected: bool,
    #[tabled(rename = "Metrics")]
    comparable: u32,
    #[tabled(rename = "Hash")]
    hash: String,
}

impl From<&MonitoringReceipt> for ReceiptRow {
    fn from(receipt: &MonitoringReceipt) -> Self {
        Self {
            id: receipt.id.to_string(),
            recorded_at: receipt.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            drift: format!("{:.2}%", receipt.drift_percentage),
            detected: receipt.drift_detected,
            comparable: receipt.comparable_metrics,
            hash: receipt.content_hash.chars().take(12).collect(),
        }
    }
}

/// Execute `model register`.
pub async fn execute_register(context: &Context, args: &RegisterModelArgs) -> Result<()> {
    let baseline_metrics = parse_baseline(&args.baseline)?;
    let auth = match (&args.bearer, &args.api_key) {
        (Some(token), _) => EndpointAuth::Bearer {
            token: token.clone(),
        },
        (None, Some(key)) => EndpointAuth::ApiKey { key: key.clone() },
        (None, None) => EndpointAuth::None,
    };

    let engine = context.engine()?;
    let model = engine
        .register_model(NewModel {
            owner_id: UserId::new(&args.owner),
            name: args.name.clone(),
            monitoring_endpoint: args.endpoint.clone(),
            auth,
            baseline_metrics,
            drift_threshold_percent: args.threshold,
            monitoring_frequency_hours: args.frequency_hours,
        })
        .await?;

    output::record("model", &ModelRow::from(&model));
    output::success("Model registered");
    output::field("Model", output::highlight(&model.id));
    output::field("Endpoint", &model.monitoring_endpoint);
    output::field("Metrics", model.baseline_metrics.len());
    Ok(())
}

/// Execute `model deactivate`.
pub async fn execute_deactivate(context: &Context, args: &ModelArg) -> Result<()> {
    let engine = context.engine()?;
    let model = engine.deactivate_model(&ModelId::from(args.model.as_str())).await?;

    output::record("model", &ModelRow::from(&model));
    output::success(&format!("Model {} deactivated", model.name));
    Ok(())
}

/// Execute `model list`.
pub async fn execute_list(context: &Context, args: &ListModelsArgs) -> Result<()> {
    let engine = context.engine()?;
    let models = engine.models(!args.all).await?;
    if models.is_empty() {
        output::note("No models registered");
        return Ok(());
    }
    let rows: Vec<ModelRow> = models.iter().map(ModelRow::from).collect();
    output::table("model", &rows);
    Ok(())
}

/// Execute `model receipts`.
pub async fn execute_receipts(context: &Context, args: &ModelArg) -> Result<()> {
    let engine = context.engine()?;
    let receipts = engine.receipts(&ModelId::from(args.model.as_str())).await?;
    if receipts.is_empty() {
        output::note("No receipts recorded");
        return Ok(());
    }
    let rows: Vec<ReceiptRow> = receipts.iter().map(ReceiptRow::from).collect();
    output::table("receipt", &rows);
    Ok(())
}

/// Execute `monitor`.
pub async fn execute_monitor(context: &Context, args: &ModelArg) -> Result<()> {
    let engine = context.engine()?;
    let report = engine
        .run_monitoring_cycle(&ModelId::from(args.model.as_str()))
        .await?;
    let receipt = &report.receipt;

    output::record("receipt", receipt);
    output::success("Monitoring cycle complete");
    output::field("Receipt", &receipt.id);
    output::field("Drift", format!("{:.2}%", receipt.drift_percentage));
    output::field("Health", health_label(report.health));
    output::field("Hash", &receipt.content_hash);
    if let Some(evidence) = &receipt.evidence {
        output::field("Evidence", &evidence.url);
    }
    if receipt.low_confidence {
        output::warning("Too few comparable metrics; this reading cannot resolve markets");
    }
    for market_id in &report.resolved {
        output::field("Resolved", market_id);
    }
    for market_id in &report.failed {
        output::warning(&format!("Market {market_id} failed to resolve"));
    }
    Ok(())
}

fn health_label(health: HealthStatus) -> String {
    match health {
        HealthStatus::Healthy => output::positive(health),
        HealthStatus::Warning | HealthStatus::Critical => output::negative(health),
        HealthStatus::Unknown => output::muted(health),
    }
}

/// Parse repeated `NAME=VALUE` baseline arguments.
fn parse_baseline(pairs: &[String]) -> Result<BTreeMap<String, f64>> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                Error::Validation(format!("baseline '{pair}' must be NAME=VALUE"))
            })?;
            let value: f64 = value.trim().parse().map_err(|_| {
                Error::Validation(format!("baseline '{pair}' has a non-numeric value"))
            })?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_pairs_parse() {
        let parsed = parse_baseline(&["accuracy=0.91".into(), " f1 = 0.88".into()]).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["accuracy"], 0.91);
        assert_eq!(parsed["f1"], 0.88);
    }

    #[test]
    fn baseline_requires_separator_and_number() {
        assert!(parse_baseline(&["accuracy".into()]).is_err());
        assert!(parse_baseline(&["accuracy=high".into()]).is_err());
    }
}
