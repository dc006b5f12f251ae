//! Builders for domain inputs used across tests.
//!
//! Concise factory functions so tests focus on assertions rather than
//! construction boilerplate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    Amount, EndpointAuth, MetricsSnapshot, ModelId, NewMarket, NewModel, UserId, MICROS_PER_USDC,
};

/// Whole USDC in micro-units.
pub fn usdc(whole: u64) -> Amount {
    whole * MICROS_PER_USDC
}

pub fn user(name: &str) -> UserId {
    UserId::new(name)
}

/// Metric map from name/value pairs.
pub fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

/// Endpoint response carrying only metrics.
pub fn snapshot(pairs: &[(&str, f64)]) -> MetricsSnapshot {
    MetricsSnapshot {
        metrics: metrics(pairs),
        ..MetricsSnapshot::default()
    }
}

/// Baseline accuracy of 0.90 with a 5% threshold, monitored hourly.
pub fn new_model(owner: &str, endpoint: &str) -> NewModel {
    NewModel {
        owner_id: user(owner),
        name: "fraud-detector".to_string(),
        monitoring_endpoint: endpoint.to_string(),
        auth: EndpointAuth::None,
        baseline_metrics: metrics(&[("accuracy", 0.90)]),
        drift_threshold_percent: 5.0,
        monitoring_frequency_hours: 1,
    }
}

pub fn new_market(model_id: &ModelId, deadline: DateTime<Utc>) -> NewMarket {
    NewMarket {
        model_id: model_id.clone(),
        creator_id: user("creator"),
        title: "Will the fraud detector drift this week?".to_string(),
        resolution_deadline: deadline,
        drift_threshold_percent: None,
    }
}
