//! Monitored model types.
//!
//! A [`Model`] is the subject of an oracle: its monitoring endpoint is polled
//! on a schedule and the readings are compared against recorded baselines.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ModelId, UserId};
use crate::error::Error;

/// Health of a model derived from its latest drift reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Never monitored.
    Unknown,
    /// Drift at or below threshold.
    Healthy,
    /// Drift above threshold, at most twice the threshold.
    Warning,
    /// Drift above twice the threshold.
    Critical,
}

impl HealthStatus {
    /// Classify a drift percentage against a threshold.
    #[must_use]
    pub fn classify(drift_percentage: f64, threshold_percent: f64) -> Self {
        if drift_percentage > threshold_percent * 2.0 {
            Self::Critical
        } else if drift_percentage > threshold_percent {
            Self::Warning
        } else {
            Self::Healthy
        }
    }

    /// Stable name used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "healthy" => Ok(Self::Healthy),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(Error::Parse(format!("unknown health status '{other}'"))),
        }
    }
}

/// Credentials presented to a monitoring endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EndpointAuth {
    #[default]
    None,
    Bearer {
        token: String,
    },
    ApiKey {
        key: String,
    },
}

/// A monitored model with baseline metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub owner_id: UserId,
    pub name: String,
    pub monitoring_endpoint: String,
    pub auth: EndpointAuth,
    pub baseline_metrics: BTreeMap<String, f64>,
    pub drift_threshold_percent: f64,
    pub monitoring_frequency_hours: u32,
    pub health_status: HealthStatus,
    pub current_metrics: Option<BTreeMap<String, f64>>,
    pub last_monitored_at: Option<DateTime<Utc>>,
    pub total_monitoring_cycles: u64,
    pub is_active: bool,
    /// Set when automated processing gave up; cleared by the next success.
    pub attention: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Whether a monitoring cycle is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.last_monitored_at {
            None => true,
            Some(last) => {
                now - last >= Duration::hours(i64::from(self.monitoring_frequency_hours))
            }
        }
    }
}

/// Input for registering a model.
#[derive(Debug, Clone)]
pub struct NewModel {
    pub owner_id: UserId,
    pub name: String,
    pub monitoring_endpoint: String,
    pub auth: EndpointAuth,
    pub baseline_metrics: BTreeMap<String, f64>,
    pub drift_threshold_percent: f64,
    pub monitoring_frequency_hours: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_boundaries() {
        assert_eq!(HealthStatus::classify(5.0, 5.0), HealthStatus::Healthy);
        assert_eq!(HealthStatus::classify(5.1, 5.0), HealthStatus::Warning);
        assert_eq!(HealthStatus::classify(10.0, 5.0), HealthStatus::Warning);
        assert_eq!(HealthStatus::classify(10.1, 5.0), HealthStatus::Critical);
    }

    #[test]
    fn health_status_parses_its_own_names() {
        for status in [
            HealthStatus::Unknown,
            HealthStatus::Healthy,
            HealthStatus::Warning,
            HealthStatus::Critical,
        ] {
            assert_eq!(status.as_str().parse::<HealthStatus>().unwrap(), status);
        }
        assert!("sick".parse::<HealthStatus>().is_err());
    }

    #[test]
    fn endpoint_auth_serializes_with_method_tag() {
        let auth = EndpointAuth::Bearer {
            token: "t".into(),
        };
        let json = serde_json::to_string(&auth).unwrap();
        assert_eq!(json, r#"{"method":"bearer","token":"t"}"#);
        let back: EndpointAuth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, auth);
    }

    #[test]
    fn due_when_never_monitored_or_frequency_elapsed() {
        let now = Utc::now();
        let mut model = Model {
            id: ModelId::from("m"),
            owner_id: UserId::new("owner"),
            name: "fraud".into(),
            monitoring_endpoint: "https://example.com/metrics".into(),
            auth: EndpointAuth::None,
            baseline_metrics: BTreeMap::new(),
            drift_threshold_percent: 5.0,
            monitoring_frequency_hours: 2,
            health_status: HealthStatus::Unknown,
            current_metrics: None,
            last_monitored_at: None,
            total_monitoring_cycles: 0,
            is_active: true,
            attention: None,
            created_at: now,
        };
        assert!(model.is_due(now));

        model.last_monitored_at = Some(now - Duration::hours(1));
        assert!(!model.is_due(now));

        model.last_monitored_at = Some(now - Duration::hours(2));
        assert!(model.is_due(now));

        model.is_active = false;
        assert!(!model.is_due(now));
    }
}
