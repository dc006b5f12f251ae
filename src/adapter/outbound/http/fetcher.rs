//! Monitoring endpoint client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::build_client;
use crate::domain::{EndpointAuth, MetricsSnapshot};
use crate::error::{Error, Result};
use crate::port::DriftFetcher;

/// Header carrying an API key credential.
const API_KEY_HEADER: &str = "X-API-Key";

/// Raw monitoring endpoint payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsResponse {
    metrics: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    data_quality: Option<Value>,
    #[serde(default)]
    feature_drift: Option<Value>,
}

impl MetricsResponse {
    /// Keep finite numeric metrics; anything else is not comparable.
    fn into_snapshot(self, endpoint: &str) -> Result<MetricsSnapshot> {
        let raw = self
            .metrics
            .ok_or_else(|| Error::Fetch(format!("{endpoint}: response has no metrics object")))?;
        let metrics: BTreeMap<String, f64> = raw
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().filter(|v| v.is_finite()).map(|v| (name, v)))
            .collect();
        Ok(MetricsSnapshot {
            metrics,
            data_quality: self.data_quality,
            feature_drift: self.feature_drift,
        })
    }
}

/// Fetches current metrics over HTTP GET.
pub struct HttpDriftFetcher {
    http: Client,
}

impl HttpDriftFetcher {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: build_client(timeout),
        }
    }

    fn authorize(request: RequestBuilder, auth: &EndpointAuth) -> RequestBuilder {
        match auth {
            EndpointAuth::None => request,
            EndpointAuth::Bearer { token } => request.bearer_auth(token),
            EndpointAuth::ApiKey { key } => request.header(API_KEY_HEADER, key),
        }
    }
}

#[async_trait]
impl DriftFetcher for HttpDriftFetcher {
    async fn fetch(&self, endpoint: &str, auth: &EndpointAuth) -> Result<MetricsSnapshot> {
        let request = Self::authorize(self.http.get(endpoint), auth);
        let response = request
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{endpoint}: HTTP {status}")));
        }

        let body: MetricsResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("{endpoint}: malformed response: {e}")))?;
        let snapshot = body.into_snapshot(endpoint)?;
        debug!(endpoint = %endpoint, metrics = snapshot.metrics.len(), "Fetched monitoring metrics");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<MetricsSnapshot> {
        serde_json::from_value::<MetricsResponse>(body)
            .unwrap()
            .into_snapshot("http://model.test/metrics")
    }

    #[test]
    fn keeps_numeric_metrics_and_optional_sections() {
        let snapshot = parse(json!({
            "metrics": {"accuracy": 0.91, "f1": 0.88, "label": "v2"},
            "dataQuality": {"missing": 0.01},
        }))
        .unwrap();

        assert_eq!(snapshot.metrics.len(), 2);
        assert_eq!(snapshot.metrics["accuracy"], 0.91);
        assert_eq!(snapshot.data_quality, Some(json!({"missing": 0.01})));
        assert!(snapshot.feature_drift.is_none());
    }

    #[test]
    fn missing_metrics_is_fetch_error() {
        let err = parse(json!({"status": "ok"})).unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_fetch_error() {
        let fetcher = HttpDriftFetcher::new(Duration::from_millis(200));
        let err = fetcher
            .fetch("http://127.0.0.1:9/metrics", &EndpointAuth::None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(err.is_retryable());
    }
}
