//! Drift data fetcher port.

use async_trait::async_trait;

use crate::domain::{EndpointAuth, MetricsSnapshot};
use crate::error::Result;

/// Client for a model's monitoring endpoint.
///
/// # Errors
///
/// [`fetch`](Self::fetch) returns `Fetch` for unreachable endpoints or
/// malformed responses. Callers bound the call with their own timeout.
#[async_trait]
pub trait DriftFetcher: Send + Sync {
    /// Fetch current metrics from `endpoint`.
    async fn fetch(&self, endpoint: &str, auth: &EndpointAuth) -> Result<MetricsSnapshot>;
}
