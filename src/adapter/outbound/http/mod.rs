//! HTTP adapters for the monitoring endpoint and the receipt mirror.

mod fetcher;
mod mirror;

pub use fetcher::HttpDriftFetcher;
pub use mirror::HttpReceiptMirror;

use std::time::Duration;

use reqwest::Client;
use tracing::warn;

/// Build a client with the given request timeout, falling back to defaults.
fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "Failed to build HTTP client, using defaults");
            Client::new()
        })
}
