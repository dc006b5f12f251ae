//! Receipt mirror over HTTP.
//!
//! Uploads canonical receipt bytes with `PUT {base}/{hash}.json`. A JSON
//! body of `{"url", "proof"}` in the response overrides the stored location;
//! an empty body means the object lives at the upload URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;

use super::build_client;
use crate::error::{Error, Result};
use crate::port::{MirrorUpload, ReceiptMirror};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
    proof: Option<String>,
}

/// HTTP object store mirror for receipts.
pub struct HttpReceiptMirror {
    http: Client,
    base_url: String,
}

impl HttpReceiptMirror {
    /// Create a mirror rooted at `base_url`.
    ///
    /// # Errors
    /// Returns `Url` if `base_url` does not parse.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)?;
        Ok(Self {
            http: build_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, content_hash: &str) -> String {
        format!("{}/{content_hash}.json", self.base_url)
    }
}

#[async_trait]
impl ReceiptMirror for HttpReceiptMirror {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn upload(&self, content_hash: &str, bytes: &[u8]) -> Result<MirrorUpload> {
        let target = self.object_url(content_hash);
        let response = self
            .http
            .put(&target)
            .header(CONTENT_TYPE, "application/json")
            .body(bytes.to_vec())
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(MirrorUpload {
                url: target,
                proof: None,
            });
        }
        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::Parse(format!("mirror response: {e}")))?;
        Ok(MirrorUpload {
            url: parsed.url.unwrap_or(target),
            proof: parsed.proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_is_hash_addressed() {
        let mirror = HttpReceiptMirror::new("https://mirror.test/receipts/", Duration::from_secs(1)).unwrap();
        assert_eq!(mirror.object_url("abc"), "https://mirror.test/receipts/abc.json");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            HttpReceiptMirror::new("not a url", Duration::from_secs(1)),
            Err(Error::Url(_))
        ));
    }
}
