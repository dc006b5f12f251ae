//! Durable receipt mirror port.

use async_trait::async_trait;

use crate::error::Result;

/// Location of an uploaded receipt copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorUpload {
    pub url: String,
    pub proof: Option<String>,
}

/// External durable store for receipt copies. Failures are never fatal.
#[async_trait]
pub trait ReceiptMirror: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Upload the canonical bytes of a receipt addressed by its hash.
    async fn upload(&self, content_hash: &str, bytes: &[u8]) -> Result<MirrorUpload>;
}
