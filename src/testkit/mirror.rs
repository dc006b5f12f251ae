//! Receipt mirrors for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::port::{MirrorUpload, ReceiptMirror};

/// Mirror whose uploads always fail.
#[derive(Debug, Default)]
pub struct FailingMirror;

#[async_trait]
impl ReceiptMirror for FailingMirror {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn upload(&self, content_hash: &str, _bytes: &[u8]) -> Result<MirrorUpload> {
        Err(Error::Fetch(format!("mirror unavailable for {content_hash}")))
    }
}

/// Mirror that keeps uploaded bytes keyed by content hash.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, content_hash: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(content_hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReceiptMirror for MemoryMirror {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upload(&self, content_hash: &str, bytes: &[u8]) -> Result<MirrorUpload> {
        self.objects
            .lock()
            .insert(content_hash.to_string(), bytes.to_vec());
        Ok(MirrorUpload {
            url: format!("memory://{content_hash}"),
            proof: Some(format!("proof-{content_hash}")),
        })
    }
}
