//! Scripted drift fetcher.
//!
//! Each endpoint has a queue of one-shot results and an optional sticky
//! snapshot returned once the queue is empty. Unknown endpoints fail.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{EndpointAuth, MetricsSnapshot};
use crate::error::{Error, Result};
use crate::port::DriftFetcher;

#[derive(Default)]
struct Script {
    queue: VecDeque<Result<MetricsSnapshot>>,
    sticky: Option<MetricsSnapshot>,
}

#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    delay: Mutex<Option<Duration>>,
    calls: Arc<AtomicU32>,
    last_auth: Mutex<Option<EndpointAuth>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `snapshot` for every later fetch of `endpoint`.
    pub fn respond(&self, endpoint: &str, snapshot: MetricsSnapshot) {
        self.scripts
            .lock()
            .entry(endpoint.to_string())
            .or_default()
            .sticky = Some(snapshot);
    }

    /// Queue a one-shot result for `endpoint`.
    pub fn push(&self, endpoint: &str, result: Result<MetricsSnapshot>) {
        self.scripts
            .lock()
            .entry(endpoint.to_string())
            .or_default()
            .queue
            .push_back(result);
    }

    /// Queue `times` fetch failures for `endpoint`.
    pub fn fail_next(&self, endpoint: &str, times: usize) {
        for _ in 0..times {
            self.push(endpoint, Err(Error::Fetch(format!("{endpoint}: connection refused"))));
        }
    }

    /// Sleep before answering every fetch.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_auth(&self) -> Option<EndpointAuth> {
        self.last_auth.lock().clone()
    }

    fn next(&self, endpoint: &str) -> Result<MetricsSnapshot> {
        let mut scripts = self.scripts.lock();
        let Some(script) = scripts.get_mut(endpoint) else {
            return Err(Error::Fetch(format!("{endpoint}: no scripted response")));
        };
        if let Some(result) = script.queue.pop_front() {
            return result;
        }
        script
            .sticky
            .clone()
            .ok_or_else(|| Error::Fetch(format!("{endpoint}: script exhausted")))
    }
}

#[async_trait]
impl DriftFetcher for ScriptedFetcher {
    async fn fetch(&self, endpoint: &str, auth: &EndpointAuth) -> Result<MetricsSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_auth.lock() = Some(auth.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.next(endpoint)
    }
}
