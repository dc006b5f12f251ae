//! Webhook delivery of engine events.
//!
//! Events are queued on a bounded channel and posted as JSON by a background
//! worker, so `notify` never blocks the caller. When the endpoint falls behind
//! and the queue is full, new events are dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::port::{Event, Notifier};

/// Events buffered while the webhook endpoint is slow or down.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Notifier that POSTs each event to a webhook URL.
pub struct WebhookNotifier {
    sender: mpsc::Sender<Event>,
    dropped: AtomicU64,
}

impl WebhookNotifier {
    /// Create the notifier and spawn its delivery worker.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(url: String, timeout: Duration) -> Self {
        Self::with_capacity(url, timeout, DEFAULT_QUEUE_CAPACITY)
    }

    /// Like [`WebhookNotifier::new`] with an explicit queue capacity.
    #[must_use]
    pub fn with_capacity(url: String, timeout: Duration, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build webhook client, using defaults");
                Client::new()
            });
        tokio::spawn(webhook_worker(http, url, receiver));
        Self {
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    /// Events dropped because the queue was full or the worker had stopped.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: Event) {
        let reason = match self.sender.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "queue full",
            Err(TrySendError::Closed(_)) => "worker stopped",
        };
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(reason, dropped, "Dropping webhook event");
    }
}

async fn webhook_worker(http: Client, url: String, mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match http.post(&url).json(&event).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(url = %url, status = %response.status(), "Webhook delivered");
            }
            Ok(response) => {
                warn!(url = %url, status = %response.status(), "Webhook rejected event");
            }
            Err(err) => {
                warn!(url = %url, error = %err, "Webhook delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketId, UserId};
    use crate::port::WinningsEvent;

    fn winnings(payout: u64) -> Event {
        Event::WinningsAvailable(WinningsEvent {
            user_id: UserId::new("alice"),
            market_id: MarketId::from("m"),
            payout,
        })
    }

    #[tokio::test]
    async fn notify_never_blocks_on_unreachable_webhook() {
        let notifier =
            WebhookNotifier::new("http://127.0.0.1:9/hook".into(), Duration::from_millis(100));
        notifier.notify(winnings(1));
        assert_eq!(notifier.dropped(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts_events() {
        // The worker cannot drain before this task yields.
        let notifier = WebhookNotifier::with_capacity(
            "http://127.0.0.1:9/hook".into(),
            Duration::from_millis(100),
            2,
        );
        for payout in 0..5 {
            notifier.notify(winnings(payout));
        }
        assert_eq!(notifier.dropped(), 3);
    }
}
