//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for delivery backends beyond the
//! built-in log and null notifiers.

mod webhook;

pub use webhook::WebhookNotifier;
