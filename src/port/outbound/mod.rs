//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the engine's infrastructure dependencies: the
//! ledger store, the monitoring endpoint, the receipt mirror, notifications,
//! and the clock.

pub mod clock;
pub mod fetcher;
pub mod mirror;
pub mod notifier;
pub mod store;
