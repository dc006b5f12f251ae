//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`clock`]: [`ManualClock`](clock::ManualClock), a settable time source.
//! - [`fetcher`]: [`ScriptedFetcher`](fetcher::ScriptedFetcher) with per-endpoint
//!   scripted metrics and failures.
//! - [`mirror`]: Receipt mirrors that always fail or keep uploads in memory.
//! - [`notifier`]: [`RecordingNotifier`](notifier::RecordingNotifier).
//! - [`domain`]: Builders for models, markets, and metric snapshots.
//! - [`engine`]: A fully wired in-memory engine for scenario tests.

pub mod clock;
pub mod domain;
pub mod engine;
pub mod fetcher;
pub mod mirror;
pub mod notifier;
