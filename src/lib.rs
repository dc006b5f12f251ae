//! Driftpool - pooled-stake prediction markets resolved by model drift oracles.
//!
//! Users stake USDC on whether a monitored ML model will drift past a
//! threshold before a deadline. An oracle polls each model's monitoring
//! endpoint, records hash-addressed receipts, and resolves due markets;
//! winners split the pool pro-rata after a platform fee.
//!
//! # Architecture
//!
//! - [`domain`] - Pure types and math: pools, odds, drift, payouts
//! - [`port`] - Outbound traits: ledger store, fetcher, mirror, notifier, clock
//! - [`application`] - The [`application::Engine`] use cases
//! - [`adapter`] - SQLite and in-memory ledgers, HTTP clients, webhook, CLI
//! - [`infrastructure`] - Configuration, bootstrap wiring, scheduler
//!
//! # Example
//!
//! ```no_run
//! use driftpool::infrastructure::bootstrap::build_engine;
//! use driftpool::infrastructure::config::Config;
//!
//! # async fn demo() -> driftpool::error::Result<()> {
//! let config = Config::load("driftpool.toml")?;
//! let engine = build_engine(&config)?;
//! for market in engine.markets_due().await? {
//!     engine.resolve_market(&market.id).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
