//! Application services (use cases).
//!
//! [`Engine`] orchestrates domain logic over the outbound ports. Its methods
//! are split by concern: model registry, markets and bets, wallet, oracle
//! monitoring, resolution, and settlement.

mod engine;
mod market;
mod model;
mod oracle;
mod resolution;
mod settlement;
mod wallet;

pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use market::BetReceipt;
pub use oracle::MonitoringReport;
pub use resolution::Resolution;
pub use settlement::{ClaimReceipt, Settlement};
