//! Infrastructure layer.
//!
//! Technical concerns that support the engine without containing business
//! logic: configuration, runtime wiring, and the background scheduler.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`scheduler`] - Monitoring and resolution sweeps

pub mod bootstrap;
pub mod config;
pub mod scheduler;
