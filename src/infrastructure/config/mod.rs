//! Infrastructure configuration modules.

pub mod logging;
pub mod market;
pub mod notification;
pub mod oracle;
pub mod scheduler;
pub mod settings;

pub use settings::Config;
