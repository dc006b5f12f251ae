//! SQLite persistence adapter.
//!
//! Implements the ledger store on Diesel with embedded migrations.

pub mod database;
mod store;

pub use store::SqliteLedger;
