//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                  ┌─────────────────────────┐
//!   CLI ──────────►│   Application (Engine)  │◄────────── Scheduler
//!                  └───────────┬─────────────┘
//!          ┌──────────┬────────┼─────────┬──────────┐
//!          ▼          ▼        ▼         ▼          ▼
//!      ┌───────┐ ┌─────────┐ ┌──────┐ ┌────────┐ ┌───────┐
//!      │Ledger │ │ Fetcher │ │Mirror│ │Notifier│ │ Clock │
//!      └───────┘ └─────────┘ └──────┘ └────────┘ └───────┘
//! ```
//!
//! - [`LedgerStore`] - Atomic units of work over the ledger
//! - [`DriftFetcher`] - Monitoring endpoint client
//! - [`ReceiptMirror`] - Best-effort durable receipt copies
//! - [`Notifier`] - Fire-and-forget event delivery
//! - [`Clock`] - Time source

pub mod outbound;

pub use outbound::clock::{Clock, SystemClock};
pub use outbound::fetcher::DriftFetcher;
pub use outbound::mirror::{MirrorUpload, ReceiptMirror};
pub use outbound::notifier::{
    AttentionEvent, AttentionSubject, DriftEvent, Event, LogNotifier, Notifier, NotifierRegistry,
    NullNotifier, ResolutionEvent, WinningsEvent,
};
pub use outbound::store::{LedgerStore, LedgerTx, MarketFilter};
