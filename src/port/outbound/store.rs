//! Ledger persistence port.
//!
//! All reads and writes go through a unit of work opened by
//! [`LedgerStore::atomically`]. A unit of work either commits every write or,
//! when the closure returns an error, none of them. Implementations serialize
//! units of work that touch the same rows, so a read-modify-write inside one
//! closure never loses an update.

use chrono::{DateTime, Utc};

use crate::domain::{
    BetRecord, Market, MarketId, MarketStatus, Model, ModelId, MonitoringReceipt, Position,
    ReceiptId, Transaction, UserBalance, UserId,
};
use crate::error::Result;

/// Selection criteria for listing markets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketFilter {
    pub model_id: Option<ModelId>,
    pub status: Option<MarketStatus>,
    /// Only markets whose deadline is at or before this instant.
    pub deadline_before: Option<DateTime<Utc>>,
}

impl MarketFilter {
    /// Active markets past their deadline at `now`.
    #[must_use]
    pub fn due(now: DateTime<Utc>) -> Self {
        Self {
            model_id: None,
            status: Some(MarketStatus::Active),
            deadline_before: Some(now),
        }
    }

    #[must_use]
    pub fn for_model(mut self, model_id: ModelId) -> Self {
        self.model_id = Some(model_id);
        self
    }

    /// Whether a market satisfies this filter.
    #[must_use]
    pub fn matches(&self, market: &Market) -> bool {
        self.model_id.as_ref().map_or(true, |id| *id == market.model_id)
            && self.status.map_or(true, |s| s == market.status)
            && self
                .deadline_before
                .map_or(true, |at| market.resolution_deadline <= at)
    }
}

/// Operations available inside one unit of work.
pub trait LedgerTx {
    // Models
    fn model(&mut self, id: &ModelId) -> Result<Option<Model>>;
    fn save_model(&mut self, model: &Model) -> Result<()>;
    fn models(&mut self, active_only: bool) -> Result<Vec<Model>>;

    // Markets
    fn market(&mut self, id: &MarketId) -> Result<Option<Market>>;
    fn insert_market(&mut self, market: &Market) -> Result<()>;
    fn save_market(&mut self, market: &Market) -> Result<()>;
    /// Write `resolved` only if the stored market is still active.
    ///
    /// Returns `false` without writing when another resolution won.
    fn resolve_market_if_active(&mut self, resolved: &Market) -> Result<bool>;
    /// Markets matching the filter, ordered by deadline then id.
    fn markets(&mut self, filter: &MarketFilter) -> Result<Vec<Market>>;

    // Positions
    fn position(&mut self, market_id: &MarketId, user_id: &UserId) -> Result<Option<Position>>;
    fn save_position(&mut self, position: &Position) -> Result<()>;
    /// Mark a position claimed only if it is not already.
    ///
    /// Returns `false` without writing when it was already claimed.
    fn claim_position_if_unclaimed(
        &mut self,
        market_id: &MarketId,
        user_id: &UserId,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool>;
    /// Positions of a market ordered by creation.
    fn positions_for_market(&mut self, market_id: &MarketId) -> Result<Vec<Position>>;
    fn positions_for_user(&mut self, user_id: &UserId) -> Result<Vec<Position>>;

    // Balances
    fn balance(&mut self, user_id: &UserId) -> Result<Option<UserBalance>>;
    fn save_balance(&mut self, balance: &UserBalance) -> Result<()>;
    fn balances(&mut self) -> Result<Vec<UserBalance>>;

    // Append-only logs
    fn append_transaction(&mut self, transaction: &Transaction) -> Result<()>;
    fn transactions_for_user(&mut self, user_id: &UserId) -> Result<Vec<Transaction>>;
    fn transactions_for_market(&mut self, market_id: &MarketId) -> Result<Vec<Transaction>>;
    fn append_bet(&mut self, bet: &BetRecord) -> Result<()>;
    fn bets_for_market(&mut self, market_id: &MarketId) -> Result<Vec<BetRecord>>;

    // Receipts
    fn append_receipt(&mut self, receipt: &MonitoringReceipt) -> Result<()>;
    fn receipt(&mut self, id: &ReceiptId) -> Result<Option<MonitoringReceipt>>;
    /// Most recent receipt for a model recorded at or before `at`.
    fn latest_receipt_at_or_before(
        &mut self,
        model_id: &ModelId,
        at: DateTime<Utc>,
    ) -> Result<Option<MonitoringReceipt>>;
    fn receipts_for_model(&mut self, model_id: &ModelId) -> Result<Vec<MonitoringReceipt>>;
}

/// Durable ledger with atomic units of work.
pub trait LedgerStore: Send + Sync + 'static {
    /// True when units of work block on file or network I/O.
    const BLOCKING: bool = false;

    /// Run `work` as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns the closure's error after rolling back, or a storage error if
    /// the unit could not be opened or committed.
    fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>;
}
