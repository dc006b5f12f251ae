//! In-memory ledger for tests and embedded use.
//!
//! Units of work hold a single mutex for their whole duration and record an
//! undo journal; a failed closure replays the journal backwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{
    BetRecord, Market, MarketId, Model, ModelId, MonitoringReceipt, Position, ReceiptId,
    Transaction, UserBalance, UserId,
};
use crate::error::{Error, Result};
use crate::port::{LedgerStore, LedgerTx, MarketFilter};

type PositionKey = (MarketId, UserId);

#[derive(Debug, Default)]
struct Tables {
    models: BTreeMap<ModelId, Model>,
    markets: BTreeMap<MarketId, Market>,
    /// Positions with their insertion sequence.
    positions: BTreeMap<PositionKey, (u64, Position)>,
    next_position_seq: u64,
    balances: BTreeMap<UserId, UserBalance>,
    transactions: Vec<Transaction>,
    bets: Vec<BetRecord>,
    receipts: Vec<MonitoringReceipt>,
}

enum Undo {
    Model(ModelId, Option<Model>),
    Market(MarketId, Option<Market>),
    Position(PositionKey, Option<(u64, Position)>),
    Balance(UserId, Option<UserBalance>),
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tables: Mutex<Tables>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedger {
    fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>,
    {
        let mut tables = self.tables.lock();
        let marks = (
            tables.transactions.len(),
            tables.bets.len(),
            tables.receipts.len(),
            tables.next_position_seq,
        );
        let mut tx = MemoryTx {
            tables: &mut tables,
            journal: Vec::new(),
        };
        match work(&mut tx) {
            Ok(value) => Ok(value),
            Err(e) => {
                tx.rollback(marks);
                Err(e)
            }
        }
    }
}

struct MemoryTx<'a> {
    tables: &'a mut Tables,
    journal: Vec<Undo>,
}

impl MemoryTx<'_> {
    fn rollback(self, (transactions, bets, receipts, seq): (usize, usize, usize, u64)) {
        let tables = self.tables;
        for undo in self.journal.into_iter().rev() {
            match undo {
                Undo::Model(id, prev) => restore(&mut tables.models, id, prev),
                Undo::Market(id, prev) => restore(&mut tables.markets, id, prev),
                Undo::Position(key, prev) => restore(&mut tables.positions, key, prev),
                Undo::Balance(id, prev) => restore(&mut tables.balances, id, prev),
            }
        }
        tables.transactions.truncate(transactions);
        tables.bets.truncate(bets);
        tables.receipts.truncate(receipts);
        tables.next_position_seq = seq;
    }
}

fn restore<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, prev: Option<V>) {
    match prev {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

impl LedgerTx for MemoryTx<'_> {
    fn model(&mut self, id: &ModelId) -> Result<Option<Model>> {
        Ok(self.tables.models.get(id).cloned())
    }

    fn save_model(&mut self, model: &Model) -> Result<()> {
        let prev = self.tables.models.insert(model.id.clone(), model.clone());
        self.journal.push(Undo::Model(model.id.clone(), prev));
        Ok(())
    }

    fn models(&mut self, active_only: bool) -> Result<Vec<Model>> {
        Ok(self
            .tables
            .models
            .values()
            .filter(|m| !active_only || m.is_active)
            .cloned()
            .collect())
    }

    fn market(&mut self, id: &MarketId) -> Result<Option<Market>> {
        Ok(self.tables.markets.get(id).cloned())
    }

    fn insert_market(&mut self, market: &Market) -> Result<()> {
        if self.tables.markets.contains_key(&market.id) {
            return Err(Error::Database(format!("market {} already exists", market.id)));
        }
        self.save_market(market)
    }

    fn save_market(&mut self, market: &Market) -> Result<()> {
        let prev = self.tables.markets.insert(market.id.clone(), market.clone());
        self.journal.push(Undo::Market(market.id.clone(), prev));
        Ok(())
    }

    fn resolve_market_if_active(&mut self, resolved: &Market) -> Result<bool> {
        let active = self
            .tables
            .markets
            .get(&resolved.id)
            .is_some_and(Market::is_active);
        if !active {
            return Ok(false);
        }
        self.save_market(resolved)?;
        Ok(true)
    }

    fn markets(&mut self, filter: &MarketFilter) -> Result<Vec<Market>> {
        let mut markets: Vec<Market> = self
            .tables
            .markets
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        markets.sort_by(|a, b| {
            a.resolution_deadline
                .cmp(&b.resolution_deadline)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(markets)
    }

    fn position(&mut self, market_id: &MarketId, user_id: &UserId) -> Result<Option<Position>> {
        Ok(self
            .tables
            .positions
            .get(&(market_id.clone(), user_id.clone()))
            .map(|(_, p)| p.clone()))
    }

    fn save_position(&mut self, position: &Position) -> Result<()> {
        let key = (position.market_id.clone(), position.user_id.clone());
        let seq = match self.tables.positions.get(&key) {
            Some((seq, _)) => *seq,
            None => {
                self.tables.next_position_seq += 1;
                self.tables.next_position_seq
            }
        };
        let prev = self
            .tables
            .positions
            .insert(key.clone(), (seq, position.clone()));
        self.journal.push(Undo::Position(key, prev));
        Ok(())
    }

    fn claim_position_if_unclaimed(
        &mut self,
        market_id: &MarketId,
        user_id: &UserId,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(mut position) = self.position(market_id, user_id)? else {
            return Ok(false);
        };
        if position.is_claimed {
            return Ok(false);
        }
        position.is_claimed = true;
        position.claimed_at = Some(claimed_at);
        position.updated_at = claimed_at;
        self.save_position(&position)?;
        Ok(true)
    }

    fn positions_for_market(&mut self, market_id: &MarketId) -> Result<Vec<Position>> {
        let mut positions: Vec<&(u64, Position)> = self
            .tables
            .positions
            .iter()
            .filter(|((m, _), _)| m == market_id)
            .map(|(_, entry)| entry)
            .collect();
        positions.sort_by_key(|(seq, _)| *seq);
        Ok(positions.into_iter().map(|(_, p)| p.clone()).collect())
    }

    fn positions_for_user(&mut self, user_id: &UserId) -> Result<Vec<Position>> {
        let mut positions: Vec<&(u64, Position)> = self
            .tables
            .positions
            .iter()
            .filter(|((_, u), _)| u == user_id)
            .map(|(_, entry)| entry)
            .collect();
        positions.sort_by_key(|(seq, _)| *seq);
        Ok(positions.into_iter().map(|(_, p)| p.clone()).collect())
    }

    fn balance(&mut self, user_id: &UserId) -> Result<Option<UserBalance>> {
        Ok(self.tables.balances.get(user_id).cloned())
    }

    fn save_balance(&mut self, balance: &UserBalance) -> Result<()> {
        let prev = self
            .tables
            .balances
            .insert(balance.user_id.clone(), balance.clone());
        self.journal.push(Undo::Balance(balance.user_id.clone(), prev));
        Ok(())
    }

    fn balances(&mut self) -> Result<Vec<UserBalance>> {
        Ok(self.tables.balances.values().cloned().collect())
    }

    fn append_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        self.tables.transactions.push(transaction.clone());
        Ok(())
    }

    fn transactions_for_user(&mut self, user_id: &UserId) -> Result<Vec<Transaction>> {
        Ok(self
            .tables
            .transactions
            .iter()
            .filter(|t| t.user_id == *user_id)
            .cloned()
            .collect())
    }

    fn transactions_for_market(&mut self, market_id: &MarketId) -> Result<Vec<Transaction>> {
        Ok(self
            .tables
            .transactions
            .iter()
            .filter(|t| t.market_id.as_ref() == Some(market_id))
            .cloned()
            .collect())
    }

    fn append_bet(&mut self, bet: &BetRecord) -> Result<()> {
        self.tables.bets.push(bet.clone());
        Ok(())
    }

    fn bets_for_market(&mut self, market_id: &MarketId) -> Result<Vec<BetRecord>> {
        Ok(self
            .tables
            .bets
            .iter()
            .filter(|b| b.market_id == *market_id)
            .cloned()
            .collect())
    }

    fn append_receipt(&mut self, receipt: &MonitoringReceipt) -> Result<()> {
        if self.tables.receipts.iter().any(|r| r.id == receipt.id) {
            return Err(Error::Database(format!("receipt {} already exists", receipt.id)));
        }
        self.tables.receipts.push(receipt.clone());
        Ok(())
    }

    fn receipt(&mut self, id: &ReceiptId) -> Result<Option<MonitoringReceipt>> {
        Ok(self.tables.receipts.iter().find(|r| r.id == *id).cloned())
    }

    fn latest_receipt_at_or_before(
        &mut self,
        model_id: &ModelId,
        at: DateTime<Utc>,
    ) -> Result<Option<MonitoringReceipt>> {
        // Later appends win ties on the timestamp.
        Ok(self
            .tables
            .receipts
            .iter()
            .enumerate()
            .filter(|(_, r)| r.model_id == *model_id && r.recorded_at <= at)
            .max_by_key(|(i, r)| (r.recorded_at, *i))
            .map(|(_, r)| r.clone()))
    }

    fn receipts_for_model(&mut self, model_id: &ModelId) -> Result<Vec<MonitoringReceipt>> {
        Ok(self
            .tables
            .receipts
            .iter()
            .filter(|r| r.model_id == *model_id)
            .cloned()
            .collect())
    }
}
