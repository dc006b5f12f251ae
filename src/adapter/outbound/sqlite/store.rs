//! SQLite ledger store implementation.
//!
//! Every unit of work runs inside `BEGIN IMMEDIATE`, so the write lock is
//! taken up front and concurrent units queue on `busy_timeout` instead of
//! failing on lock upgrade.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::debug;

use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations, DbPool};
use crate::adapter::outbound::sqlite::database::model::{
    encode_time, BalanceRow, BetRow, MarketRow, ModelRow, NewBetRow, NewReceiptRow,
    NewTransactionRow, PositionRow, ReceiptRow, TransactionRow,
};
use crate::adapter::outbound::sqlite::database::schema::{
    bets, markets, models, monitoring_receipts, positions, transactions, user_balances,
};
use crate::domain::{
    BetRecord, Market, MarketId, MarketStatus, Model, ModelId, MonitoringReceipt, Position,
    ReceiptId, Transaction, UserBalance, UserId,
};
use crate::error::{Error, Result};
use crate::port::{LedgerStore, LedgerTx, MarketFilter};

/// SQLite-backed ledger store.
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    /// Wrap an existing pool. Migrations must already have run.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database at `url` and apply pending migrations.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be built or a migration fails.
    pub fn open(url: &str, max_connections: u32) -> Result<Self> {
        let pool = create_pool(url, max_connections)?;
        run_migrations(&pool)?;
        debug!(url = %url, max_connections, "Ledger database ready");
        Ok(Self::new(pool))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if migrations fail.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:", 1)
    }
}

impl LedgerStore for SqliteLedger {
    const BLOCKING: bool = true;

    fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn LedgerTx) -> Result<T>,
    {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;
        conn.immediate_transaction(|conn| work(&mut SqliteTx { conn }))
    }
}

/// One open SQLite transaction.
struct SqliteTx<'c> {
    conn: &'c mut SqliteConnection,
}

fn convert<R, D>(rows: Vec<R>) -> Result<Vec<D>>
where
    D: TryFrom<R, Error = Error>,
{
    rows.into_iter().map(D::try_from).collect()
}

impl LedgerTx for SqliteTx<'_> {
    fn model(&mut self, id: &ModelId) -> Result<Option<Model>> {
        models::table
            .find(id.as_str())
            .select(ModelRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Model::try_from)
            .transpose()
    }

    fn save_model(&mut self, model: &Model) -> Result<()> {
        let row = ModelRow::try_from(model)?;
        diesel::replace_into(models::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn models(&mut self, active_only: bool) -> Result<Vec<Model>> {
        let mut query = models::table
            .select(ModelRow::as_select())
            .order(models::id.asc())
            .into_boxed();
        if active_only {
            query = query.filter(models::is_active.eq(true));
        }
        convert(query.load(self.conn)?)
    }

    fn market(&mut self, id: &MarketId) -> Result<Option<Market>> {
        markets::table
            .find(id.as_str())
            .select(MarketRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Market::try_from)
            .transpose()
    }

    fn insert_market(&mut self, market: &Market) -> Result<()> {
        let row = MarketRow::try_from(market)?;
        diesel::insert_into(markets::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn save_market(&mut self, market: &Market) -> Result<()> {
        let row = MarketRow::try_from(market)?;
        diesel::replace_into(markets::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn resolve_market_if_active(&mut self, resolved: &Market) -> Result<bool> {
        let row = MarketRow::try_from(resolved)?;
        let updated = diesel::update(
            markets::table
                .filter(markets::id.eq(resolved.id.as_str()))
                .filter(markets::status.eq(MarketStatus::Active.as_str())),
        )
        .set(&row)
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn markets(&mut self, filter: &MarketFilter) -> Result<Vec<Market>> {
        let mut query = markets::table
            .select(MarketRow::as_select())
            .order((markets::resolution_deadline.asc(), markets::id.asc()))
            .into_boxed();
        if let Some(model_id) = &filter.model_id {
            query = query.filter(markets::model_id.eq(model_id.as_str().to_owned()));
        }
        if let Some(status) = filter.status {
            query = query.filter(markets::status.eq(status.as_str()));
        }
        if let Some(at) = filter.deadline_before {
            query = query.filter(markets::resolution_deadline.le(encode_time(at)));
        }
        convert(query.load(self.conn)?)
    }

    fn position(&mut self, market_id: &MarketId, user_id: &UserId) -> Result<Option<Position>> {
        positions::table
            .filter(positions::market_id.eq(market_id.as_str()))
            .filter(positions::user_id.eq(user_id.as_str()))
            .select(PositionRow::as_select())
            .first(self.conn)
            .optional()?
            .map(Position::try_from)
            .transpose()
    }

    fn save_position(&mut self, position: &Position) -> Result<()> {
        let row = PositionRow::try_from(position)?;
        diesel::replace_into(positions::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn claim_position_if_unclaimed(
        &mut self,
        market_id: &MarketId,
        user_id: &UserId,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let at = encode_time(claimed_at);
        let updated = diesel::update(
            positions::table
                .filter(positions::market_id.eq(market_id.as_str()))
                .filter(positions::user_id.eq(user_id.as_str()))
                .filter(positions::is_claimed.eq(false)),
        )
        .set((
            positions::is_claimed.eq(true),
            positions::claimed_at.eq(Some(at.clone())),
            positions::updated_at.eq(at),
        ))
        .execute(self.conn)?;
        Ok(updated == 1)
    }

    fn positions_for_market(&mut self, market_id: &MarketId) -> Result<Vec<Position>> {
        let rows = positions::table
            .filter(positions::market_id.eq(market_id.as_str()))
            .order((positions::created_at.asc(), positions::id.asc()))
            .select(PositionRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }

    fn positions_for_user(&mut self, user_id: &UserId) -> Result<Vec<Position>> {
        let rows = positions::table
            .filter(positions::user_id.eq(user_id.as_str()))
            .order((positions::created_at.asc(), positions::id.asc()))
            .select(PositionRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }

    fn balance(&mut self, user_id: &UserId) -> Result<Option<UserBalance>> {
        user_balances::table
            .find(user_id.as_str())
            .select(BalanceRow::as_select())
            .first(self.conn)
            .optional()?
            .map(UserBalance::try_from)
            .transpose()
    }

    fn save_balance(&mut self, balance: &UserBalance) -> Result<()> {
        let row = BalanceRow::try_from(balance)?;
        diesel::replace_into(user_balances::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn balances(&mut self) -> Result<Vec<UserBalance>> {
        let rows = user_balances::table
            .order(user_balances::user_id.asc())
            .select(BalanceRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }

    fn append_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        let row = NewTransactionRow::try_from(transaction)?;
        diesel::insert_into(transactions::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn transactions_for_user(&mut self, user_id: &UserId) -> Result<Vec<Transaction>> {
        let rows = transactions::table
            .filter(transactions::user_id.eq(user_id.as_str()))
            .order(transactions::seq.asc())
            .select(TransactionRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }

    fn transactions_for_market(&mut self, market_id: &MarketId) -> Result<Vec<Transaction>> {
        let rows = transactions::table
            .filter(transactions::market_id.eq(market_id.as_str()))
            .order(transactions::seq.asc())
            .select(TransactionRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }

    fn append_bet(&mut self, bet: &BetRecord) -> Result<()> {
        let row = NewBetRow::try_from(bet)?;
        diesel::insert_into(bets::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn bets_for_market(&mut self, market_id: &MarketId) -> Result<Vec<BetRecord>> {
        let rows = bets::table
            .filter(bets::market_id.eq(market_id.as_str()))
            .order(bets::seq.asc())
            .select(BetRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }

    fn append_receipt(&mut self, receipt: &MonitoringReceipt) -> Result<()> {
        let row = NewReceiptRow::try_from(receipt)?;
        diesel::insert_into(monitoring_receipts::table)
            .values(&row)
            .execute(self.conn)?;
        Ok(())
    }

    fn receipt(&mut self, id: &ReceiptId) -> Result<Option<MonitoringReceipt>> {
        monitoring_receipts::table
            .filter(monitoring_receipts::id.eq(id.as_str()))
            .select(ReceiptRow::as_select())
            .first(self.conn)
            .optional()?
            .map(MonitoringReceipt::try_from)
            .transpose()
    }

    fn latest_receipt_at_or_before(
        &mut self,
        model_id: &ModelId,
        at: DateTime<Utc>,
    ) -> Result<Option<MonitoringReceipt>> {
        monitoring_receipts::table
            .filter(monitoring_receipts::model_id.eq(model_id.as_str()))
            .filter(monitoring_receipts::recorded_at.le(encode_time(at)))
            .order((
                monitoring_receipts::recorded_at.desc(),
                monitoring_receipts::seq.desc(),
            ))
            .select(ReceiptRow::as_select())
            .first(self.conn)
            .optional()?
            .map(MonitoringReceipt::try_from)
            .transpose()
    }

    fn receipts_for_model(&mut self, model_id: &ModelId) -> Result<Vec<MonitoringReceipt>> {
        let rows = monitoring_receipts::table
            .filter(monitoring_receipts::model_id.eq(model_id.as_str()))
            .order(monitoring_receipts::seq.asc())
            .select(ReceiptRow::as_select())
            .load(self.conn)?;
        convert(rows)
    }
}
