//! Database model types for Diesel ORM and their domain conversions.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with nanosecond
//! precision so that text comparison orders them chronologically. Amounts
//! are stored as `BIGINT` and must fit in `i64`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{bets, markets, models, monitoring_receipts, positions, transactions, user_balances};
use crate::domain::{
    Amount, BetRecord, EntryId, Market, MarketId, Model, ModelId, MonitoringReceipt, Position,
    PositionId, ReceiptEvidence, ReceiptId, Transaction, UserBalance, UserId,
};
use crate::error::{Error, Result};

/// Encode a timestamp for storage.
pub fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Decode a stored timestamp.
pub fn decode_time(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| Error::Parse(format!("invalid timestamp '{raw}': {e}")))?
        .with_timezone(&Utc))
}

fn decode_time_opt(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(decode_time).transpose()
}

pub fn encode_amount(amount: Amount) -> Result<i64> {
    i64::try_from(amount)
        .map_err(|_| Error::Database(format!("amount {amount} exceeds storage range")))
}

fn decode_amount(raw: i64) -> Result<Amount> {
    Amount::try_from(raw).map_err(|_| Error::DataIntegrity(format!("negative amount {raw} in ledger")))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Parse(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::Parse(e.to_string()))
}

fn decode_decimal(raw: Option<String>) -> Result<Option<Decimal>> {
    raw.map(|s| {
        s.parse::<Decimal>()
            .map_err(|e| Error::Parse(format!("invalid decimal '{s}': {e}")))
    })
    .transpose()
}

/// Database row for a model.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = models)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ModelRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub monitoring_endpoint: String,
    pub auth: String,
    pub baseline_metrics: String,
    pub drift_threshold_percent: f64,
    pub monitoring_frequency_hours: i32,
    pub health_status: String,
    pub current_metrics: Option<String>,
    pub last_monitored_at: Option<String>,
    pub total_monitoring_cycles: i64,
    pub is_active: bool,
    pub attention: Option<String>,
    pub created_at: String,
}

impl TryFrom<&Model> for ModelRow {
    type Error = Error;

    fn try_from(model: &Model) -> Result<Self> {
        Ok(Self {
            id: model.id.to_string(),
            owner_id: model.owner_id.to_string(),
            name: model.name.clone(),
            monitoring_endpoint: model.monitoring_endpoint.clone(),
            auth: to_json(&model.auth)?,
            baseline_metrics: to_json(&model.baseline_metrics)?,
            drift_threshold_percent: model.drift_threshold_percent,
            monitoring_frequency_hours: i32::try_from(model.monitoring_frequency_hours)
                .map_err(|_| Error::Database("monitoring frequency out of range".into()))?,
            health_status: model.health_status.as_str().to_string(),
            current_metrics: model.current_metrics.as_ref().map(to_json).transpose()?,
            last_monitored_at: model.last_monitored_at.map(encode_time),
            total_monitoring_cycles: i64::try_from(model.total_monitoring_cycles)
                .map_err(|_| Error::Database("cycle counter out of range".into()))?,
            is_active: model.is_active,
            attention: model.attention.clone(),
            created_at: encode_time(model.created_at),
        })
    }
}

impl TryFrom<ModelRow> for Model {
    type Error = Error;

    fn try_from(row: ModelRow) -> Result<Self> {
        let current_metrics: Option<BTreeMap<String, f64>> =
            row.current_metrics.as_deref().map(from_json).transpose()?;
        Ok(Self {
            id: ModelId::from(row.id),
            owner_id: UserId::new(row.owner_id),
            name: row.name,
            monitoring_endpoint: row.monitoring_endpoint,
            auth: from_json(&row.auth)?,
            baseline_metrics: from_json(&row.baseline_metrics)?,
            drift_threshold_percent: row.drift_threshold_percent,
            monitoring_frequency_hours: u32::try_from(row.monitoring_frequency_hours)
                .map_err(|_| Error::DataIntegrity("negative monitoring frequency".into()))?,
            health_status: row.health_status.parse()?,
            current_metrics,
            last_monitored_at: decode_time_opt(row.last_monitored_at.as_deref())?,
            total_monitoring_cycles: u64::try_from(row.total_monitoring_cycles)
                .map_err(|_| Error::DataIntegrity("negative cycle counter".into()))?,
            is_active: row.is_active,
            attention: row.attention,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

/// Database row for a market.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketRow {
    pub id: String,
    pub model_id: String,
    pub creator_id: String,
    pub title: String,
    pub drift_threshold_percent: f64,
    pub resolution_deadline: String,
    pub status: String,
    pub total_stake_no_drift: i64,
    pub total_stake_drift: i64,
    pub participants: i32,
    pub outcome: Option<String>,
    pub final_drift_percentage: Option<f64>,
    pub resolution_receipt: Option<String>,
    pub resolved_at: Option<String>,
    pub settlement: Option<String>,
    pub attention: Option<String>,
    pub created_at: String,
}

impl TryFrom<&Market> for MarketRow {
    type Error = Error;

    fn try_from(market: &Market) -> Result<Self> {
        Ok(Self {
            id: market.id.to_string(),
            model_id: market.model_id.to_string(),
            creator_id: market.creator_id.to_string(),
            title: market.title.clone(),
            drift_threshold_percent: market.drift_threshold_percent,
            resolution_deadline: encode_time(market.resolution_deadline),
            status: market.status.as_str().to_string(),
            total_stake_no_drift: encode_amount(market.total_stake_no_drift)?,
            total_stake_drift: encode_amount(market.total_stake_drift)?,
            participants: i32::try_from(market.participants)
                .map_err(|_| Error::Database("participant count out of range".into()))?,
            outcome: market.outcome.map(|o| o.as_str().to_string()),
            final_drift_percentage: market.final_drift_percentage,
            resolution_receipt: market.resolution_receipt.as_ref().map(ToString::to_string),
            resolved_at: market.resolved_at.map(encode_time),
            settlement: market.settlement.as_ref().map(to_json).transpose()?,
            attention: market.attention.clone(),
            created_at: encode_time(market.created_at),
        })
    }
}

impl TryFrom<MarketRow> for Market {
    type Error = Error;

    fn try_from(row: MarketRow) -> Result<Self> {
        Ok(Self {
            id: MarketId::from(row.id),
            model_id: ModelId::from(row.model_id),
            creator_id: UserId::new(row.creator_id),
            title: row.title,
            drift_threshold_percent: row.drift_threshold_percent,
            resolution_deadline: decode_time(&row.resolution_deadline)?,
            status: row.status.parse()?,
            total_stake_no_drift: decode_amount(row.total_stake_no_drift)?,
            total_stake_drift: decode_amount(row.total_stake_drift)?,
            participants: u32::try_from(row.participants)
                .map_err(|_| Error::DataIntegrity("negative participant count".into()))?,
            outcome: row.outcome.as_deref().map(str::parse).transpose()?,
            final_drift_percentage: row.final_drift_percentage,
            resolution_receipt: row.resolution_receipt.map(ReceiptId::from),
            resolved_at: decode_time_opt(row.resolved_at.as_deref())?,
            settlement: row.settlement.as_deref().map(from_json).transpose()?,
            attention: row.attention,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

/// Database row for a position.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionRow {
    pub id: String,
    pub market_id: String,
    pub user_id: String,
    pub stake_no_drift: i64,
    pub stake_drift: i64,
    pub avg_odds_no_drift: Option<String>,
    pub avg_odds_drift: Option<String>,
    pub payout_amount: Option<i64>,
    pub is_claimed: bool,
    pub claimed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<&Position> for PositionRow {
    type Error = Error;

    fn try_from(position: &Position) -> Result<Self> {
        Ok(Self {
            id: position.id.to_string(),
            market_id: position.market_id.to_string(),
            user_id: position.user_id.to_string(),
            stake_no_drift: encode_amount(position.stake_no_drift)?,
            stake_drift: encode_amount(position.stake_drift)?,
            avg_odds_no_drift: position.avg_odds_no_drift.map(|d| d.to_string()),
            avg_odds_drift: position.avg_odds_drift.map(|d| d.to_string()),
            payout_amount: position.payout_amount.map(encode_amount).transpose()?,
            is_claimed: position.is_claimed,
            claimed_at: position.claimed_at.map(encode_time),
            created_at: encode_time(position.created_at),
            updated_at: encode_time(position.updated_at),
        })
    }
}

impl TryFrom<PositionRow> for Position {
    type Error = Error;

    fn try_from(row: PositionRow) -> Result<Self> {
        Ok(Self {
            id: PositionId::from(row.id),
            market_id: MarketId::from(row.market_id),
            user_id: UserId::new(row.user_id),
            stake_no_drift: decode_amount(row.stake_no_drift)?,
            stake_drift: decode_amount(row.stake_drift)?,
            avg_odds_no_drift: decode_decimal(row.avg_odds_no_drift)?,
            avg_odds_drift: decode_decimal(row.avg_odds_drift)?,
            payout_amount: row.payout_amount.map(decode_amount).transpose()?,
            is_claimed: row.is_claimed,
            claimed_at: decode_time_opt(row.claimed_at.as_deref())?,
            created_at: decode_time(&row.created_at)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

/// Database row for a user balance.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = user_balances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BalanceRow {
    pub user_id: String,
    pub available_balance: i64,
    pub locked_in_markets: i64,
    pub claimable_winnings: i64,
    pub total_earned: i64,
    pub updated_at: String,
}

impl TryFrom<&UserBalance> for BalanceRow {
    type Error = Error;

    fn try_from(balance: &UserBalance) -> Result<Self> {
        Ok(Self {
            user_id: balance.user_id.to_string(),
            available_balance: encode_amount(balance.available_balance)?,
            locked_in_markets: encode_amount(balance.locked_in_markets)?,
            claimable_winnings: encode_amount(balance.claimable_winnings)?,
            total_earned: encode_amount(balance.total_earned)?,
            updated_at: encode_time(balance.updated_at),
        })
    }
}

impl TryFrom<BalanceRow> for UserBalance {
    type Error = Error;

    fn try_from(row: BalanceRow) -> Result<Self> {
        Ok(Self {
            user_id: UserId::new(row.user_id),
            available_balance: decode_amount(row.available_balance)?,
            locked_in_markets: decode_amount(row.locked_in_markets)?,
            claimable_winnings: decode_amount(row.claimable_winnings)?,
            total_earned: decode_amount(row.total_earned)?,
            updated_at: decode_time(&row.updated_at)?,
        })
    }
}

/// Database row for a transaction (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = transactions)]
pub struct NewTransactionRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub net_change: i64,
    pub market_id: Option<String>,
    pub reference: String,
    pub created_at: String,
}

impl TryFrom<&Transaction> for NewTransactionRow {
    type Error = Error;

    fn try_from(t: &Transaction) -> Result<Self> {
        Ok(Self {
            id: t.id.to_string(),
            user_id: t.user_id.to_string(),
            kind: t.kind.as_str().to_string(),
            amount: encode_amount(t.amount)?,
            net_change: t.net_change,
            market_id: t.market_id.as_ref().map(ToString::to_string),
            reference: t.reference.clone(),
            created_at: encode_time(t.created_at),
        })
    }
}

/// Database row for a transaction (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub seq: Option<i32>,
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub net_change: i64,
    pub market_id: Option<String>,
    pub reference: String,
    pub created_at: String,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = Error;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Self {
            id: EntryId::from(row.id),
            user_id: UserId::new(row.user_id),
            kind: row.kind.parse()?,
            amount: decode_amount(row.amount)?,
            net_change: row.net_change,
            market_id: row.market_id.map(MarketId::from),
            reference: row.reference,
            created_at: decode_time(&row.created_at)?,
        })
    }
}

/// Database row for a bet (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = bets)]
pub struct NewBetRow {
    pub id: String,
    pub position_id: String,
    pub market_id: String,
    pub user_id: String,
    pub side: String,
    pub amount: i64,
    pub odds: String,
    pub placed_at: String,
}

impl TryFrom<&BetRecord> for NewBetRow {
    type Error = Error;

    fn try_from(bet: &BetRecord) -> Result<Self> {
        Ok(Self {
            id: bet.id.to_string(),
            position_id: bet.position_id.to_string(),
            market_id: bet.market_id.to_string(),
            user_id: bet.user_id.to_string(),
            side: bet.side.as_str().to_string(),
            amount: encode_amount(bet.amount)?,
            odds: bet.odds.to_string(),
            placed_at: encode_time(bet.placed_at),
        })
    }
}

/// Database row for a bet (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = bets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BetRow {
    pub seq: Option<i32>,
    pub id: String,
    pub position_id: String,
    pub market_id: String,
    pub user_id: String,
    pub side: String,
    pub amount: i64,
    pub odds: String,
    pub placed_at: String,
}

impl TryFrom<BetRow> for BetRecord {
    type Error = Error;

    fn try_from(row: BetRow) -> Result<Self> {
        Ok(Self {
            id: EntryId::from(row.id),
            position_id: PositionId::from(row.position_id),
            market_id: MarketId::from(row.market_id),
            user_id: UserId::new(row.user_id),
            side: row.side.parse()?,
            amount: decode_amount(row.amount)?,
            odds: decode_decimal(Some(row.odds))?.unwrap_or_default(),
            placed_at: decode_time(&row.placed_at)?,
        })
    }
}

/// Database row for a monitoring receipt (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = monitoring_receipts)]
pub struct NewReceiptRow {
    pub id: String,
    pub model_id: String,
    pub metrics: String,
    pub drift_percentage: f64,
    pub drift_detected: bool,
    pub threshold_percent: f64,
    pub comparable_metrics: i32,
    pub low_confidence: bool,
    pub data_quality: Option<String>,
    pub feature_drift: Option<String>,
    pub recorded_at: String,
    pub content_hash: String,
    pub evidence_url: Option<String>,
    pub evidence_proof: Option<String>,
    pub evidence_mirrored: bool,
}

impl TryFrom<&MonitoringReceipt> for NewReceiptRow {
    type Error = Error;

    fn try_from(r: &MonitoringReceipt) -> Result<Self> {
        Ok(Self {
            id: r.id.to_string(),
            model_id: r.model_id.to_string(),
            metrics: to_json(&r.metrics)?,
            drift_percentage: r.drift_percentage,
            drift_detected: r.drift_detected,
            threshold_percent: r.threshold_percent,
            comparable_metrics: i32::try_from(r.comparable_metrics)
                .map_err(|_| Error::Database("metric count out of range".into()))?,
            low_confidence: r.low_confidence,
            data_quality: r.data_quality.as_ref().map(to_json).transpose()?,
            feature_drift: r.feature_drift.as_ref().map(to_json).transpose()?,
            recorded_at: encode_time(r.recorded_at),
            content_hash: r.content_hash.clone(),
            evidence_url: r.evidence.as_ref().map(|e| e.url.clone()),
            evidence_proof: r.evidence.as_ref().and_then(|e| e.proof.clone()),
            evidence_mirrored: r.evidence.as_ref().is_some_and(|e| e.mirrored),
        })
    }
}

/// Database row for a monitoring receipt (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = monitoring_receipts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReceiptRow {
    pub seq: Option<i32>,
    pub id: String,
    pub model_id: String,
    pub metrics: String,
    pub drift_percentage: f64,
    pub drift_detected: bool,
    pub threshold_percent: f64,
    pub comparable_metrics: i32,
    pub low_confidence: bool,
    pub data_quality: Option<String>,
    pub feature_drift: Option<String>,
    pub recorded_at: String,
    pub content_hash: String,
    pub evidence_url: Option<String>,
    pub evidence_proof: Option<String>,
    pub evidence_mirrored: bool,
}

impl TryFrom<ReceiptRow> for MonitoringReceipt {
    type Error = Error;

    fn try_from(row: ReceiptRow) -> Result<Self> {
        let evidence = row.evidence_url.map(|url| ReceiptEvidence {
            url,
            proof: row.evidence_proof,
            mirrored: row.evidence_mirrored,
        });
        Ok(Self {
            id: ReceiptId::from(row.id),
            model_id: ModelId::from(row.model_id),
            metrics: from_json(&row.metrics)?,
            drift_percentage: row.drift_percentage,
            drift_detected: row.drift_detected,
            threshold_percent: row.threshold_percent,
            comparable_metrics: u32::try_from(row.comparable_metrics)
                .map_err(|_| Error::DataIntegrity("negative metric count".into()))?,
            low_confidence: row.low_confidence,
            data_quality: row.data_quality.as_deref().map(from_json).transpose()?,
            feature_drift: row.feature_drift.as_deref().map(from_json).transpose()?,
            recorded_at: decode_time(&row.recorded_at)?,
            content_hash: row.content_hash,
            evidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_times_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let late = early + chrono::Duration::nanoseconds(1);
        let (a, b) = (encode_time(early), encode_time(late));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(decode_time(&b).unwrap(), late);
    }

    #[test]
    fn negative_amounts_are_integrity_errors() {
        assert!(matches!(decode_amount(-1), Err(Error::DataIntegrity(_))));
        assert!(encode_amount(u64::MAX).is_err());
    }
}
