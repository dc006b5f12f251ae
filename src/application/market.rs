//! Market lifecycle and bet placement.

use tracing::{info, warn};

use super::engine::Engine;
use crate::domain::{
    BetRecord, EntryId, Market, MarketId, MarketStatus, NewMarket, Odds, OddsValue, Position,
    Side, Transaction, TransactionKind, UserBalance, UserId,
};
use crate::error::{Entity, Error, Result};
use crate::port::{AttentionEvent, AttentionSubject, Event, LedgerStore, MarketFilter};

/// Result of an accepted bet.
#[derive(Debug, Clone)]
pub struct BetReceipt {
    pub market: Market,
    pub position: Position,
    pub balance: UserBalance,
    /// Odds quoted to the bettor, before the bet moved the pool.
    pub odds: Odds,
    /// Odds the bet was recorded at.
    pub entry_odds: OddsValue,
}

impl<S: LedgerStore> Engine<S> {
    /// Open a new market on a model.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown model, `Validation` for an inactive model,
    /// an empty title, a bad threshold, or a deadline too close to now.
    pub async fn create_market(&self, input: NewMarket) -> Result<Market> {
        if input.title.trim().is_empty() {
            return Err(Error::Validation("market title must not be empty".into()));
        }
        let now = self.now();
        let earliest = now + self.settings.min_deadline_lead;
        if input.resolution_deadline <= now || input.resolution_deadline < earliest {
            return Err(Error::Validation(format!(
                "resolution deadline {} must be after {}",
                input.resolution_deadline, earliest
            )));
        }

        let market = self.atomically(|tx| {
            let model = tx
                .model(&input.model_id)?
                .ok_or_else(|| Error::not_found(Entity::Model, &input.model_id))?;
            if !model.is_active {
                return Err(Error::Validation(format!(
                    "model {} is not active",
                    model.id
                )));
            }
            let threshold = input
                .drift_threshold_percent
                .unwrap_or(model.drift_threshold_percent);
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(Error::Validation(
                    "drift threshold must be a positive percentage".into(),
                ));
            }

            let market = Market {
                id: MarketId::generate(),
                model_id: model.id,
                creator_id: input.creator_id.clone(),
                title: input.title.clone(),
                drift_threshold_percent: threshold,
                resolution_deadline: input.resolution_deadline,
                status: MarketStatus::Active,
                total_stake_no_drift: 0,
                total_stake_drift: 0,
                participants: 0,
                outcome: None,
                final_drift_percentage: None,
                resolution_receipt: None,
                resolved_at: None,
                settlement: None,
                attention: None,
                created_at: now,
            };
            tx.insert_market(&market)?;
            Ok(market)
        })?;

        info!(
            market_id = %market.id,
            model_id = %market.model_id,
            deadline = %market.resolution_deadline,
            threshold = market.drift_threshold_percent,
            "Market created"
        );
        Ok(market)
    }

    pub async fn market(&self, market_id: &MarketId) -> Result<Market> {
        self.atomically(|tx| tx.market(market_id))?
            .ok_or_else(|| Error::not_found(Entity::Market, market_id))
    }

    pub async fn list_markets(&self, filter: &MarketFilter) -> Result<Vec<Market>> {
        self.atomically(|tx| tx.markets(filter))
    }

    /// Active markets whose deadline has passed.
    pub async fn markets_due(&self) -> Result<Vec<Market>> {
        let filter = MarketFilter::due(self.now());
        self.atomically(|tx| tx.markets(&filter))
    }

    /// Quote current odds for a market.
    pub async fn get_odds(&self, market_id: &MarketId) -> Result<Odds> {
        let market = self.market(market_id).await?;
        Ok(self.settings.pricing.compute_odds(&market))
    }

    pub async fn positions(&self, market_id: &MarketId) -> Result<Vec<Position>> {
        self.atomically(|tx| tx.positions_for_market(market_id))
    }

    pub async fn bet_history(&self, market_id: &MarketId) -> Result<Vec<BetRecord>> {
        self.atomically(|tx| tx.bets_for_market(market_id))
    }

    /// Stake `amount` on `side` of a market.
    ///
    /// The pool update, the position update, the balance lock, and both log
    /// entries are written in one unit of work.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero amount, `NotFound` for an unknown market,
    /// `MarketClosed` after the deadline or resolution, and
    /// `InsufficientBalance` when available funds do not cover the stake.
    pub async fn place_bet(
        &self,
        market_id: &MarketId,
        user_id: &UserId,
        side: Side,
        amount: u64,
    ) -> Result<BetReceipt> {
        if amount == 0 {
            return Err(Error::Validation("bet amount must be positive".into()));
        }
        let now = self.now();
        let pricing = self.settings.pricing;

        let receipt = self.atomically(|tx| {
            let market = tx
                .market(market_id)?
                .ok_or_else(|| Error::not_found(Entity::Market, market_id))?;
            let existing = tx.position(market_id, user_id)?;
            let applied =
                pricing.apply_bet(&market, existing.as_ref(), user_id, side, amount, now)?;

            let mut balance = tx
                .balance(user_id)?
                .unwrap_or_else(|| UserBalance::empty(user_id.clone(), now));
            balance.lock(amount)?;
            balance.updated_at = now;

            tx.save_market(&applied.market)?;
            tx.save_position(&applied.position)?;
            tx.save_balance(&balance)?;
            tx.append_transaction(&Transaction::new(
                user_id.clone(),
                TransactionKind::Bet,
                amount,
                0,
                Some(market_id.clone()),
                applied.position.id.as_str(),
                now,
            ))?;
            tx.append_bet(&BetRecord {
                id: EntryId::generate(),
                position_id: applied.position.id.clone(),
                market_id: market_id.clone(),
                user_id: user_id.clone(),
                side,
                amount,
                odds: applied.entry_odds,
                placed_at: now,
            })?;

            Ok(BetReceipt {
                market: applied.market,
                position: applied.position,
                balance,
                odds: applied.odds_before,
                entry_odds: applied.entry_odds,
            })
        })?;

        info!(
            market_id = %market_id,
            user = %user_id,
            side = %side,
            amount,
            odds = %receipt.entry_odds,
            "Bet placed"
        );
        Ok(receipt)
    }

    /// Flag a market for manual attention and notify operators.
    pub async fn flag_market_attention(&self, market_id: &MarketId, reason: &str) -> Result<()> {
        self.atomically(|tx| {
            let mut market = tx
                .market(market_id)?
                .ok_or_else(|| Error::not_found(Entity::Market, market_id))?;
            market.attention = Some(reason.to_string());
            tx.save_market(&market)
        })?;
        warn!(market_id = %market_id, reason = %reason, "Market flagged for attention");
        self.notify(Event::AttentionRequired(AttentionEvent {
            subject: AttentionSubject::Market(market_id.clone()),
            reason: reason.to_string(),
        }));
        Ok(())
    }
}
