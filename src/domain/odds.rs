//! Pool pricing: quoted odds and bet application.
//!
//! Odds are the parimutuel multiplier `total / stake[side]`, scaled by
//! `1 - fee_rate`. A side with no stake in a non-empty pool has no quote:
//! its multiplier is unbounded, and it only becomes finite once stake lands.
//! Both functions here are pure; persistence happens in the caller's unit
//! of work.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::id::UserId;
use super::market::{Market, Side};
use super::money::{Amount, OddsValue};
use super::position::Position;
use crate::error::{Error, Result};

/// Quoted odds for both sides of a market. `None` means no quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Odds {
    pub no_drift: Option<OddsValue>,
    pub drift: Option<OddsValue>,
    pub total_pool: Amount,
}

impl Odds {
    #[must_use]
    pub const fn for_side(&self, side: Side) -> Option<OddsValue> {
        match side {
            Side::NoDrift => self.no_drift,
            Side::Drift => self.drift,
        }
    }
}

/// Result of applying one bet to a market and position.
#[derive(Debug, Clone)]
pub struct BetApplication {
    pub market: Market,
    pub position: Position,
    /// Odds quoted before the bet.
    pub odds_before: Odds,
    /// Odds the bet is recorded at: the pre-bet quote, or the first finite
    /// quote when the side had no stake.
    pub entry_odds: OddsValue,
    /// True when the position was created by this bet.
    pub opened_position: bool,
}

/// Pricing parameters for market pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPricing {
    pub fee_rate: Decimal,
    /// Quoted for both sides of an empty pool.
    pub default_odds: Decimal,
}

impl Default for PoolPricing {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.05),
            default_odds: dec!(2.0),
        }
    }
}

impl PoolPricing {
    /// Create pricing with the given fee rate and empty-pool odds.
    #[must_use]
    pub const fn new(fee_rate: Decimal, default_odds: Decimal) -> Self {
        Self {
            fee_rate,
            default_odds,
        }
    }

    /// Quote odds from the market's current stakes.
    #[must_use]
    pub fn compute_odds(&self, market: &Market) -> Odds {
        let total_pool = market.total_pool();
        if total_pool == 0 {
            return Odds {
                no_drift: Some(self.default_odds),
                drift: Some(self.default_odds),
                total_pool,
            };
        }

        let multiplier = Decimal::ONE - self.fee_rate;
        let quote = |stake: Amount| {
            (stake > 0).then(|| Decimal::from(total_pool) / Decimal::from(stake) * multiplier)
        };

        Odds {
            no_drift: quote(market.total_stake_no_drift),
            drift: quote(market.total_stake_drift),
            total_pool,
        }
    }

    /// Apply a bet to a market and the user's existing position, if any.
    ///
    /// Neither input is mutated; the updated copies are returned.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero amount or an overflowing stake, and
    /// `MarketClosed` when the market is resolved or past its deadline.
    pub fn apply_bet(
        &self,
        market: &Market,
        position: Option<&Position>,
        user_id: &UserId,
        side: Side,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<BetApplication> {
        if amount == 0 {
            return Err(Error::Validation("bet amount must be positive".into()));
        }
        if !market.is_active() {
            return Err(Error::MarketClosed {
                market_id: market.id.to_string(),
                reason: format!("market is {}", market.status),
            });
        }
        if market.deadline_passed(now) {
            return Err(Error::MarketClosed {
                market_id: market.id.to_string(),
                reason: format!("deadline {} has passed", market.resolution_deadline),
            });
        }

        let odds_before = self.compute_odds(market);

        let mut market = market.clone();
        let pool_side = match side {
            Side::NoDrift => &mut market.total_stake_no_drift,
            Side::Drift => &mut market.total_stake_drift,
        };
        *pool_side = add_stake(*pool_side, amount)?;
        let entry_odds = odds_before
            .for_side(side)
            .or_else(|| self.compute_odds(&market).for_side(side))
            .unwrap_or(self.default_odds);

        let opened_position = position.is_none();
        let mut position = match position {
            Some(existing) => existing.clone(),
            None => {
                market.participants += 1;
                Position::open(market.id.clone(), user_id.clone(), now)
            }
        };

        let (stake, avg_odds) = match side {
            Side::NoDrift => (&mut position.stake_no_drift, &mut position.avg_odds_no_drift),
            Side::Drift => (&mut position.stake_drift, &mut position.avg_odds_drift),
        };
        let prior_stake = *stake;
        *stake = add_stake(prior_stake, amount)?;
        *avg_odds = Some(blend_odds(prior_stake, *avg_odds, amount, entry_odds)?);
        position.updated_at = now;

        Ok(BetApplication {
            market,
            position,
            odds_before,
            entry_odds,
            opened_position,
        })
    }
}

fn add_stake(current: Amount, amount: Amount) -> Result<Amount> {
    current
        .checked_add(amount)
        .ok_or_else(|| Error::Validation(format!("stake overflow adding {amount}")))
}

/// Stake-weighted mean of the prior average and the newly quoted odds.
fn blend_odds(
    prior_stake: Amount,
    prior_avg: Option<OddsValue>,
    amount: Amount,
    quoted: OddsValue,
) -> Result<OddsValue> {
    let Some(prior_avg) = prior_avg.filter(|_| prior_stake > 0) else {
        return Ok(quoted);
    };
    let overflow = || Error::Validation("average odds out of range".into());
    let weighted_prior = Decimal::from(prior_stake)
        .checked_mul(prior_avg)
        .ok_or_else(overflow)?;
    let weighted_new = Decimal::from(amount)
        .checked_mul(quoted)
        .ok_or_else(overflow)?;
    let total = Decimal::from(prior_stake) + Decimal::from(amount);
    weighted_prior
        .checked_add(weighted_new)
        .and_then(|sum| sum.checked_div(total))
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::{MarketId, ModelId};
    use crate::domain::market::MarketStatus;
    use chrono::Duration;

    fn market(no_drift: Amount, drift: Amount) -> Market {
        let now = Utc::now();
        Market {
            id: MarketId::from("m"),
            model_id: ModelId::from("model"),
            creator_id: UserId::new("creator"),
            title: "t".into(),
            drift_threshold_percent: 5.0,
            resolution_deadline: now + Duration::hours(1),
            status: MarketStatus::Active,
            total_stake_no_drift: no_drift,
            total_stake_drift: drift,
            participants: 0,
            outcome: None,
            final_drift_percentage: None,
            resolution_receipt: None,
            resolved_at: None,
            settlement: None,
            attention: None,
            created_at: now,
        }
    }

    #[test]
    fn empty_pool_quotes_default_odds() {
        let odds = PoolPricing::default().compute_odds(&market(0, 0));
        assert_eq!(odds.no_drift, Some(dec!(2.0)));
        assert_eq!(odds.drift, Some(dec!(2.0)));
        assert_eq!(odds.total_pool, 0);
    }

    #[test]
    fn odds_apply_fee_to_implied_multiplier() {
        let odds = PoolPricing::default().compute_odds(&market(5_000_000, 3_000_000));
        assert_eq!(odds.no_drift, Some(dec!(1.52)));
        assert_eq!(odds.total_pool, 8_000_000);
        // 8/3 * 0.95
        let drift = odds.drift.unwrap();
        assert!((drift - dec!(2.5333333333)).abs() < dec!(0.0000001));
    }

    #[test]
    fn empty_side_has_no_quote() {
        let odds = PoolPricing::default().compute_odds(&market(1_000, 0));
        assert_eq!(odds.drift, None);
        assert_eq!(odds.no_drift, Some(dec!(0.95)));
    }

    #[test]
    fn odds_move_monotonically_with_stake() {
        let pricing = PoolPricing::default();
        let empty = pricing.compute_odds(&market(1_000, 0));
        let mut previous = pricing.compute_odds(&market(1_000, 1));
        // Unbounded to finite is a strict fall.
        assert!(empty.drift.is_none() && previous.drift.is_some());
        assert!(previous.no_drift > empty.no_drift);
        for drift in [2, 10, 500, 1_000, 50_000, 1_000_000] {
            let odds = pricing.compute_odds(&market(1_000, drift));
            assert!(odds.drift < previous.drift, "drift odds must fall");
            assert!(odds.no_drift > previous.no_drift, "no-drift odds must rise");
            previous = odds;
        }
    }

    #[test]
    fn bet_on_empty_side_enters_at_first_finite_quote() {
        let pricing = PoolPricing::default();
        let applied = pricing
            .apply_bet(
                &market(1_000, 0),
                None,
                &UserId::new("u"),
                Side::Drift,
                1_000,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(applied.odds_before.drift, None);
        // 2000/1000 * 0.95
        assert_eq!(applied.entry_odds, dec!(1.9));
        assert_eq!(applied.position.avg_odds_drift, Some(dec!(1.9)));
    }

    #[test]
    fn first_bet_opens_position_and_counts_participant() {
        let pricing = PoolPricing::default();
        let m = market(0, 0);
        let user = UserId::new("alice");
        let applied = pricing
            .apply_bet(&m, None, &user, Side::Drift, 100, Utc::now())
            .unwrap();
        assert!(applied.opened_position);
        assert_eq!(applied.market.total_stake_drift, 100);
        assert_eq!(applied.market.participants, 1);
        assert_eq!(applied.position.stake_drift, 100);
        assert_eq!(applied.position.avg_odds_drift, Some(dec!(2.0)));
        assert_eq!(applied.position.avg_odds_no_drift, None);
        assert_eq!(m.total_stake_drift, 0, "input is not mutated");
    }

    #[test]
    fn second_bet_blends_average_with_pre_bet_odds() {
        let pricing = PoolPricing::default();
        let user = UserId::new("alice");
        let now = Utc::now();
        let first = pricing
            .apply_bet(&market(0, 0), None, &user, Side::Drift, 100, now)
            .unwrap();
        let mut m = first.market.clone();
        m.total_stake_no_drift = 300;
        // pre-bet odds for drift: 400/100 * 0.95 = 3.8
        let second = pricing
            .apply_bet(&m, Some(&first.position), &user, Side::Drift, 100, now)
            .unwrap();
        assert!(!second.opened_position);
        assert_eq!(second.market.participants, 1);
        assert_eq!(second.position.stake_drift, 200);
        assert_eq!(second.odds_before.drift, Some(dec!(3.8)));
        assert_eq!(second.entry_odds, dec!(3.8));
        assert_eq!(second.position.avg_odds_drift, Some(dec!(2.9)));
    }

    #[test]
    fn rejects_zero_amount() {
        let err = PoolPricing::default()
            .apply_bet(&market(0, 0), None, &UserId::new("u"), Side::Drift, 0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_after_deadline_and_when_resolved() {
        let pricing = PoolPricing::default();
        let m = market(0, 0);
        let err = pricing
            .apply_bet(
                &m,
                None,
                &UserId::new("u"),
                Side::Drift,
                1,
                m.resolution_deadline,
            )
            .unwrap_err();
        assert!(matches!(err, Error::MarketClosed { .. }));

        let mut resolved = market(0, 0);
        resolved.status = MarketStatus::Resolved;
        let err = pricing
            .apply_bet(&resolved, None, &UserId::new("u"), Side::NoDrift, 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::MarketClosed { .. }));
    }
}
