//! Position and bet history types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{EntryId, MarketId, PositionId, UserId};
use super::market::Side;
use super::money::{Amount, OddsValue};

/// A user's aggregated stake in one market.
///
/// Created on the first bet, updated by later bets from the same user,
/// and terminal once claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub market_id: MarketId,
    pub user_id: UserId,
    pub stake_no_drift: Amount,
    pub stake_drift: Amount,
    /// Stake-weighted entry odds; display only.
    pub avg_odds_no_drift: Option<OddsValue>,
    pub avg_odds_drift: Option<OddsValue>,
    /// `None` until settlement writes it.
    pub payout_amount: Option<Amount>,
    pub is_claimed: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Create an empty position for a user.
    #[must_use]
    pub fn open(market_id: MarketId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: PositionId::generate(),
            market_id,
            user_id,
            stake_no_drift: 0,
            stake_drift: 0,
            avg_odds_no_drift: None,
            avg_odds_drift: None,
            payout_amount: None,
            is_claimed: false,
            claimed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn stake(&self, side: Side) -> Amount {
        match side {
            Side::NoDrift => self.stake_no_drift,
            Side::Drift => self.stake_drift,
        }
    }

    #[must_use]
    pub const fn avg_odds(&self, side: Side) -> Option<OddsValue> {
        match side {
            Side::NoDrift => self.avg_odds_no_drift,
            Side::Drift => self.avg_odds_drift,
        }
    }

    /// Everything this position has locked in the market.
    #[must_use]
    pub const fn total_stake(&self) -> Amount {
        self.stake_no_drift + self.stake_drift
    }

    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.payout_amount.is_some()
    }

    /// Settled with a nonzero payout that has not been claimed.
    #[must_use]
    pub fn is_claimable(&self) -> bool {
        !self.is_claimed && self.payout_amount.is_some_and(|p| p > 0)
    }
}

/// Immutable record of one accepted bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: EntryId,
    pub position_id: PositionId,
    pub market_id: MarketId,
    pub user_id: UserId,
    pub side: Side,
    pub amount: Amount,
    /// Odds quoted before the bet was applied.
    pub odds: OddsValue,
    pub placed_at: DateTime<Utc>,
}
