//! Market-related domain types.
//!
//! - [`Market`] - A binary drift market with a pooled stake per side
//! - [`Side`] - The side a bettor stakes on
//! - [`Outcome`] - How a market resolved
//! - [`SettlementSummary`] - Accounting of a settled pool

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MarketId, ModelId, ReceiptId, UserId};
use super::money::Amount;
use crate::error::Error;

/// Side of a binary drift market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    NoDrift,
    Drift,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoDrift => "no_drift",
            Self::Drift => "drift",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_drift" => Ok(Self::NoDrift),
            "drift" => Ok(Self::Drift),
            other => Err(Error::Validation(format!("unknown side '{other}'"))),
        }
    }
}

/// Resolved outcome of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoDrift,
    Drift,
    /// No usable evidence; every position is refunded.
    Invalid,
}

impl Outcome {
    /// The side that wins, if any.
    #[must_use]
    pub const fn winning_side(self) -> Option<Side> {
        match self {
            Self::NoDrift => Some(Side::NoDrift),
            Self::Drift => Some(Side::Drift),
            Self::Invalid => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoDrift => "no_drift",
            Self::Drift => "drift",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_drift" => Ok(Self::NoDrift),
            "drift" => Ok(Self::Drift),
            "invalid" => Ok(Self::Invalid),
            other => Err(Error::Parse(format!("unknown outcome '{other}'"))),
        }
    }
}

/// Lifecycle status of a market. `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Active,
    Resolved,
}

impl MarketStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            other => Err(Error::Parse(format!("unknown market status '{other}'"))),
        }
    }
}

/// Accounting of a settled pool.
///
/// For a decided outcome `total_paid + platform_fee + rounding_remainder`
/// equals the pool. For an invalid outcome the whole pool is refunded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub platform_fee: Amount,
    /// Payout-pool units not distributed after flooring; kept by the platform.
    pub rounding_remainder: Amount,
    pub total_paid: Amount,
    pub winners: u32,
    pub settled_at: DateTime<Utc>,
}

impl SettlementSummary {
    /// Everything retained by the platform.
    #[must_use]
    pub const fn platform_take(&self) -> Amount {
        self.platform_fee + self.rounding_remainder
    }
}

/// A binary drift market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub model_id: ModelId,
    pub creator_id: UserId,
    pub title: String,
    pub drift_threshold_percent: f64,
    pub resolution_deadline: DateTime<Utc>,
    pub status: MarketStatus,
    pub total_stake_no_drift: Amount,
    pub total_stake_drift: Amount,
    pub participants: u32,
    pub outcome: Option<Outcome>,
    pub final_drift_percentage: Option<f64>,
    pub resolution_receipt: Option<ReceiptId>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Present once payouts have been written; the settlement-done marker.
    pub settlement: Option<SettlementSummary>,
    pub attention: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Market {
    /// Sum of both sides of the pool.
    #[must_use]
    pub const fn total_pool(&self) -> Amount {
        self.total_stake_no_drift + self.total_stake_drift
    }

    /// Pool stake on one side.
    #[must_use]
    pub const fn stake(&self, side: Side) -> Amount {
        match side {
            Side::NoDrift => self.total_stake_no_drift,
            Side::Drift => self.total_stake_drift,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }

    /// Whether the deadline has passed at `now`.
    #[must_use]
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.resolution_deadline
    }

    /// Active and past its deadline.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.deadline_passed(now)
    }

    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.settlement.is_some()
    }
}

/// Input for creating a market.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub model_id: ModelId,
    pub creator_id: UserId,
    pub title: String,
    pub resolution_deadline: DateTime<Utc>,
    /// Defaults to the model's threshold when absent.
    pub drift_threshold_percent: Option<f64>,
}
