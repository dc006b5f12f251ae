//! Market pricing configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::PoolPricing;
use crate::error::{ConfigError, Result};

/// Pool pricing and market creation rules.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Platform fee taken from decided pools, in [0, 1).
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Odds quoted on both sides of an empty pool.
    #[serde(default = "default_odds")]
    pub default_odds: Decimal,
    /// Minimum seconds between market creation and its deadline.
    #[serde(default)]
    pub min_deadline_lead_secs: u64,
}

fn default_fee_rate() -> Decimal {
    dec!(0.05)
}

fn default_odds() -> Decimal {
    dec!(2.0)
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
            default_odds: default_odds(),
            min_deadline_lead_secs: 0,
        }
    }
}

impl MarketConfig {
    #[must_use]
    pub const fn pricing(&self) -> PoolPricing {
        PoolPricing::new(self.fee_rate, self.default_odds)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "market.fee_rate",
                reason: "must be in [0, 1)".to_string(),
            }
            .into());
        }
        if self.default_odds <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "market.default_odds",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if i64::try_from(self.min_deadline_lead_secs).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "market.min_deadline_lead_secs",
                reason: "out of range".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
