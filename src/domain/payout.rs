//! Settlement planning for a resolved market.
//!
//! Payouts use floor division; whatever the floors leave behind is reported
//! as a rounding remainder retained by the platform alongside the fee.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::id::{PositionId, UserId};
use super::market::{Market, Outcome};
use super::money::Amount;
use super::position::Position;
use crate::error::{Error, Result};

/// Settlement of one position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub position_id: PositionId,
    pub user_id: UserId,
    /// Stake released from the user's locked funds.
    pub released: Amount,
    /// Credited to claimable winnings.
    pub payout: Amount,
}

/// Full settlement of a market's pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutPlan {
    pub outcome: Outcome,
    pub total_pool: Amount,
    pub platform_fee: Amount,
    /// Pool available to winners after the fee.
    pub payout_pool: Amount,
    pub winning_stake: Amount,
    pub allocations: Vec<Allocation>,
    pub total_paid: Amount,
    pub rounding_remainder: Amount,
}

impl PayoutPlan {
    /// Allocations with a nonzero payout.
    pub fn winners(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(|a| a.payout > 0)
    }
}

/// Compute payouts for every position of a resolved market.
///
/// A decided outcome pays `floor(stake_on_winner / winning_stake * payout_pool)`
/// and only releases the lock for losers. An invalid outcome refunds each
/// position's full stake with no fee.
///
/// # Errors
///
/// `DataIntegrity` if the positions do not add up to the market's pool.
pub fn plan_payouts(
    market: &Market,
    outcome: Outcome,
    positions: &[Position],
    fee_rate: Decimal,
) -> Result<PayoutPlan> {
    let total_pool = market.total_pool();
    let staked_no_drift: u128 = positions.iter().map(|p| u128::from(p.stake_no_drift)).sum();
    let staked_drift: u128 = positions.iter().map(|p| u128::from(p.stake_drift)).sum();
    if staked_no_drift != u128::from(market.total_stake_no_drift)
        || staked_drift != u128::from(market.total_stake_drift)
    {
        return Err(Error::DataIntegrity(format!(
            "market {} pool ({}/{}) does not match its positions ({}/{})",
            market.id,
            market.total_stake_no_drift,
            market.total_stake_drift,
            staked_no_drift,
            staked_drift
        )));
    }

    let Some(winning_side) = outcome.winning_side() else {
        let allocations: Vec<Allocation> = positions
            .iter()
            .filter(|p| p.total_stake() > 0)
            .map(|p| Allocation {
                position_id: p.id.clone(),
                user_id: p.user_id.clone(),
                released: p.total_stake(),
                payout: p.total_stake(),
            })
            .collect();
        return Ok(PayoutPlan {
            outcome,
            total_pool,
            platform_fee: 0,
            payout_pool: total_pool,
            winning_stake: total_pool,
            allocations,
            total_paid: total_pool,
            rounding_remainder: 0,
        });
    };

    let platform_fee = fee_amount(total_pool, fee_rate)?;
    let payout_pool = total_pool - platform_fee;
    let winning_stake = market.stake(winning_side);

    let mut total_paid: Amount = 0;
    let mut allocations = Vec::with_capacity(positions.len());
    for position in positions.iter().filter(|p| p.total_stake() > 0) {
        let stake = position.stake(winning_side);
        let payout = if stake == 0 || winning_stake == 0 {
            0
        } else {
            share(stake, winning_stake, payout_pool)?
        };
        total_paid += payout;
        allocations.push(Allocation {
            position_id: position.id.clone(),
            user_id: position.user_id.clone(),
            released: position.total_stake(),
            payout,
        });
    }

    let rounding_remainder = payout_pool.checked_sub(total_paid).ok_or_else(|| {
        Error::DataIntegrity(format!(
            "market {} payouts {total_paid} exceed payout pool {payout_pool}",
            market.id
        ))
    })?;

    Ok(PayoutPlan {
        outcome,
        total_pool,
        platform_fee,
        payout_pool,
        winning_stake,
        allocations,
        total_paid,
        rounding_remainder,
    })
}

/// `floor(total_pool * fee_rate)`.
fn fee_amount(total_pool: Amount, fee_rate: Decimal) -> Result<Amount> {
    if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
        return Err(Error::Validation(format!(
            "fee rate {fee_rate} must be in [0, 1)"
        )));
    }
    Decimal::from(total_pool)
        .checked_mul(fee_rate)
        .and_then(|fee| fee.floor().to_u64())
        .ok_or_else(|| Error::Validation(format!("fee on pool {total_pool} out of range")))
}

/// `floor(stake / winning_stake * payout_pool)` in exact integer arithmetic.
fn share(stake: Amount, winning_stake: Amount, payout_pool: Amount) -> Result<Amount> {
    let scaled = u128::from(stake) * u128::from(payout_pool) / u128::from(winning_stake);
    Amount::try_from(scaled)
        .map_err(|_| Error::DataIntegrity(format!("payout {scaled} exceeds amount range")))
}
