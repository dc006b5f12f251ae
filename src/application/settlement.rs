//! Payout distribution and claims.
//!
//! Settlement writes every position's payout, every balance move, and the
//! market's settlement marker in one unit of work, so a reader never sees a
//! resolved market with only some positions paid.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::engine::Engine;
use crate::domain::{
    plan_payouts, signed, Amount, Market, MarketId, Outcome, PayoutPlan, SettlementSummary,
    Transaction, TransactionKind, UserBalance, UserId,
};
use crate::error::{Entity, Error, Result};
use crate::port::{Event, LedgerStore, LedgerTx, WinningsEvent};

/// Result of a successful claim.
#[derive(Debug, Clone)]
pub struct ClaimReceipt {
    pub market_id: MarketId,
    pub user_id: UserId,
    pub payout: Amount,
    pub balance: UserBalance,
}

/// Result of a settlement request.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// Payouts were written by this call.
    Distributed { market: Market, plan: PayoutPlan },
    /// The market had already been settled; nothing changed.
    AlreadySettled { market: Market },
}

impl Settlement {
    #[must_use]
    pub const fn market(&self) -> &Market {
        match self {
            Self::Distributed { market, .. } | Self::AlreadySettled { market } => market,
        }
    }
}

impl<S: LedgerStore> Engine<S> {
    /// Settle a resolved market. A no-op once the market is settled.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown market and `NotResolved` while it is active.
    pub async fn distribute_payouts(&self, market_id: &MarketId) -> Result<Settlement> {
        let now = self.now();
        let fee_rate = self.fee_rate();
        let settlement = self.atomically(|tx| {
            let market = tx
                .market(market_id)?
                .ok_or_else(|| Error::not_found(Entity::Market, market_id))?;
            if market.is_active() {
                return Err(Error::NotResolved {
                    market_id: market_id.to_string(),
                });
            }
            if market.is_settled() {
                return Ok(Settlement::AlreadySettled { market });
            }
            let (market, plan) = settle_in(tx, market, fee_rate, now)?;
            Ok(Settlement::Distributed { market, plan })
        })?;

        match &settlement {
            Settlement::Distributed { market, plan } => {
                log_settlement(market, plan);
                self.notify_winners(market, plan);
            }
            Settlement::AlreadySettled { .. } => {
                debug!(market_id = %market_id, "Market already settled");
            }
        }
        Ok(settlement)
    }

    /// Move a settled payout into the user's available balance.
    ///
    /// # Errors
    ///
    /// `AlreadyClaimed` on a repeat claim, `NothingToClaim` when the market
    /// is unresolved or the payout is zero, and `NotFound` when there is no
    /// position.
    pub async fn claim(&self, user_id: &UserId, market_id: &MarketId) -> Result<ClaimReceipt> {
        let now = self.now();
        let receipt = self.atomically(|tx| {
            let market = tx
                .market(market_id)?
                .ok_or_else(|| Error::not_found(Entity::Market, market_id))?;
            let position = tx.position(market_id, user_id)?.ok_or_else(|| {
                Error::not_found(Entity::Position, format!("{market_id}/{user_id}"))
            })?;
            if market.is_active() {
                return Err(Error::NothingToClaim {
                    market_id: market_id.to_string(),
                    reason: "market is not resolved".into(),
                });
            }
            if position.is_claimed {
                return Err(Error::AlreadyClaimed {
                    market_id: market_id.to_string(),
                });
            }
            let payout = match position.payout_amount {
                None => {
                    return Err(Error::NothingToClaim {
                        market_id: market_id.to_string(),
                        reason: "payouts have not been distributed".into(),
                    })
                }
                Some(0) => {
                    return Err(Error::NothingToClaim {
                        market_id: market_id.to_string(),
                        reason: "position has no payout".into(),
                    })
                }
                Some(payout) => payout,
            };

            if !tx.claim_position_if_unclaimed(market_id, user_id, now)? {
                return Err(Error::AlreadyClaimed {
                    market_id: market_id.to_string(),
                });
            }

            let mut balance = tx
                .balance(user_id)?
                .ok_or_else(|| Error::not_found(Entity::Balance, user_id))?;
            balance.claim(payout)?;
            balance.updated_at = now;
            tx.save_balance(&balance)?;
            tx.append_transaction(&Transaction::new(
                user_id.clone(),
                TransactionKind::Claim,
                payout,
                0,
                Some(market_id.clone()),
                position.id.as_str(),
                now,
            ))?;

            Ok(ClaimReceipt {
                market_id: market_id.clone(),
                user_id: user_id.clone(),
                payout,
                balance,
            })
        })?;

        info!(
            market_id = %market_id,
            user = %user_id,
            payout = receipt.payout,
            "Winnings claimed"
        );
        Ok(receipt)
    }

    pub(crate) fn notify_winners(&self, market: &Market, plan: &PayoutPlan) {
        for allocation in plan.winners() {
            self.notify(Event::WinningsAvailable(WinningsEvent {
                user_id: allocation.user_id.clone(),
                market_id: market.id.clone(),
                payout: allocation.payout,
            }));
        }
    }
}

/// Write a payout plan for a resolved, unsettled market inside `tx`.
pub(crate) fn settle_in(
    tx: &mut dyn LedgerTx,
    mut market: Market,
    fee_rate: rust_decimal::Decimal,
    now: DateTime<Utc>,
) -> Result<(Market, PayoutPlan)> {
    let outcome = market.outcome.ok_or_else(|| {
        Error::DataIntegrity(format!("resolved market {} has no outcome", market.id))
    })?;
    let positions = tx.positions_for_market(&market.id)?;
    let plan = plan_payouts(&market, outcome, &positions, fee_rate)?;

    for allocation in &plan.allocations {
        let Some(mut position) = positions
            .iter()
            .find(|p| p.id == allocation.position_id)
            .cloned()
        else {
            continue;
        };
        position.payout_amount = Some(allocation.payout);
        position.updated_at = now;
        tx.save_position(&position)?;

        let mut balance = tx.balance(&allocation.user_id)?.ok_or_else(|| {
            Error::DataIntegrity(format!(
                "user {} holds a position but has no balance",
                allocation.user_id
            ))
        })?;
        balance.settle(allocation.released, allocation.payout)?;
        balance.updated_at = now;
        tx.save_balance(&balance)?;

        let (kind, amount) = match (outcome, allocation.payout) {
            (Outcome::Invalid, payout) => (TransactionKind::Refund, payout),
            (_, 0) => (TransactionKind::LockRelease, allocation.released),
            (_, payout) => (TransactionKind::Payout, payout),
        };
        tx.append_transaction(&Transaction::new(
            allocation.user_id.clone(),
            kind,
            amount,
            signed(allocation.payout)? - signed(allocation.released)?,
            Some(market.id.clone()),
            position.id.as_str(),
            now,
        ))?;
    }

    market.settlement = Some(SettlementSummary {
        platform_fee: plan.platform_fee,
        rounding_remainder: plan.rounding_remainder,
        total_paid: plan.total_paid,
        winners: u32::try_from(plan.winners().count()).unwrap_or(u32::MAX),
        settled_at: now,
    });
    tx.save_market(&market)?;
    Ok((market, plan))
}

pub(crate) fn log_settlement(market: &Market, plan: &PayoutPlan) {
    info!(
        market_id = %market.id,
        outcome = %plan.outcome,
        pool = plan.total_pool,
        fee = plan.platform_fee,
        remainder = plan.rounding_remainder,
        paid = plan.total_paid,
        positions = plan.allocations.len(),
        "Payouts distributed"
    );
}
