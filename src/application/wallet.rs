//! User balance use cases.

use tracing::info;

use super::engine::Engine;
use crate::domain::{
    signed, Amount, MarketId, Position, Transaction, TransactionKind, UserBalance, UserId,
};
use crate::error::{Entity, Error, Result};
use crate::port::LedgerStore;

impl<S: LedgerStore> Engine<S> {
    /// Credit `amount` to a user's available balance.
    pub async fn deposit(&self, user_id: &UserId, amount: Amount) -> Result<UserBalance> {
        if amount == 0 {
            return Err(Error::Validation("deposit amount must be positive".into()));
        }
        let net = signed(amount)?;
        let now = self.now();
        let balance = self.atomically(|tx| {
            let mut balance = tx
                .balance(user_id)?
                .unwrap_or_else(|| UserBalance::empty(user_id.clone(), now));
            balance.available_balance = balance
                .available_balance
                .checked_add(amount)
                .ok_or_else(|| Error::Validation("balance overflow".into()))?;
            balance.updated_at = now;
            tx.save_balance(&balance)?;
            tx.append_transaction(&Transaction::new(
                user_id.clone(),
                TransactionKind::Deposit,
                amount,
                net,
                None,
                user_id.as_str(),
                now,
            ))?;
            Ok(balance)
        })?;
        info!(user = %user_id, amount, "Deposit credited");
        Ok(balance)
    }

    /// Debit `amount` from a user's available balance.
    ///
    /// # Errors
    ///
    /// `InsufficientBalance` if available funds do not cover it.
    pub async fn withdraw(&self, user_id: &UserId, amount: Amount) -> Result<UserBalance> {
        if amount == 0 {
            return Err(Error::Validation("withdrawal amount must be positive".into()));
        }
        let net = signed(amount)?;
        let now = self.now();
        let balance = self.atomically(|tx| {
            let mut balance = tx
                .balance(user_id)?
                .unwrap_or_else(|| UserBalance::empty(user_id.clone(), now));
            if balance.available_balance < amount {
                return Err(Error::InsufficientBalance {
                    available: balance.available_balance,
                    required: amount,
                });
            }
            balance.available_balance -= amount;
            balance.updated_at = now;
            tx.save_balance(&balance)?;
            tx.append_transaction(&Transaction::new(
                user_id.clone(),
                TransactionKind::Withdrawal,
                amount,
                -net,
                None,
                user_id.as_str(),
                now,
            ))?;
            Ok(balance)
        })?;
        info!(user = %user_id, amount, "Withdrawal debited");
        Ok(balance)
    }

    /// Current balance; an unknown user has an empty one.
    pub async fn balance(&self, user_id: &UserId) -> Result<UserBalance> {
        let now = self.now();
        Ok(self
            .atomically(|tx| tx.balance(user_id))?
            .unwrap_or_else(|| UserBalance::empty(user_id.clone(), now)))
    }

    pub async fn position(&self, market_id: &MarketId, user_id: &UserId) -> Result<Position> {
        self.atomically(|tx| tx.position(market_id, user_id))?
            .ok_or_else(|| Error::not_found(Entity::Position, format!("{market_id}/{user_id}")))
    }

    pub async fn positions_for_user(&self, user_id: &UserId) -> Result<Vec<Position>> {
        self.atomically(|tx| tx.positions_for_user(user_id))
    }

    /// Settled positions with a payout the user has not claimed yet.
    pub async fn unclaimed_positions(&self, user_id: &UserId) -> Result<Vec<Position>> {
        let positions = self.positions_for_user(user_id).await?;
        Ok(positions.into_iter().filter(Position::is_claimable).collect())
    }

    pub async fn transactions_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>> {
        self.atomically(|tx| tx.transactions_for_user(user_id))
    }
}
