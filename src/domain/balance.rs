//! User balances and the append-only transaction log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{EntryId, MarketId, UserId};
use super::money::Amount;
use crate::error::{Error, Result};

/// A user's funds split by where they currently sit.
///
/// A bet moves `available -> locked`, settlement moves a winning share
/// `locked -> claimable`, and a claim moves `claimable -> available`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub user_id: UserId,
    pub available_balance: Amount,
    pub locked_in_markets: Amount,
    pub claimable_winnings: Amount,
    /// Lifetime claimed payouts.
    pub total_earned: Amount,
    pub updated_at: DateTime<Utc>,
}

impl UserBalance {
    #[must_use]
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            available_balance: 0,
            locked_in_markets: 0,
            claimable_winnings: 0,
            total_earned: 0,
            updated_at: now,
        }
    }

    /// `available + locked + claimable`.
    #[must_use]
    pub const fn total(&self) -> Amount {
        self.available_balance + self.locked_in_markets + self.claimable_winnings
    }

    /// Move `amount` from available into locked.
    pub fn lock(&mut self, amount: Amount) -> Result<()> {
        if self.available_balance < amount {
            return Err(Error::InsufficientBalance {
                available: self.available_balance,
                required: amount,
            });
        }
        self.available_balance -= amount;
        self.locked_in_markets += amount;
        Ok(())
    }

    /// Release a settled stake from locked and credit its payout as claimable.
    pub fn settle(&mut self, stake: Amount, payout: Amount) -> Result<()> {
        self.locked_in_markets = self.locked_in_markets.checked_sub(stake).ok_or_else(|| {
            Error::DataIntegrity(format!(
                "user {} has {} locked but settlement releases {}",
                self.user_id, self.locked_in_markets, stake
            ))
        })?;
        self.claimable_winnings += payout;
        Ok(())
    }

    /// Move a claimed payout from claimable into available.
    pub fn claim(&mut self, payout: Amount) -> Result<()> {
        self.claimable_winnings =
            self.claimable_winnings.checked_sub(payout).ok_or_else(|| {
                Error::DataIntegrity(format!(
                    "user {} has {} claimable but claim requests {}",
                    self.user_id, self.claimable_winnings, payout
                ))
            })?;
        self.available_balance += payout;
        self.total_earned += payout;
        Ok(())
    }
}

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Bet,
    /// Winning position settled: stake released, payout credited.
    Payout,
    /// Losing position settled: stake released with nothing credited.
    LockRelease,
    /// Invalid market: stake moved back as claimable.
    Refund,
    Claim,
}

impl TransactionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Bet => "bet",
            Self::Payout => "payout",
            Self::LockRelease => "lock_release",
            Self::Refund => "refund",
            Self::Claim => "claim",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "bet" => Ok(Self::Bet),
            "payout" => Ok(Self::Payout),
            "lock_release" => Ok(Self::LockRelease),
            "refund" => Ok(Self::Refund),
            "claim" => Ok(Self::Claim),
            other => Err(Error::Parse(format!("unknown transaction kind '{other}'"))),
        }
    }
}

/// Append-only audit record of a balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: EntryId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// Magnitude of the event (stake, payout, deposit, ...).
    pub amount: Amount,
    /// Change in `available + locked + claimable` caused by this event.
    pub net_change: i64,
    pub market_id: Option<MarketId>,
    /// Id of the entity that triggered the event.
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[must_use]
    pub fn new(
        user_id: UserId,
        kind: TransactionKind,
        amount: Amount,
        net_change: i64,
        market_id: Option<MarketId>,
        reference: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            kind,
            amount,
            net_change,
            market_id,
            reference: reference.into(),
            created_at: now,
        }
    }
}

/// Convert an amount into a signed delta.
pub(crate) fn signed(amount: Amount) -> Result<i64> {
    i64::try_from(amount)
        .map_err(|_| Error::Validation(format!("amount {amount} exceeds ledger range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(available: Amount) -> UserBalance {
        let mut b = UserBalance::empty(UserId::new("u"), Utc::now());
        b.available_balance = available;
        b
    }

    #[test]
    fn lock_moves_available_to_locked() {
        let mut b = balance(100);
        b.lock(40).unwrap();
        assert_eq!(b.available_balance, 60);
        assert_eq!(b.locked_in_markets, 40);
        assert_eq!(b.total(), 100);
    }

    #[test]
    fn lock_rejects_overdraft_without_mutation() {
        let mut b = balance(10);
        let err = b.lock(11).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientBalance {
                available: 10,
                required: 11
            }
        ));
        assert_eq!(b.available_balance, 10);
    }

    #[test]
    fn settle_then_claim() {
        let mut b = balance(100);
        b.lock(100).unwrap();
        b.settle(100, 150).unwrap();
        assert_eq!(b.locked_in_markets, 0);
        assert_eq!(b.claimable_winnings, 150);
        b.claim(150).unwrap();
        assert_eq!(b.available_balance, 150);
        assert_eq!(b.total_earned, 150);
    }

    #[test]
    fn settle_more_than_locked_is_integrity_error() {
        let mut b = balance(0);
        assert!(matches!(b.settle(1, 0), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Withdrawal,
            TransactionKind::Bet,
            TransactionKind::Payout,
            TransactionKind::LockRelease,
            TransactionKind::Refund,
            TransactionKind::Claim,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
    }
}
