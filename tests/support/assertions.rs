use driftpool::application::Engine;
use driftpool::domain::{Market, MarketId, Outcome, UserId};
use driftpool::port::LedgerStore;

/// Every micro-USDC of a resolved pool is accounted for.
pub async fn assert_pool_conserved<S: LedgerStore>(engine: &Engine<S>, market_id: &MarketId) {
    let market = engine.market(market_id).await.expect("market");
    let settlement = market
        .settlement
        .as_ref()
        .unwrap_or_else(|| panic!("market {market_id} is not settled"));
    let positions = engine.positions(market_id).await.expect("positions");
    let paid: u64 = positions.iter().filter_map(|p| p.payout_amount).sum();

    assert_eq!(paid, settlement.total_paid, "position payouts vs summary");
    match market.outcome {
        Some(Outcome::Invalid) => {
            assert_eq!(paid, market.total_pool(), "invalid market must refund in full");
            assert_eq!(settlement.platform_take(), 0);
        }
        Some(_) => assert_eq!(
            paid + settlement.platform_fee + settlement.rounding_remainder,
            market.total_pool(),
            "payouts + fee + remainder must equal the pool"
        ),
        None => panic!("settled market {market_id} has no outcome"),
    }
}

/// A user's balance total equals the sum of their logged net changes.
pub async fn assert_balance_matches_log<S: LedgerStore>(engine: &Engine<S>, user: &UserId) {
    let balance = engine.balance(user).await.expect("balance");
    let logged: i64 = engine
        .transactions_for_user(user)
        .await
        .expect("transactions")
        .iter()
        .map(|t| t.net_change)
        .sum();
    assert_eq!(
        i64::try_from(balance.total()).expect("balance fits i64"),
        logged,
        "balance of {user} drifted from its transaction log"
    );
}

pub fn assert_unchanged(before: &Market, after: &Market) {
    assert_eq!(before.total_stake_no_drift, after.total_stake_no_drift);
    assert_eq!(before.total_stake_drift, after.total_stake_drift);
    assert_eq!(before.participants, after.participants);
    assert_eq!(before.status, after.status);
}
