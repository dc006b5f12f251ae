mod support;

use chrono::Duration;
use rust_decimal_macros::dec;

use driftpool::domain::{MarketId, Side};
use driftpool::error::Error;
use driftpool::testkit::domain::{usdc, user};
use driftpool::testkit::engine::TestEngine;

use support::assertions::{assert_balance_matches_log, assert_unchanged};
use support::scenario::{bettor, funded, past_deadline, resolve_with_accuracy, HEALTHY_ACCURACY};

#[tokio::test]
async fn bet_locks_funds_and_grows_the_pool() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = funded(&t, "alice", usdc(10)).await;

    let receipt = t
        .engine
        .place_bet(&market.id, &alice, Side::Drift, usdc(4))
        .await
        .unwrap();

    assert_eq!(receipt.market.total_stake_drift, usdc(4));
    assert_eq!(receipt.market.participants, 1);
    assert_eq!(receipt.position.stake_drift, usdc(4));
    assert_eq!(receipt.balance.available_balance, usdc(6));
    assert_eq!(receipt.balance.locked_in_markets, usdc(4));
    assert_eq!(receipt.odds.drift, Some(dec!(2.0)));
    assert_eq!(receipt.entry_odds, dec!(2.0));
    assert!(receipt.position.avg_odds_drift.is_some());

    let history = t.engine.bet_history(&market.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].amount, usdc(4));
    assert_balance_matches_log(&t.engine, &alice).await;
}

#[tokio::test]
async fn repeat_bets_aggregate_into_one_position() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = funded(&t, "alice", usdc(10)).await;

    for side in [Side::Drift, Side::NoDrift, Side::Drift] {
        t.engine
            .place_bet(&market.id, &alice, side, usdc(1))
            .await
            .unwrap();
    }

    let positions = t.engine.positions(&market.id).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].stake_drift, usdc(2));
    assert_eq!(positions[0].stake_no_drift, usdc(1));
    assert_eq!(t.engine.market(&market.id).await.unwrap().participants, 1);
}

#[tokio::test]
async fn bet_after_deadline_changes_nothing() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::hours(1)).await.unwrap();
    let alice = funded(&t, "alice", usdc(10)).await;
    bettor(&t, &market, "bob", Side::NoDrift, usdc(2)).await;

    past_deadline(&t, &market);
    let market_before = t.engine.market(&market.id).await.unwrap();
    let balance_before = t.engine.balance(&alice).await.unwrap();

    let err = t
        .engine
        .place_bet(&market.id, &alice, Side::Drift, usdc(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MarketClosed { .. }));

    assert_unchanged(&market_before, &t.engine.market(&market.id).await.unwrap());
    assert_eq!(t.engine.balance(&alice).await.unwrap(), balance_before);
    assert!(t
        .engine
        .position(&market.id, &alice)
        .await
        .is_err());
}

#[tokio::test]
async fn bet_on_resolved_market_is_closed() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::hours(1)).await.unwrap();
    let alice = funded(&t, "alice", usdc(10)).await;
    resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;

    let err = t
        .engine
        .place_bet(&market.id, &alice, Side::NoDrift, usdc(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MarketClosed { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_bets_on_one_side_are_not_lost() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    bettor(&t, &market, "early", Side::Drift, 1_000).await;
    let alice = funded(&t, "alice", 100).await;
    let bob = funded(&t, "bob", 200).await;

    let first = {
        let engine = t.engine.clone();
        let id = market.id.clone();
        tokio::spawn(async move { engine.place_bet(&id, &alice, Side::Drift, 100).await })
    };
    let second = {
        let engine = t.engine.clone();
        let id = market.id.clone();
        tokio::spawn(async move { engine.place_bet(&id, &bob, Side::Drift, 200).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let market = t.engine.market(&market.id).await.unwrap();
    assert_eq!(market.total_stake_drift, 1_300);
    assert_eq!(market.participants, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_concurrent_bettors_keep_pool_and_positions_in_step() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20u64 {
        let name = format!("user-{i}");
        funded(&t, &name, usdc(5)).await;
        let engine = t.engine.clone();
        let id = market.id.clone();
        let side = if i % 2 == 0 { Side::Drift } else { Side::NoDrift };
        handles.push(tokio::spawn(async move {
            engine.place_bet(&id, &user(&name), side, usdc(1) + i).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let market = t.engine.market(&market.id).await.unwrap();
    let positions = t.engine.positions(&market.id).await.unwrap();
    let staked: u64 = positions.iter().map(|p| p.total_stake()).sum();
    assert_eq!(positions.len(), 20);
    assert_eq!(staked, market.total_pool());
    assert_eq!(market.participants, 20);
}

#[tokio::test]
async fn insufficient_balance_is_rejected() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = funded(&t, "alice", usdc(1)).await;

    let err = t
        .engine
        .place_bet(&market.id, &alice, Side::Drift, usdc(2))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientBalance {
            available: 1_000_000,
            required: 2_000_000
        }
    ));
    assert_eq!(t.engine.market(&market.id).await.unwrap().total_pool(), 0);
}

#[tokio::test]
async fn zero_amount_and_unknown_market_are_rejected() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = funded(&t, "alice", usdc(1)).await;

    let err = t
        .engine
        .place_bet(&market.id, &alice, Side::Drift, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = t
        .engine
        .place_bet(&MarketId::from("missing"), &alice, Side::Drift, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn empty_pool_quotes_default_odds() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let odds = t.engine.get_odds(&market.id).await.unwrap();
    assert_eq!(odds.no_drift, Some(dec!(2.0)));
    assert_eq!(odds.drift, Some(dec!(2.0)));
    assert_eq!(odds.total_pool, 0);
}

#[tokio::test]
async fn drift_stake_moves_odds_in_opposite_directions() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    bettor(&t, &market, "anchor", Side::NoDrift, usdc(5)).await;
    bettor(&t, &market, "seed", Side::Drift, usdc(1)).await;

    let mut previous = t.engine.get_odds(&market.id).await.unwrap();
    for i in 0..5 {
        bettor(&t, &market, &format!("drifter-{i}"), Side::Drift, usdc(1)).await;
        let odds = t.engine.get_odds(&market.id).await.unwrap();
        assert!(odds.drift < previous.drift, "drift odds must fall");
        assert!(odds.no_drift > previous.no_drift, "no-drift odds must rise");
        previous = odds;
    }
}

#[tokio::test]
async fn first_stake_on_an_empty_side_gets_a_finite_quote() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    bettor(&t, &market, "anchor", Side::NoDrift, usdc(5)).await;

    let before = t.engine.get_odds(&market.id).await.unwrap();
    assert_eq!(before.drift, None);
    assert_eq!(before.no_drift, Some(dec!(0.95)));

    let alice = funded(&t, "alice", usdc(5)).await;
    let receipt = t
        .engine
        .place_bet(&market.id, &alice, Side::Drift, usdc(5))
        .await
        .unwrap();
    assert_eq!(receipt.odds.drift, None);
    // 10/5 * 0.95
    assert_eq!(receipt.entry_odds, dec!(1.9));
    assert_eq!(receipt.position.avg_odds_drift, Some(dec!(1.9)));

    let after = t.engine.get_odds(&market.id).await.unwrap();
    assert_eq!(after.drift, Some(dec!(1.9)));
    assert!(after.no_drift > before.no_drift);

    let history = t.engine.bet_history(&market.id).await.unwrap();
    let entry = history.iter().find(|bet| bet.user_id == alice).unwrap();
    assert_eq!(entry.odds, dec!(1.9));
}
