mod support;

use chrono::Duration;

use driftpool::application::Settlement;
use driftpool::domain::{MarketStatus, Outcome, Side};
use driftpool::error::Error;
use driftpool::port::{Event, LedgerStore};
use driftpool::testkit::engine::TestEngine;

use support::assertions::{assert_balance_matches_log, assert_pool_conserved};
use support::scenario::{bettor, past_deadline, resolve_with_accuracy, HEALTHY_ACCURACY};

#[tokio::test]
async fn no_drift_pool_pays_pro_rata_after_fee() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(7)).await.unwrap();

    let alice = bettor(&t, &market, "alice", Side::NoDrift, 500_000).await;
    let bob = bettor(&t, &market, "bob", Side::NoDrift, 4_500_000).await;
    let carol = bettor(&t, &market, "carol", Side::Drift, 3_000_000).await;

    let resolution = resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;
    assert_eq!(resolution.plan.outcome, Outcome::NoDrift);
    assert_eq!(resolution.plan.total_pool, 8_000_000);
    assert_eq!(resolution.plan.platform_fee, 400_000);
    assert_eq!(resolution.plan.payout_pool, 7_600_000);

    let alice_position = t.engine.position(&market.id, &alice).await.unwrap();
    let bob_position = t.engine.position(&market.id, &bob).await.unwrap();
    let carol_position = t.engine.position(&market.id, &carol).await.unwrap();
    assert_eq!(alice_position.payout_amount, Some(760_000));
    assert_eq!(bob_position.payout_amount, Some(6_840_000));
    assert_eq!(carol_position.payout_amount, Some(0));

    let carol_balance = t.engine.balance(&carol).await.unwrap();
    assert_eq!(carol_balance.locked_in_markets, 0);
    assert_eq!(carol_balance.claimable_winnings, 0);
    assert_eq!(carol_balance.total(), 0);

    assert_pool_conserved(&t.engine, &market.id).await;
    for user in [&alice, &bob, &carol] {
        assert_balance_matches_log(&t.engine, user).await;
    }
    assert_eq!(
        t.notifier
            .count(|e| matches!(e, Event::WinningsAvailable(_))),
        2
    );
}

#[tokio::test]
async fn rounding_remainder_is_withheld_not_lost() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    for name in ["a", "b", "c"] {
        bettor(&t, &market, name, Side::NoDrift, 1_000_000).await;
    }
    bettor(&t, &market, "d", Side::Drift, 1).await;

    let resolution = resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;
    assert_eq!(resolution.plan.platform_fee, 150_000);
    assert_eq!(resolution.plan.total_paid, 2_850_000);
    assert_eq!(resolution.plan.rounding_remainder, 1);

    let summary = resolution.market.settlement.unwrap();
    assert_eq!(summary.platform_take(), 150_001);
    assert_pool_conserved(&t.engine, &market.id).await;
}

#[tokio::test]
async fn one_sided_winner_gets_stake_back_less_fee() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = bettor(&t, &market, "alice", Side::NoDrift, 1_000_000).await;
    let bob = bettor(&t, &market, "bob", Side::NoDrift, 2_000_000).await;

    resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;

    let alice_position = t.engine.position(&market.id, &alice).await.unwrap();
    let bob_position = t.engine.position(&market.id, &bob).await.unwrap();
    assert_eq!(alice_position.payout_amount, Some(950_000));
    assert_eq!(bob_position.payout_amount, Some(1_900_000));
    assert_pool_conserved(&t.engine, &market.id).await;
}

#[tokio::test]
async fn missing_receipt_refunds_every_stake() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = bettor(&t, &market, "alice", Side::NoDrift, 2_000_000).await;
    let bob = bettor(&t, &market, "bob", Side::Drift, 3_000_000).await;

    past_deadline(&t, &market);
    let resolution = t.engine.resolve_market(&market.id).await.unwrap();

    assert_eq!(resolution.market.outcome, Some(Outcome::Invalid));
    assert!(resolution.invalid_reason.is_some());
    assert!(resolution.market.final_drift_percentage.is_none());
    assert!(resolution.market.resolution_receipt.is_none());

    assert_eq!(
        t.engine.balance(&alice).await.unwrap().claimable_winnings,
        2_000_000
    );
    assert_eq!(
        t.engine.balance(&bob).await.unwrap().claimable_winnings,
        3_000_000
    );
    assert_pool_conserved(&t.engine, &market.id).await;
}

#[tokio::test]
async fn zero_stake_market_settles_without_transactions() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();

    let resolution = resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;
    assert_eq!(resolution.market.status, MarketStatus::Resolved);
    assert!(resolution.plan.allocations.is_empty());
    assert_eq!(resolution.plan.total_paid, 0);

    let logged = t
        .store
        .atomically(|tx| tx.transactions_for_market(&market.id))
        .unwrap();
    assert!(logged.is_empty());

    let again = t.engine.distribute_payouts(&market.id).await.unwrap();
    assert!(matches!(again, Settlement::AlreadySettled { .. }));
}

#[tokio::test]
async fn distributing_twice_is_a_no_op() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = bettor(&t, &market, "alice", Side::NoDrift, 1_000_000).await;
    bettor(&t, &market, "bob", Side::Drift, 1_000_000).await;
    resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;

    let before = t.engine.balance(&alice).await.unwrap();
    let settlement = t.engine.distribute_payouts(&market.id).await.unwrap();
    assert!(matches!(settlement, Settlement::AlreadySettled { .. }));
    assert_eq!(t.engine.balance(&alice).await.unwrap(), before);
}

#[tokio::test]
async fn distributing_an_active_market_fails() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let err = t.engine.distribute_payouts(&market.id).await.unwrap_err();
    assert!(matches!(err, Error::NotResolved { .. }));
}

#[tokio::test]
async fn claim_credits_once() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = bettor(&t, &market, "alice", Side::NoDrift, 500_000).await;
    bettor(&t, &market, "bob", Side::NoDrift, 4_500_000).await;
    bettor(&t, &market, "carol", Side::Drift, 3_000_000).await;
    resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;

    let receipt = t.engine.claim(&alice, &market.id).await.unwrap();
    assert_eq!(receipt.payout, 760_000);
    assert_eq!(receipt.balance.available_balance, 760_000);
    assert_eq!(receipt.balance.claimable_winnings, 0);

    let err = t.engine.claim(&alice, &market.id).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyClaimed { .. }));
    assert_eq!(
        t.engine.balance(&alice).await.unwrap().available_balance,
        760_000
    );
    assert!(t.engine.position(&market.id, &alice).await.unwrap().is_claimed);
    assert_balance_matches_log(&t.engine, &alice).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_claims_credit_exactly_once() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    let alice = bettor(&t, &market, "alice", Side::NoDrift, 1_000_000).await;
    bettor(&t, &market, "bob", Side::Drift, 1_000_000).await;
    resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = t.engine.clone();
        let (user, market_id) = (alice.clone(), market.id.clone());
        handles.push(tokio::spawn(
            async move { engine.claim(&user, &market_id).await },
        ));
    }
    let mut credited = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => credited += 1,
            Err(Error::AlreadyClaimed { .. }) => {}
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }

    assert_eq!(credited, 1);
    assert_eq!(
        t.engine.balance(&alice).await.unwrap().available_balance,
        1_900_000
    );
}

#[tokio::test]
async fn losers_and_open_markets_have_nothing_to_claim() {
    let t = TestEngine::new();
    let (_, market) = t.model_with_market(Duration::days(1)).await.unwrap();
    bettor(&t, &market, "alice", Side::NoDrift, 1_000_000).await;
    let carol = bettor(&t, &market, "carol", Side::Drift, 1_000_000).await;

    let err = t.engine.claim(&carol, &market.id).await.unwrap_err();
    assert!(matches!(err, Error::NothingToClaim { .. }));

    resolve_with_accuracy(&t, &market, HEALTHY_ACCURACY).await;
    let err = t.engine.claim(&carol, &market.id).await.unwrap_err();
    assert!(matches!(err, Error::NothingToClaim { .. }));

    let stranger = driftpool::testkit::domain::user("stranger");
    let err = t.engine.claim(&stranger, &market.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}
