use chrono::Duration;

use driftpool::application::Resolution;
use driftpool::domain::{Amount, Market, Side, UserId};
use driftpool::port::LedgerStore;
use driftpool::testkit::domain::user;
use driftpool::testkit::engine::TestEngine;

/// Accuracy the test model reports when it has not drifted.
pub const HEALTHY_ACCURACY: f64 = 0.90;
/// Accuracy about 6.7% away from the baseline: over the 5% threshold,
/// under twice it.
pub const DRIFTED_ACCURACY: f64 = 0.84;

/// Deposit `amount` for `name` and return the user id.
pub async fn funded<S: LedgerStore>(t: &TestEngine<S>, name: &str, amount: Amount) -> UserId {
    let id = user(name);
    t.engine.deposit(&id, amount).await.expect("deposit");
    id
}

/// Fund a user with exactly `amount` and bet all of it on `side`.
pub async fn bettor<S: LedgerStore>(
    t: &TestEngine<S>,
    market: &Market,
    name: &str,
    side: Side,
    amount: Amount,
) -> UserId {
    let id = funded(t, name, amount).await;
    t.engine
        .place_bet(&market.id, &id, side, amount)
        .await
        .expect("bet");
    id
}

/// Record a receipt with the given accuracy, move past the deadline, and resolve.
pub async fn resolve_with_accuracy<S: LedgerStore>(
    t: &TestEngine<S>,
    market: &Market,
    accuracy: f64,
) -> Resolution {
    t.report_accuracy(accuracy);
    t.engine
        .run_monitoring_cycle(&market.model_id)
        .await
        .expect("monitoring cycle");
    past_deadline(t, market);
    t.engine.resolve_market(&market.id).await.expect("resolve")
}

/// Move the clock one minute past the market's deadline.
pub fn past_deadline<S: LedgerStore>(t: &TestEngine<S>, market: &Market) {
    t.clock.set(market.resolution_deadline + Duration::minutes(1));
}
