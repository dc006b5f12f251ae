mod harness;

use predicates::prelude::*;

use harness::cli::{payloads, Sandbox};

#[test]
fn help_lists_commands() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bet"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("claim"));
}

#[test]
fn invalid_fee_rate_fails_config_check() {
    let sandbox = Sandbox::new();
    let path = sandbox.path("bad.toml");
    std::fs::write(&path, "[market]\nfee_rate = \"1.0\"\n").unwrap();

    sandbox
        .cmd()
        .args(["check", "config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fee_rate"));
}

#[test]
fn generated_config_passes_check() {
    let sandbox = Sandbox::new();
    let path = sandbox.path("generated.toml");

    sandbox
        .cmd()
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["check", "config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));

    // A second init must not clobber the file.
    sandbox
        .cmd()
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn deposit_then_balance_reports_funds() {
    let sandbox = Sandbox::new();

    let lines = sandbox.json(&["deposit", "alice", "12.5"]);
    let balances = payloads(&lines, "balance");
    assert_eq!(balances.len(), 1);
    assert_eq!(balances[0]["available_balance"], 12_500_000);

    let lines = sandbox.json(&["balance", "alice"]);
    let balances = payloads(&lines, "balance");
    assert_eq!(balances[0]["available_balance"], 12_500_000);
    assert_eq!(balances[0]["locked_in_markets"], 0);
}

#[test]
fn overdrawn_withdrawal_fails() {
    let sandbox = Sandbox::new();
    sandbox.json(&["deposit", "alice", "1"]);

    sandbox
        .cmd()
        .args(["withdraw", "alice", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient"));
}

#[test]
fn malformed_amount_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["deposit", "alice", "1.0000001"])
        .assert()
        .failure();
}

#[test]
fn market_flow_through_the_binary() {
    let sandbox = Sandbox::new();

    let lines = sandbox.json(&[
        "model",
        "register",
        "fraud-detector",
        "--owner",
        "acme",
        "--endpoint",
        "https://models.example.com/fraud/metrics",
        "--baseline",
        "accuracy=0.9",
    ]);
    let model_id = payloads(&lines, "model")[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let lines = sandbox.json(&[
        "market",
        "create",
        &model_id,
        "--creator",
        "acme",
        "--title",
        "Will fraud-detector drift?",
        "--deadline",
        "2099-01-01T00:00:00Z",
    ]);
    let market_id = payloads(&lines, "market")[0]["id"]
        .as_str()
        .unwrap()
        .to_string();

    sandbox.json(&["deposit", "alice", "10"]);
    let lines = sandbox.json(&["bet", &market_id, "alice", "drift", "4"]);
    let positions = payloads(&lines, "position");
    assert_eq!(positions[0]["stake_drift"], 4_000_000);

    let lines = sandbox.json(&["odds", &market_id]);
    assert_eq!(payloads(&lines, "odds")[0]["total_pool"], 4_000_000);

    let lines = sandbox.json(&["markets", "--status", "active"]);
    let markets = payloads(&lines, "market");
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0]["id"], market_id.as_str());

    // Resolving before the deadline is refused.
    sandbox
        .cmd()
        .args(["resolve", &market_id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot resolve before"));

    let lines = sandbox.json(&["balance", "alice"]);
    let balance = &payloads(&lines, "balance")[0];
    assert_eq!(balance["available_balance"], 6_000_000);
    assert_eq!(balance["locked_in_markets"], 4_000_000);
}

#[test]
fn unknown_market_is_not_found() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["odds", "no-such-market"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn ledger_check_creates_database() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["check", "ledger"])
        .assert()
        .success();
    assert!(sandbox.path("ledger.db").exists());
}
