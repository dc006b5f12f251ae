//! Handlers for funds and betting: deposit, withdraw, balance, bet, claim.

use serde::Serialize;
use tabled::Tabled;

use crate::adapter::inbound::cli::command::{AmountArgs, BetArgs, ClaimArgs, UserArg};
use crate::adapter::inbound::cli::context::Context;
use crate::adapter::inbound::cli::output;
use crate::domain::{format_usdc, parse_usdc, MarketId, Position, UserBalance, UserId};
use crate::error::Result;

#[derive(Tabled, Serialize)]
struct HoldingRow {
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "No drift")]
    no_drift: String,
    #[tabled(rename = "Drift")]
    drift: String,
    #[tabled(rename = "Claimable")]
    claimable: String,
}

impl From<&Position> for HoldingRow {
    fn from(position: &Position) -> Self {
        let claimable = match position.payout_amount {
            Some(payout) if !position.is_claimed && payout > 0 => format_usdc(payout),
            _ => "-".to_string(),
        };
        Self {
            market: position.market_id.to_string(),
            no_drift: format_usdc(position.stake_no_drift),
            drift: format_usdc(position.stake_drift),
            claimable,
        }
    }
}

/// Execute `deposit`.
pub async fn execute_deposit(context: &Context, args: &AmountArgs) -> Result<()> {
    let amount = parse_usdc(&args.amount)?;
    let engine = context.engine()?;
    let balance = engine.deposit(&UserId::new(&args.user), amount).await?;

    output::record("balance", &balance);
    output::success(&format!("Deposited {} USDC", format_usdc(amount)));
    print_balance(&balance);
    Ok(())
}

/// Execute `withdraw`.
pub async fn execute_withdraw(context: &Context, args: &AmountArgs) -> Result<()> {
    let amount = parse_usdc(&args.amount)?;
    let engine = context.engine()?;
    let balance = engine.withdraw(&UserId::new(&args.user), amount).await?;

    output::record("balance", &balance);
    output::success(&format!("Withdrew {} USDC", format_usdc(amount)));
    print_balance(&balance);
    Ok(())
}

/// Execute `balance`.
pub async fn execute_balance(context: &Context, args: &UserArg) -> Result<()> {
    let engine = context.engine()?;
    let user_id = UserId::new(&args.user);
    let balance = engine.balance(&user_id).await?;
    let positions = engine.positions_for_user(&user_id).await?;

    output::record("balance", &balance);
    print_balance(&balance);
    if !positions.is_empty() {
        output::section("Positions");
        let rows: Vec<HoldingRow> = positions.iter().map(HoldingRow::from).collect();
        output::table("position", &rows);
    }
    if output::verbosity() > 0 {
        let history = engine.transactions_for_user(&user_id).await?;
        output::section("Transactions");
        for entry in &history {
            output::record("transaction", entry);
            output::field(entry.kind.as_str(), format_signed(entry.net_change));
        }
    }
    Ok(())
}

/// Execute `bet`.
pub async fn execute_bet(context: &Context, args: &BetArgs) -> Result<()> {
    let amount = parse_usdc(&args.amount)?;
    let engine = context.engine()?;
    let receipt = engine
        .place_bet(
            &MarketId::from(args.market.as_str()),
            &UserId::new(&args.user),
            args.side,
            amount,
        )
        .await?;

    output::record("position", &receipt.position);
    output::success(&format!(
        "Bet {} USDC on {} at {}x",
        format_usdc(amount),
        args.side,
        receipt.entry_odds
    ));
    output::field("Pool", format_usdc(receipt.market.total_pool()));
    output::field("Available", format_usdc(receipt.balance.available_balance));
    Ok(())
}

/// Execute `claim`.
pub async fn execute_claim(context: &Context, args: &ClaimArgs) -> Result<()> {
    let engine = context.engine()?;
    let receipt = engine
        .claim(
            &UserId::new(&args.user),
            &MarketId::from(args.market.as_str()),
        )
        .await?;

    output::record("balance", &receipt.balance);
    output::success(&format!(
        "Claimed {} USDC",
        output::positive(format_usdc(receipt.payout))
    ));
    print_balance(&receipt.balance);
    Ok(())
}

fn print_balance(balance: &UserBalance) {
    output::section(&format!("Balance for {}", balance.user_id));
    output::field("Available", format_usdc(balance.available_balance));
    output::field("Locked", format_usdc(balance.locked_in_markets));
    output::field("Claimable", format_usdc(balance.claimable_winnings));
    output::field("Total earned", format_usdc(balance.total_earned));
}

fn format_signed(micros: i64) -> String {
    let magnitude = format_usdc(micros.unsigned_abs());
    if micros < 0 {
        output::negative(format!("-{magnitude}"))
    } else {
        output::positive(format!("+{magnitude}"))
    }
}
