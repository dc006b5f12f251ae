//! Handlers for market commands: listing, odds, creation, and resolution.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use crate::adapter::inbound::cli::command::{CreateMarketArgs, MarketArg, MarketsArgs};
use crate::adapter::inbound::cli::context::Context;
use crate::adapter::inbound::cli::output;
use crate::domain::{
    format_usdc, Market, MarketId, ModelId, NewMarket, OddsValue, Outcome, Position, UserId,
};
use crate::error::{Error, Result};
use crate::port::MarketFilter;

#[derive(Tabled, Serialize)]
struct MarketRow {
    #[tabled(rename = "Market")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "No drift")]
    no_drift: String,
    #[tabled(rename = "Drift")]
    drift: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

impl From<&Market> for MarketRow {
    fn from(market: &Market) -> Self {
        Self {
            id: market.id.to_string(),
            title: market.title.clone(),
            status: market.status.to_string(),
            deadline: market.resolution_deadline.format("%Y-%m-%d %H:%M").to_string(),
            no_drift: format_usdc(market.total_stake_no_drift),
            drift: format_usdc(market.total_stake_drift),
            outcome: market
                .outcome
                .map_or_else(|| "-".to_string(), |o| o.to_string()),
        }
    }
}

#[derive(Tabled, Serialize)]
struct PositionRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "No drift")]
    no_drift: String,
    #[tabled(rename = "Drift")]
    drift: String,
    #[tabled(rename = "Payout")]
    payout: String,
    #[tabled(rename = "Claimed")]
    claimed: bool,
}

impl From<&Position> for PositionRow {
    fn from(position: &Position) -> Self {
        Self {
            user: position.user_id.to_string(),
            no_drift: format_usdc(position.stake_no_drift),
            drift: format_usdc(position.stake_drift),
            payout: position
                .payout_amount
                .map_or_else(|| "-".to_string(), format_usdc),
            claimed: position.is_claimed,
        }
    }
}

/// Execute `markets`.
pub async fn execute_list(context: &Context, args: &MarketsArgs) -> Result<()> {
    let engine = context.engine()?;
    let filter = MarketFilter {
        model_id: args.model.as_deref().map(ModelId::from),
        status: args.status,
        deadline_before: None,
    };
    let markets = engine.list_markets(&filter).await?;

    if markets.is_empty() {
        output::note("No markets");
        return Ok(());
    }
    let rows: Vec<MarketRow> = markets.iter().map(MarketRow::from).collect();
    output::table("market", &rows);
    Ok(())
}

/// Execute `odds`.
pub async fn execute_odds(context: &Context, args: &MarketArg) -> Result<()> {
    let engine = context.engine()?;
    let market_id = MarketId::from(args.market.as_str());
    let market = engine.market(&market_id).await?;
    let odds = engine.get_odds(&market_id).await?;

    output::record("odds", &odds);
    output::section(&market.title);
    output::field("No drift", quote(odds.no_drift));
    output::field("Drift", quote(odds.drift));
    output::field("Pool", format_usdc(odds.total_pool));
    output::field("Participants", market.participants);
    if !market.is_active() {
        output::hint("market is resolved; odds are frozen at the final pool");
    }
    Ok(())
}

/// Execute `market show`.
pub async fn execute_show(context: &Context, args: &MarketArg) -> Result<()> {
    let engine = context.engine()?;
    let market_id = MarketId::from(args.market.as_str());
    let market = engine.market(&market_id).await?;
    let positions = engine.positions(&market_id).await?;

    output::record("market", &market);
    print_market(&market);
    if !positions.is_empty() {
        output::section("Positions");
        let rows: Vec<PositionRow> = positions.iter().map(PositionRow::from).collect();
        output::table("position", &rows);
    }
    Ok(())
}

/// Execute `market create`.
pub async fn execute_create(context: &Context, args: &CreateMarketArgs) -> Result<()> {
    let deadline = parse_deadline(&args.deadline)?;
    let engine = context.engine()?;
    let market = engine
        .create_market(NewMarket {
            model_id: ModelId::from(args.model.as_str()),
            creator_id: UserId::new(&args.creator),
            title: args.title.clone(),
            resolution_deadline: deadline,
            drift_threshold_percent: args.threshold,
        })
        .await?;

    output::record("market", &market);
    output::success("Market created");
    output::field("Market", output::highlight(&market.id));
    output::field("Threshold", format!("{}%", market.drift_threshold_percent));
    output::field("Deadline", market.resolution_deadline.to_rfc3339());
    Ok(())
}

/// Execute `resolve`.
pub async fn execute_resolve(context: &Context, args: &MarketArg) -> Result<()> {
    let engine = context.engine()?;
    let resolution = engine
        .resolve_market(&MarketId::from(args.market.as_str()))
        .await?;

    output::record("market", &resolution.market);
    output::success("Market resolved");
    print_market(&resolution.market);
    if let Some(reason) = &resolution.invalid_reason {
        output::warning(&format!("Resolved invalid: {reason}"));
    }
    Ok(())
}

fn print_market(market: &Market) {
    output::section(&market.title);
    output::field("Market", &market.id);
    output::field("Model", &market.model_id);
    output::field("Status", &market.status);
    output::field("Threshold", format!("{}%", market.drift_threshold_percent));
    output::field("Deadline", market.resolution_deadline.to_rfc3339());
    output::field("No drift", format_usdc(market.total_stake_no_drift));
    output::field("Drift", format_usdc(market.total_stake_drift));
    if let Some(outcome) = market.outcome {
        let rendered = match outcome {
            Outcome::Invalid => output::negative(outcome),
            Outcome::NoDrift | Outcome::Drift => output::positive(outcome),
        };
        output::field("Outcome", rendered);
    }
    if let Some(drift) = market.final_drift_percentage {
        output::field("Final drift", format!("{drift:.2}%"));
    }
    if let Some(settlement) = &market.settlement {
        output::field("Paid out", format_usdc(settlement.total_paid));
        output::field("Platform fee", format_usdc(settlement.platform_fee));
        output::field("Winners", settlement.winners);
    }
    if let Some(reason) = &market.attention {
        output::warning(&format!("Needs attention: {reason}"));
    }
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Validation(format!("deadline '{raw}' is not RFC 3339: {e}")))
}

/// Render one side's quote; a side without stake has none.
fn quote(odds: Option<OddsValue>) -> String {
    match odds {
        Some(value) => output::highlight(format!("{value}x")),
        None => output::muted("no quote (side has no stake)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_accepts_offsets() {
        let at = parse_deadline("2026-11-01T12:00:00+02:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2026-11-01T10:00:00+00:00");
    }

    #[test]
    fn deadline_rejects_dates_without_time() {
        assert!(matches!(
            parse_deadline("2026-11-01"),
            Err(Error::Validation(_))
        ));
    }
}
