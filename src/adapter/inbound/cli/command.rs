//! Command-line interface definitions.
//!
//! Defines the CLI structure for the driftpool binary using `clap`. Every
//! subcommand opens the configured ledger, performs one engine operation,
//! and prints the result; `run` starts the background scheduler instead.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{MarketStatus, Side};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "driftpool.toml";

/// Pooled-stake prediction markets resolved by model drift oracles
#[derive(Parser, Debug)]
#[command(name = "driftpool")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the configuration file (defaults to ./driftpool.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the ledger database path from the configuration
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the driftpool CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitoring and resolution scheduler until interrupted
    Run,

    /// Show the current odds of a market
    Odds(MarketArg),

    /// List markets
    Markets(MarketsArgs),

    /// Create a market on a registered model
    #[command(subcommand)]
    Market(MarketCommand),

    /// Manage monitored models
    #[command(subcommand)]
    Model(ModelCommand),

    /// Run one monitoring cycle for a model now
    Monitor(ModelArg),

    /// Resolve a market past its deadline
    Resolve(MarketArg),

    /// Place a bet on one side of a market
    Bet(BetArgs),

    /// Claim settled winnings or a refund
    Claim(ClaimArgs),

    /// Credit funds to a user
    Deposit(AmountArgs),

    /// Debit available funds from a user
    Withdraw(AmountArgs),

    /// Show a user's balance and open positions
    Balance(UserArg),

    /// Verify the integrity of a monitoring receipt
    Verify(ReceiptArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `driftpool market`.
#[derive(Subcommand, Debug)]
pub enum MarketCommand {
    /// Open a new market on a model
    Create(CreateMarketArgs),
    /// Show a market with its positions
    Show(MarketArg),
}

/// Subcommands for `driftpool model`.
#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Register a model for drift monitoring
    Register(RegisterModelArgs),
    /// Stop monitoring a model
    Deactivate(ModelArg),
    /// List registered models
    List(ListModelsArgs),
    /// Show recent monitoring receipts for a model
    Receipts(ModelArg),
}

/// Subcommands for `driftpool config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a documented configuration template.
    Init(ConfigInitArgs),
    /// Display the effective configuration with defaults applied.
    Show,
}

/// Subcommands for `driftpool check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics.
    Config(CheckConfigArgs),
    /// Open the ledger and apply pending migrations.
    Ledger,
}

#[derive(Args, Debug)]
pub struct MarketArg {
    /// Market identifier
    pub market: String,
}

#[derive(Args, Debug)]
pub struct ModelArg {
    /// Model identifier
    pub model: String,
}

#[derive(Args, Debug)]
pub struct UserArg {
    /// User identifier
    pub user: String,
}

/// Arguments for `markets`.
#[derive(Args, Debug)]
pub struct MarketsArgs {
    /// Only markets on this model
    #[arg(long)]
    pub model: Option<String>,

    /// Only markets in this status (active or resolved)
    #[arg(long)]
    pub status: Option<MarketStatus>,
}

/// Arguments for `market create`.
#[derive(Args, Debug)]
pub struct CreateMarketArgs {
    /// Model the market is about
    pub model: String,

    /// Creating user
    #[arg(long)]
    pub creator: String,

    /// Market question shown to bettors
    #[arg(long)]
    pub title: String,

    /// Resolution deadline (RFC 3339)
    #[arg(long)]
    pub deadline: String,

    /// Drift threshold in percent; defaults to the model's threshold
    #[arg(long)]
    pub threshold: Option<f64>,
}

/// Arguments for `model register`.
#[derive(Args, Debug)]
pub struct RegisterModelArgs {
    /// Display name
    pub name: String,

    /// Owning user
    #[arg(long)]
    pub owner: String,

    /// Monitoring endpoint returning current metrics
    #[arg(long)]
    pub endpoint: String,

    /// Baseline metric as NAME=VALUE; repeat for each metric
    #[arg(long = "baseline", value_name = "NAME=VALUE", required = true)]
    pub baseline: Vec<String>,

    /// Drift threshold in percent
    #[arg(long, default_value = "5")]
    pub threshold: f64,

    /// Hours between monitoring cycles
    #[arg(long, default_value = "24")]
    pub frequency_hours: u32,

    /// Bearer token for the monitoring endpoint
    #[arg(long, conflicts_with = "api_key")]
    pub bearer: Option<String>,

    /// API key for the monitoring endpoint
    #[arg(long)]
    pub api_key: Option<String>,
}

/// Arguments for `model list`.
#[derive(Args, Debug)]
pub struct ListModelsArgs {
    /// Include deactivated models
    #[arg(long)]
    pub all: bool,
}

/// Arguments for `bet`.
#[derive(Args, Debug)]
pub struct BetArgs {
    /// Market identifier
    pub market: String,
    /// Betting user
    pub user: String,
    /// Side to back (no_drift or drift)
    pub side: Side,
    /// Stake in USDC, e.g. 12.5
    pub amount: String,
}

/// Arguments for `claim`.
#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Claiming user
    pub user: String,
    /// Settled market
    pub market: String,
}

/// Arguments for `deposit` and `withdraw`.
#[derive(Args, Debug)]
pub struct AmountArgs {
    /// User identifier
    pub user: String,
    /// Amount in USDC, e.g. 100 or 0.25
    pub amount: String,
}

/// Arguments for `verify`.
#[derive(Args, Debug)]
pub struct ReceiptArgs {
    /// Receipt identifier
    pub receipt: String,

    /// Also check a downloaded copy of the receipt against its hash
    #[arg(long)]
    pub copy: Option<PathBuf>,
}

/// Arguments for `config init`.
#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Destination path
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `check config`.
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Configuration file to validate; falls back to --config
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_with_global_flags() {
        let cli = Cli::try_parse_from(["driftpool", "--json", "-q", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run));
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(cli.config.is_none());
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli =
            Cli::try_parse_from(["driftpool", "odds", "m-1", "--config", "alt.toml", "-vv"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert_eq!(cli.verbose, 2);
        let Commands::Odds(arg) = cli.command else {
            panic!("expected odds");
        };
        assert_eq!(arg.market, "m-1");
    }

    #[test]
    fn parse_bet_side_and_amount() {
        let cli = Cli::try_parse_from(["driftpool", "bet", "m-1", "alice", "drift", "12.5"]).unwrap();
        let Commands::Bet(args) = cli.command else {
            panic!("expected bet");
        };
        assert_eq!(args.side, Side::Drift);
        assert_eq!(args.amount, "12.5");
    }

    #[test]
    fn unknown_side_is_rejected() {
        assert!(Cli::try_parse_from(["driftpool", "bet", "m-1", "alice", "yes", "1"]).is_err());
    }

    #[test]
    fn parse_markets_status_filter() {
        let cli = Cli::try_parse_from(["driftpool", "markets", "--status", "resolved"]).unwrap();
        let Commands::Markets(args) = cli.command else {
            panic!("expected markets");
        };
        assert_eq!(args.status, Some(MarketStatus::Resolved));
        assert!(args.model.is_none());
    }

    #[test]
    fn register_requires_a_baseline() {
        let parsed = Cli::try_parse_from([
            "driftpool",
            "model",
            "register",
            "fraud",
            "--owner",
            "alice",
            "--endpoint",
            "https://models.test/m",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn bearer_and_api_key_conflict() {
        let parsed = Cli::try_parse_from([
            "driftpool",
            "model",
            "register",
            "fraud",
            "--owner",
            "alice",
            "--endpoint",
            "https://models.test/m",
            "--baseline",
            "accuracy=0.9",
            "--bearer",
            "t",
            "--api-key",
            "k",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn check_config_path_is_optional() {
        let cli = Cli::try_parse_from(["driftpool", "check", "config"]).unwrap();
        let Commands::Check(CheckCommand::Config(args)) = cli.command else {
            panic!("expected check config");
        };
        assert!(args.path.is_none());
    }
}
