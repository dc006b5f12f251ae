//! Command-line adapter: argument parsing, dispatch, and output.

pub mod command;
pub mod config;
pub mod context;
pub mod market;
pub mod model;
pub mod output;
pub mod receipt;
pub mod run;
pub mod wallet;

use self::command::{
    CheckCommand, Cli, ColorChoice, Commands, ConfigCommand, MarketCommand, ModelCommand,
};
use self::context::Context;
use self::output::OutputConfig;
use crate::error::Result;

/// Apply global flags and run the selected command.
///
/// # Errors
/// Returns the command's error; the binary prints it and exits non-zero.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    let context = Context {
        config_path: cli.config,
        database: cli.db,
    };

    match cli.command {
        Commands::Run => run::execute(&context).await,
        Commands::Odds(args) => market::execute_odds(&context, &args).await,
        Commands::Markets(args) => market::execute_list(&context, &args).await,
        Commands::Market(MarketCommand::Create(args)) => {
            market::execute_create(&context, &args).await
        }
        Commands::Market(MarketCommand::Show(args)) => market::execute_show(&context, &args).await,
        Commands::Resolve(args) => market::execute_resolve(&context, &args).await,
        Commands::Model(ModelCommand::Register(args)) => {
            model::execute_register(&context, &args).await
        }
        Commands::Model(ModelCommand::Deactivate(args)) => {
            model::execute_deactivate(&context, &args).await
        }
        Commands::Model(ModelCommand::List(args)) => model::execute_list(&context, &args).await,
        Commands::Model(ModelCommand::Receipts(args)) => {
            model::execute_receipts(&context, &args).await
        }
        Commands::Monitor(args) => model::execute_monitor(&context, &args).await,
        Commands::Bet(args) => wallet::execute_bet(&context, &args).await,
        Commands::Claim(args) => wallet::execute_claim(&context, &args).await,
        Commands::Deposit(args) => wallet::execute_deposit(&context, &args).await,
        Commands::Withdraw(args) => wallet::execute_withdraw(&context, &args).await,
        Commands::Balance(args) => wallet::execute_balance(&context, &args).await,
        Commands::Verify(args) => receipt::execute(&context, &args).await,
        Commands::Config(ConfigCommand::Init(args)) => config::execute_init(&args),
        Commands::Config(ConfigCommand::Show) => config::execute_show(&context),
        Commands::Check(CheckCommand::Config(args)) => config::execute_check(&context, &args),
        Commands::Check(CheckCommand::Ledger) => config::execute_check_ledger(&context),
    }
}
