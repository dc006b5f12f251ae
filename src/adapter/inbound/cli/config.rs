//! Handlers for the `config` and `check` command groups.

use std::fs;

use serde_json::json;

use crate::adapter::inbound::cli::command::{CheckConfigArgs, ConfigInitArgs};
use crate::adapter::inbound::cli::context::Context;
use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

/// Documented configuration template.
const CONFIG_TEMPLATE: &str = include_str!("../../../../driftpool.toml.example");

/// Execute `config init`.
pub fn execute_init(args: &ConfigInitArgs) -> Result<()> {
    let path = &args.path;
    if path.exists() && !args.force {
        return Err(ConfigError::InvalidValue {
            field: "config",
            reason: "file already exists (use --force to overwrite)".to_string(),
        }
        .into());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, CONFIG_TEMPLATE)?;
    output::success("Created configuration file");
    output::field("Path", path.display());
    output::section("Next Steps");
    output::note(&format!("1. Edit {} with your settings", path.display()));
    output::note(&format!("2. Run: driftpool check config {}", path.display()));
    output::note(&format!("3. Run: driftpool --config {} run", path.display()));
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(context: &Context) -> Result<()> {
    let config = context.config()?;
    match context.config_file() {
        Some(path) => output::field("Source", path.display()),
        None => output::field("Source", output::muted("defaults")),
    }
    print_summary(&config);
    Ok(())
}

/// Execute `check config`.
pub fn execute_check(context: &Context, args: &CheckConfigArgs) -> Result<()> {
    let config = match args.path.as_deref() {
        Some(path) => Config::load(path)?,
        None => context.config()?,
    };
    let source = args
        .path
        .clone()
        .or_else(|| context.config_file());

    output::section("Configuration Check");
    match &source {
        Some(path) => output::field("Config", path.display()),
        None => output::field("Config", output::muted("defaults")),
    }
    output::success("Configuration is valid");
    print_summary(&config);

    if config.oracle.mirror_url.is_none() {
        output::warning("No receipt mirror configured; receipts get fallback references only");
    }
    if !config.notifications.log && config.notifications.webhook_url.is_none() {
        output::warning("All notifications are disabled");
    }
    Ok(())
}

/// Execute `check ledger`.
pub fn execute_check_ledger(context: &Context) -> Result<()> {
    let config = context.config()?;
    bootstrap::open_ledger(&config)?;
    output::success("Ledger is reachable and migrated");
    output::field("Database", &config.database);
    Ok(())
}

fn print_summary(config: &Config) {
    output::record(
        "config",
        &json!({
            "database": config.database,
            "fee_rate": config.market.fee_rate,
            "default_odds": config.market.default_odds,
            "fetch_timeout_secs": config.oracle.fetch_timeout_secs,
            "mirror_url": config.oracle.mirror_url,
            "monitoring_interval_secs": config.scheduler.monitoring_interval_secs,
            "resolution_interval_secs": config.scheduler.resolution_interval_secs,
            "max_attempts": config.scheduler.retry.max_attempts,
            "webhook": config.notifications.webhook_url.is_some(),
        }),
    );
    output::section("Summary");
    output::field("Database", &config.database);
    output::field("Fee rate", config.market.fee_rate);
    output::field("Default odds", config.market.default_odds);
    output::field("Fetch timeout", format!("{}s", config.oracle.fetch_timeout_secs));
    output::field(
        "Mirror",
        config.oracle.mirror_url.as_deref().unwrap_or("disabled"),
    );
    output::field(
        "Sweeps",
        format!(
            "monitor every {}s, resolve every {}s",
            config.scheduler.monitoring_interval_secs, config.scheduler.resolution_interval_secs
        ),
    );
    output::field("Retries", config.scheduler.retry.max_attempts);
    output::field(
        "Webhook",
        if config.notifications.webhook_url.is_some() {
            "enabled"
        } else {
            "disabled"
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config = Config::parse_toml(CONFIG_TEMPLATE).unwrap();
        let defaults = Config::default();
        assert_eq!(config.database, defaults.database);
        assert_eq!(config.market.fee_rate, defaults.market.fee_rate);
        assert_eq!(config.oracle.fetch_timeout_secs, defaults.oracle.fetch_timeout_secs);
        assert_eq!(
            config.scheduler.retry.max_attempts,
            defaults.scheduler.retry.max_attempts
        );
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftpool.toml");
        fs::write(&path, "database = \"keep.db\"").unwrap();

        let args = ConfigInitArgs {
            path: path.clone(),
            force: false,
        };
        assert!(execute_init(&args).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "database = \"keep.db\"");
    }
}
