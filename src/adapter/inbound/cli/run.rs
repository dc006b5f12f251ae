//! Handler for the `run` command.

use tokio::signal;
use tracing::info;

use crate::adapter::inbound::cli::context::Context;
use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;
use crate::infrastructure::scheduler::Scheduler;

/// Execute the run command: start both sweep loops and block until Ctrl-C.
pub async fn execute(context: &Context) -> Result<()> {
    let config = context.config()?;
    config.init_logging();

    let engine = bootstrap::build_engine(&config)?;
    print_startup(&config);

    info!("driftpool starting");
    let handle = Scheduler::start(engine, config.scheduler.clone());

    signal::ctrl_c().await?;
    info!("Shutdown signal received");
    handle.shutdown().await;

    output::success("Scheduler stopped");
    Ok(())
}

fn print_startup(config: &Config) {
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", &config.database);
    output::field(
        "Monitoring",
        format!("every {}s", config.scheduler.monitoring_interval_secs),
    );
    output::field(
        "Resolution",
        format!("every {}s", config.scheduler.resolution_interval_secs),
    );
    output::field("Concurrency", config.scheduler.max_concurrent_cycles);
    if config.oracle.mirror_url.is_none() {
        output::warning("Receipt mirror disabled");
    }
    output::hint("press Ctrl-C to stop");
}
