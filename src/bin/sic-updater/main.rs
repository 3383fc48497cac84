//! sic-updater CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use sic_updater::{Orchestrator, UpdateOutcome};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let check_only = cli.check_only;
    let force = cli.force;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("sic-updater v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.into_config()?;
    let orchestrator = Orchestrator::host(config);
    let report = orchestrator.run(check_only, force).await?;

    if let Some(reason) = &report.deferred {
        info!("run deferred: {reason}");
        return Ok(());
    }
    for (id, outcome) in &report.components {
        match outcome {
            UpdateOutcome::Available { installed, latest } => {
                println!("{id}: update available {installed} -> {latest}");
            }
            UpdateOutcome::Updated { version } => {
                println!("{id}: updated to {version}");
            }
            UpdateOutcome::RolledBack { version, reason } => {
                println!("{id}: rolled back to {version} ({reason})");
            }
            UpdateOutcome::UpToDate => {}
        }
    }
    Ok(())
}
