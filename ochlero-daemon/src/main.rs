use anyhow::Result;
use clap::Parser;

use ochlero_daemon::cli::DaemonCli;
use ochlero_daemon::logging;
use ochlero_daemon::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = orchestrator::load_config(&cli).await?;
    logging::init_tracing(&config.general)?;

    if cli.validate {
        let summary = orchestrator::validate(&config).await?;
        println!(
            "configuration OK: {} watcher(s), {} event(s), {} alias(es), {} macro(s)",
            summary.watchers, summary.events, summary.aliases, summary.macros
        );
        return Ok(());
    }

    tracing::info!(
        config = %cli.config.display(),
        dry_run = cli.dry_run,
        "ochlero starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config, cli.dry_run).await?;
    orchestrator.run().await?;

    Ok(())
}
