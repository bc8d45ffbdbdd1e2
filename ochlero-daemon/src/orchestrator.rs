//! Daemon orchestration -- assembly, signal handling, and lifecycle.
//!
//! The [`Orchestrator`] loads watcher definitions, compiles them against
//! the configured alias and macro tables, spawns the journal feed and runs
//! the dispatcher until a shutdown signal arrives or the feed closes.
//!
//! # Startup Order
//!
//! 1. Metrics recorder (optional)
//! 2. Watcher definitions (YAML) and pattern compilation
//! 3. Publish sink (MQTT or dry-run)
//! 4. Journal feed (`journalctl` child process)
//!
//! Compilation happens before the feed is spawned, so a bad watcher file
//! fails the daemon without ever starting `journalctl`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use ochlero_core::config::OchleroConfig;
use ochlero_watch_pipeline::{
    DispatchStats, Dispatcher, JournalSource, PipelineSummary, Sink, WatchPipelineBuilder, Watcher,
    WatcherLoader,
};

use crate::cli::DaemonCli;
use crate::metrics_server;

/// Load `ochlero.toml`, then apply environment and command-line overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the final
/// configuration is invalid.
pub async fn load_config(cli: &DaemonCli) -> Result<OchleroConfig> {
    let mut config = OchleroConfig::from_file(&cli.config)
        .await
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

/// Load every watcher definition and compile it.
///
/// # Errors
///
/// Any unreadable file, invalid definition or pattern that fails to compile.
pub async fn compile_watchers(
    config: &OchleroConfig,
    sink: Arc<Sink>,
) -> Result<(Vec<Watcher<Sink>>, PipelineSummary)> {
    let path = Path::new(&config.watchers.path);
    let definitions = WatcherLoader::load_path(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load watchers: {}", e))?;

    WatchPipelineBuilder::new(sink)
        .aliases(&config.aliases)
        .macros(&config.macros)
        .definitions(definitions)
        .build_watchers()
        .map_err(|e| anyhow::anyhow!("failed to compile watchers: {}", e))
}

/// Compile everything without touching the journal or the broker.
///
/// Backs the `--validate` flag.
pub async fn validate(config: &OchleroConfig) -> Result<PipelineSummary> {
    let sink = Arc::new(Sink::from_config(&config.mqtt, true));
    let (_, summary) = compile_watchers(config, sink).await?;
    Ok(summary)
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: OchleroConfig,
    dispatcher: Dispatcher<JournalSource, Sink>,
    summary: PipelineSummary,
    sink: String,
}

impl Orchestrator {
    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The metrics recorder cannot be installed
    /// - Watcher files cannot be loaded or compiled
    /// - The journal feed cannot be spawned
    pub async fn build_from_config(config: OchleroConfig, dry_run: bool) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let sink = Arc::new(Sink::from_config(&config.mqtt, dry_run));
        let sink_description = sink.describe();
        tracing::debug!(sink = %sink_description, "publish sink selected");

        let (watchers, summary) = compile_watchers(&config, sink).await?;
        if watchers.is_empty() {
            tracing::warn!(path = %config.watchers.path, "no watchers configured");
        }

        let source = JournalSource::spawn(&config.journal)
            .map_err(|e| anyhow::anyhow!("failed to start journal feed: {}", e))?;

        let dispatcher = Dispatcher::new(source, watchers)
            .with_poll_interval(Duration::from_millis(config.journal.poll_interval_ms));

        tracing::info!(
            watchers = summary.watchers,
            events = summary.events,
            sink = %sink_description,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            dispatcher,
            summary,
            sink: sink_description,
        })
    }

    /// Run until SIGINT/SIGTERM, or until the journal feed closes.
    pub async fn run(&mut self) -> Result<DispatchStats> {
        let shutdown = CancellationToken::new();
        let signal_task = tokio::spawn(cancel_on_signal(shutdown.clone()));

        let result = self.run_until(shutdown).await;
        signal_task.abort();
        result
    }

    /// Run the dispatcher until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal feed closes or fails.
    pub async fn run_until(&mut self, shutdown: CancellationToken) -> Result<DispatchStats> {
        tracing::info!("entering main loop");
        let stats = self
            .dispatcher
            .run(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("dispatcher stopped: {}", e))?;
        tracing::info!(
            entries = stats.entries,
            matched = stats.matched,
            published = stats.published,
            failed = stats.failed,
            "shut down"
        );
        Ok(stats)
    }

    /// Watcher compilation summary.
    pub fn summary(&self) -> PipelineSummary {
        self.summary
    }

    /// Description of the active publish sink.
    pub fn sink(&self) -> &str {
        &self.sink
    }

    /// The loaded configuration.
    pub fn config(&self) -> &OchleroConfig {
        &self.config
    }
}

/// Cancel `shutdown` on SIGTERM or SIGINT.
async fn cancel_on_signal(shutdown: CancellationToken) {
    match wait_for_shutdown_signal().await {
        Ok(signal) => tracing::info!(signal = signal, "shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "signal handler failed, shutting down"),
    }
    shutdown.cancel();
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
