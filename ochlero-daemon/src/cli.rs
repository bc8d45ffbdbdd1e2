//! CLI argument definitions for the `ochlero` binary.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use ochlero_core::config::OchleroConfig;

/// Watch the systemd journal and publish templated events to MQTT.
///
/// Watchers are loaded from YAML files; each watcher filters journal
/// entries by unit or command and republishes matching messages.
#[derive(Parser, Debug)]
#[command(name = "ochlero")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to the ochlero.toml configuration file.
    #[arg(short, long, default_value = "/etc/ochlero/ochlero.toml")]
    pub config: PathBuf,

    /// Verbose output (forces the debug log level).
    #[arg(short, long)]
    pub verbose: bool,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Load the configuration, compile every watcher, print a summary and exit.
    #[arg(long)]
    pub validate: bool,

    /// Log rendered messages instead of publishing them.
    #[arg(long)]
    pub dry_run: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the file and environment values.
    pub fn apply_overrides(&self, config: &mut OchleroConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if self.verbose {
            config.general.log_level = "debug".to_owned();
        }
    }
}
