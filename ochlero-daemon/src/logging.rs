//! Logging setup for the `ochlero` binary.
//!
//! Output goes to stderr so that, when ochlero itself runs under systemd,
//! its own log lines land in the journal without being re-read as JSON
//! on stdout. `RUST_LOG` takes precedence over `[general] log_level`.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ochlero_core::config::GeneralConfig;

/// Directives appended to the configured level when `RUST_LOG` is unset.
///
/// rumqttc logs every connect/disconnect at info, once per publish.
const QUIET_DEPENDENCIES: &[&str] = &["rumqttc=warn"];

/// Build the filter: `RUST_LOG` if set, otherwise the configured level.
pub fn env_filter(config: &GeneralConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::new(&config.log_level);
    for directive in QUIET_DEPENDENCIES {
        filter = filter.add_directive(
            directive
                .parse()
                .with_context(|| format!("invalid log directive '{directive}'"))?,
        );
    }
    Ok(filter)
}

/// Install the global subscriber. Call once, before the first event.
///
/// `log_format` is `"json"` (one object per line) or `"pretty"`.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let json = match config.log_format.as_str() {
        "json" => true,
        "pretty" => false,
        other => anyhow::bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let pretty_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let config = GeneralConfig {
            log_level: "info".to_owned(),
            log_format: "xml".to_owned(),
        };
        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn quiet_directives_parse() {
        let config = GeneralConfig {
            log_level: "debug".to_owned(),
            log_format: "pretty".to_owned(),
        };
        assert!(env_filter(&config).is_ok());
    }
}
