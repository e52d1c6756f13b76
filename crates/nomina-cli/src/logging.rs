use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// command output.
///
/// `RUST_LOG` wins over the configured filter; `--verbose` raises the
/// configured filter to `debug`.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let configured = if verbose { "debug" } else { config.filter.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .map_err(|e| anyhow!("invalid log filter '{configured}': {e}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    }
    .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}
