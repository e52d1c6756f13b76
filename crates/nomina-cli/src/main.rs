use anyhow::Result;
use clap::Parser;
use nomina_cli::cli::Cli;
use nomina_cli::config::{ConfigSource, NominaConfig};
use nomina_cli::logging;
use tracing::{debug, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, source) = NominaConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose)?;

    match &source {
        ConfigSource::File(path) => debug!(path = %path.display(), "configuration loaded"),
        ConfigSource::Defaults(path) => warn!(
            "Configuration file '{}' not found. Using default configuration.",
            path.display()
        ),
    }
    debug!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "starting nomina");

    nomina_cli::run(&cli, &config)
}
