//! The `nomina` command-line front end.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::{Cli, Command};
use crate::commands::CommandOutput;
use crate::config::NominaConfig;

/// Runs the parsed command. Output goes to stdout, or to `--output` for
/// payroll reports. A command that completed but did not succeed (a failed
/// evaluation, an invalid formula, unpaid classes under `--strict`) is an error
/// after its output has been written.
pub fn run(cli: &Cli, config: &NominaConfig) -> Result<()> {
    let limits = config.evaluation.limits();
    let (output, destination) = match &cli.command {
        Command::Evaluate { formula, context } => {
            (commands::evaluate(formula, context, limits, cli.format)?, None)
        }
        Command::Validate { formula } => {
            (commands::validate_formulas(formula, limits, cli.format)?, None)
        }
        Command::Payroll { formulas, classes, output, strict } => (
            commands::payroll(formulas, classes, config, cli.format, *strict)?,
            output.as_deref(),
        ),
        Command::Config => (commands::show_config(config)?, None),
    };

    let CommandOutput { body, failure } = output;
    match destination {
        Some(path) => {
            fs::write(path, &body)
                .with_context(|| format!("writing report to '{}'", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{body}"),
    }

    if let Some(failure) = failure {
        bail!(failure);
    }
    Ok(())
}
