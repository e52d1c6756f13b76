use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Instructor payment formulas and payroll runs
#[derive(Parser, Debug)]
#[command(name = "nomina", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Configuration file (defaults to $NOMINA_CONFIG_PATH or nomina.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one formula against one class
    Evaluate {
        /// Formula JSON file
        #[arg(long)]
        formula: PathBuf,

        /// Class context JSON file (reservaciones, capacidad, categoria, ...)
        #[arg(long)]
        context: PathBuf,
    },

    /// Check that formulas are well formed
    Validate {
        /// Formula JSON file: one formula or an array of formulas
        #[arg(long)]
        formula: PathBuf,
    },

    /// Pay a batch of classes
    Payroll {
        /// Formula assignments JSON file (disciplinaId, periodoId, formula)
        #[arg(long)]
        formulas: PathBuf,

        /// Class records JSON file
        #[arg(long)]
        classes: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Exit with an error if any class could not be paid
        #[arg(long)]
        strict: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
