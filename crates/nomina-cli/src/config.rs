use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nomina_calculator::EvaluationLimits;
use nomina_core::PayrollConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_VAR: &str = "NOMINA_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "nomina.toml";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EvaluationConfig {
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { max_nodes: default_max_nodes(), max_steps: default_max_steps() }
    }
}

impl EvaluationConfig {
    pub fn limits(&self) -> EvaluationLimits {
        EvaluationLimits { max_nodes: self.max_nodes, max_steps: self.max_steps }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PayrollSettings {
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    /// Defaults to the number of CPUs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self { parallel_threshold: default_parallel_threshold(), max_workers: None }
    }
}

impl PayrollSettings {
    pub fn payroll_config(&self) -> PayrollConfig {
        let defaults = PayrollConfig::default();
        PayrollConfig {
            parallel_threshold: self.parallel_threshold,
            max_workers: self.max_workers.unwrap_or(defaults.max_workers).max(1),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter(), format: LogFormat::default() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NominaConfig {
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub payroll: PayrollSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file did not exist; built-in defaults are in use
    Defaults(PathBuf),
}

impl NominaConfig {
    /// Loads the configuration from `path`, or from `NOMINA_CONFIG_PATH`, or from
    /// `nomina.toml`, then applies environment overrides. A missing file yields
    /// the defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => std::env::var(CONFIG_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        if !path.exists() {
            return Ok((Self::default().apply_env_overrides(), ConfigSource::Defaults(path)));
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading configuration file '{}'", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("parsing configuration file '{}'", path.display()))?;
        Ok((config.apply_env_overrides(), ConfigSource::File(path)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `NOMINA_*` environment overrides. Unparsable values are ignored.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(max_steps) = env_number("NOMINA_MAX_STEPS") {
            self.evaluation.max_steps = max_steps;
        }
        if let Some(max_nodes) = env_number("NOMINA_MAX_NODES") {
            self.evaluation.max_nodes = max_nodes;
        }
        if let Some(threshold) = env_number("NOMINA_PARALLEL_THRESHOLD") {
            self.payroll.parallel_threshold = threshold;
        }
        if let Some(workers) = env_number("NOMINA_MAX_WORKERS") {
            self.payroll.max_workers = Some(workers);
        }
        self
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn env_number(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

fn default_max_nodes() -> usize {
    EvaluationLimits::default().max_nodes
}
fn default_max_steps() -> usize {
    EvaluationLimits::default().max_steps
}
fn default_parallel_threshold() -> usize {
    PayrollConfig::default().parallel_threshold
}
fn default_log_filter() -> String {
    "info".to_string()
}
