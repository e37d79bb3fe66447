//! Configuration loading and typed config structures for the TokenSPICE
//! simulation.
//!
//! The canonical configuration lives in `tokenspice-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Sections this crate does not know about (such as the engine's
//! `scenario`) are ignored here.

use std::path::Path;

use serde::Deserialize;
use tokenspice_ledger::Tolerance;
use tokenspice_ledger::amount::DEFAULT_TOLERANCE_EPSILON;
use tracing::warn;

/// Environment variable overriding `simulation.max_ticks`.
pub const MAX_TICKS_ENV: &str = "TOKENSPICE_MAX_TICKS";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `tokenspice-config.yaml`. All fields have
/// defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Endowments and roundoff tolerance.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Run bounds and failure handling.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `TOKENSPICE_MAX_TICKS` overrides `simulation.max_ticks` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.simulation.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml reads an empty document as null rather than an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, value) in [
            ("economy.initial_usd", self.economy.initial_usd),
            ("economy.initial_ocean", self.economy.initial_ocean),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{label} must be a non-negative number, got {value}"),
                });
            }
        }
        self.economy.tolerance()?;
        if self.simulation.max_ticks == 0 {
            return Err(ConfigError::Invalid {
                reason: "simulation.max_ticks must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Per-agent endowments and the roundoff tolerance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EconomyConfig {
    /// USD given to each agent that does not set its own endowment.
    #[serde(default)]
    pub initial_usd: f64,

    /// OCEAN given to each agent that does not set its own endowment.
    #[serde(default)]
    pub initial_ocean: f64,

    /// Roundoff tolerance for balance comparisons.
    #[serde(default = "default_tolerance_epsilon")]
    pub tolerance_epsilon: f64,
}

impl EconomyConfig {
    /// Build the wallet tolerance from `tolerance_epsilon`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the epsilon is negative or not
    /// finite.
    pub fn tolerance(&self) -> Result<Tolerance, ConfigError> {
        Tolerance::new(self.tolerance_epsilon).map_err(|source| ConfigError::Invalid {
            reason: format!("economy.tolerance_epsilon: {source}"),
        })
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            initial_usd: 0.0,
            initial_ocean: 0.0,
            tolerance_epsilon: default_tolerance_epsilon(),
        }
    }
}

/// What the driver does when an agent's step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepFailurePolicy {
    /// Abort the tick and the run on the first failure.
    #[default]
    FailFast,
    /// Log the failure, record it in the tick summary, and step the
    /// remaining agents.
    CatchAndContinue,
}

/// Simulation boundary parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Number of ticks to run.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Handling of failed agent steps.
    #[serde(default)]
    pub step_failure_policy: StepFailurePolicy,

    /// Fail the tick when the supply check finds an anomaly.
    #[serde(default)]
    pub halt_on_supply_anomaly: bool,

    /// Seed for randomised strategies.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl SimulationBoundsConfig {
    /// Override bounds with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        let Ok(val) = std::env::var(MAX_TICKS_ENV) else {
            return;
        };
        let parsed = val
            .parse::<u64>()
            .inspect_err(|err| warn!(value = %val, %err, "Ignoring unparsable {MAX_TICKS_ENV}"));
        if let Ok(max_ticks) = parsed {
            self.max_ticks = max_ticks;
        }
    }
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            step_failure_policy: StepFailurePolicy::default(),
            halt_on_supply_anomaly: false,
            seed: default_seed(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_tolerance_epsilon() -> f64 {
    DEFAULT_TOLERANCE_EPSILON
}

const fn default_max_ticks() -> u64 {
    100
}

const fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_owned()
}
