//! Engine binary for the TokenSPICE simulation.
//!
//! Wires together configuration, the scenario, and the tick loop, then
//! reports every agent's final balances.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tokenspice-config.yaml` (or the path in
//!    `TOKENSPICE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the scenario's agents, optionally on an in-process ledger
//! 4. Run the simulation loop for `simulation.max_ticks` ticks
//! 5. Log the result and check ledger-backed wallets for drift

mod error;
mod scenario;

use std::path::PathBuf;

use tokenspice_core::config::{LoggingConfig, SimulationConfig};
use tokenspice_core::recorder::BalanceRecorder;
use tokenspice_core::runner;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "TOKENSPICE_CONFIG";

/// Config file used when `TOKENSPICE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "tokenspice-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);

    info!(
        path = %config_path.display(),
        max_ticks = config.simulation.max_ticks,
        step_failure_policy = ?config.simulation.step_failure_policy,
        seed = config.simulation.seed,
        tolerance_epsilon = config.economy.tolerance_epsilon,
        "tokenspice-engine starting"
    );

    // 3. Build the scenario.
    let scenario_config = scenario::load_scenario(&config_path)?;
    let mut built = scenario::build_scenario(&config, &scenario_config)?;

    // 4. Run the simulation.
    let mut recorder = BalanceRecorder::new();
    let result = runner::run_simulation(
        &mut built.state,
        config.simulation.max_ticks,
        &mut recorder,
    )
    .map_err(EngineError::from)?;

    // 5. Log results.
    runner::log_simulation_end(&result, &built.state);

    if built.ledger.is_some() {
        for name in built.state.agent_names() {
            let agent = built.state.get_agent(name).map_err(EngineError::from)?;
            agent.wallet().verify_ledger_sync().map_err(EngineError::from)?;
        }
        info!("Ledger balances match local wallets");
    }

    info!(
        total_ticks = result.total_ticks,
        snapshots = recorder.snapshots().len(),
        "tokenspice-engine shutdown complete"
    );

    Ok(())
}

/// Resolve the config path from `TOKENSPICE_CONFIG` or the default.
fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the simulation configuration, falling back to defaults when the
/// file does not exist.
fn load_config(path: &std::path::Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        let mut config = SimulationConfig::default();
        config.simulation.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let (filter, bad_level) = EnvFilter::try_from_default_env().map_or_else(
        |_| {
            EnvFilter::try_new(&logging.level)
                .map_or_else(|_| (EnvFilter::new("info"), true), |filter| (filter, false))
        },
        |filter| (filter, false),
    );

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    if bad_level {
        warn!(level = %logging.level, "Unusable log level in config, using info");
    }
}
