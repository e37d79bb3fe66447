//! Bounded simulation loop.
//!
//! [`run_simulation`] wraps the single-tick [`run_tick`] and drives it for
//! a fixed tick budget, notifying a [`TickCallback`] after every tick so
//! reporters can read balances between ticks.
//!
//! [`run_tick`]: crate::tick::run_tick

use tracing::{info, warn};

use crate::state::SimulationState;
use crate::tick::{self, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Step failures swallowed across the whole run.
    pub swallowed_failures: usize,
}

/// Callback invoked after each tick completes.
///
/// The callback receives the tick summary and read-only access to the
/// state, so it can observe balances but never move value.
pub trait TickCallback {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
#[derive(Debug, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run `max_ticks` ticks, invoking `callback` after each.
///
/// # Errors
///
/// Returns [`RunnerError::Tick`] as soon as a tick fails. Ticks completed
/// before the failure keep their effects.
pub fn run_simulation(
    state: &mut SimulationState,
    max_ticks: u64,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;
    let mut swallowed_failures: usize = 0;

    info!(
        max_ticks,
        agents = state.len(),
        start_tick = state.tick(),
        "Simulation starting"
    );

    while total_ticks < max_ticks {
        let summary = tick::run_tick(state)?;
        total_ticks = total_ticks.saturating_add(1);
        swallowed_failures = swallowed_failures.saturating_add(summary.failures.len());

        callback.on_tick(&summary, state);
        last_summary = Some(summary);
    }

    info!(tick = state.tick(), max_ticks, "Tick limit reached");

    Ok(SimulationResult {
        final_summary: last_summary,
        total_ticks,
        swallowed_failures,
    })
}

/// Log the simulation end sequence, including each agent's final balances.
pub fn log_simulation_end(result: &SimulationResult, state: &SimulationState) {
    info!(
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        swallowed_failures = result.swallowed_failures,
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            agents_stepped = summary.agents_stepped,
            balanced = summary.conservation.is_balanced(),
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }

    for snapshot in state.snapshots() {
        info!(
            agent = %snapshot.agent,
            usd = snapshot.usd,
            ocean = snapshot.ocean,
            total_usd_deposited = snapshot.total_usd_deposited,
            total_ocean_deposited = snapshot.total_ocean_deposited,
            "Final balances"
        );
    }
}
