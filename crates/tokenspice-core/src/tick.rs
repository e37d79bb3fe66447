//! The single-tick cycle.
//!
//! [`run_tick`] advances the clock, then steps every registered agent once
//! in registration order, then checks that the total supply of each
//! resource moved only through external flows. Each agent sees the effects
//! of the agents stepped before it in the same tick.
//!
//! A failing step aborts the tick under
//! [`StepFailurePolicy::FailFast`]. Under
//! [`StepFailurePolicy::CatchAndContinue`] the failure is logged and
//! recorded, and the remaining agents still step. Transfers a failing step
//! completed before it failed stay applied in both modes.

use tokenspice_agents::AgentError;
use tokenspice_ledger::conservation::verify_supply;
use tokenspice_ledger::{ConservationResult, SupplyAnomaly};
use tracing::{debug, error, info, warn};

use crate::clock::ClockError;
use crate::config::StepFailurePolicy;
use crate::state::SimulationState;

/// Errors that abort a tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The clock could not advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// An agent's step failed under the fail-fast policy.
    #[error("agent {agent} failed its step: {source}")]
    Agent {
        /// The agent whose step failed.
        agent: String,
        /// The underlying agent error.
        source: AgentError,
    },

    /// Supply changed without a matching external flow and the state is
    /// configured to halt on anomalies.
    #[error("{anomaly}")]
    SupplyAnomaly {
        /// The detected anomaly.
        anomaly: SupplyAnomaly,
    },
}

/// A step failure swallowed under [`StepFailurePolicy::CatchAndContinue`].
#[derive(Debug)]
pub struct StepFailure {
    /// The agent whose step failed.
    pub agent: String,
    /// What went wrong.
    pub error: AgentError,
}

/// What happened during one tick.
#[derive(Debug)]
pub struct TickSummary {
    /// The tick that was executed.
    pub tick: u64,
    /// Agents whose step ran, successful or not.
    pub agents_stepped: usize,
    /// Failures swallowed by the catch-and-continue policy.
    pub failures: Vec<StepFailure>,
    /// Outcome of the end-of-tick supply check.
    pub conservation: ConservationResult,
}

/// Execute one tick against `state`.
///
/// # Errors
///
/// Returns [`TickError::Clock`] if the tick counter would overflow,
/// [`TickError::Agent`] for the first failed step under the fail-fast
/// policy, or [`TickError::SupplyAnomaly`] when the supply check fails and
/// the state halts on anomalies.
pub fn run_tick(state: &mut SimulationState) -> Result<TickSummary, TickError> {
    let supply_before = state.supply();

    let tick = state.clock_mut().advance()?;
    info!(tick, agents = state.len(), "Tick started");

    let order = state.agent_names().to_vec();
    let mut agents_stepped: usize = 0;
    let mut failures = Vec::new();

    for name in order {
        // The order vector and the registry change together, so every name
        // here is registered and idle.
        let mut agent = state.lend(&name).map_err(|source| TickError::Agent {
            agent: name.clone(),
            source,
        })?;
        let result = agent.take_step(state);
        state.restore(agent);
        agents_stepped = agents_stepped.saturating_add(1);

        match result {
            Ok(()) => debug!(tick, agent = %name, "Agent stepped"),
            Err(source) => match state.step_failure_policy() {
                StepFailurePolicy::FailFast => {
                    return Err(TickError::Agent { agent: name, source });
                }
                StepFailurePolicy::CatchAndContinue => {
                    warn!(tick, agent = %name, err = %source, "Agent step failed, continuing");
                    failures.push(StepFailure {
                        agent: name,
                        error: source,
                    });
                }
            },
        }
    }

    let conservation = verify_supply(tick, &supply_before, &state.supply(), state.tolerance());
    if let ConservationResult::Anomaly(anomaly) = &conservation {
        error!(tick, imbalances = ?anomaly.imbalances, "{}", anomaly.message);
        if state.halt_on_supply_anomaly() {
            return Err(TickError::SupplyAnomaly {
                anomaly: anomaly.clone(),
            });
        }
    }

    info!(
        tick,
        agents_stepped,
        failures = failures.len(),
        "Tick completed"
    );

    Ok(TickSummary {
        tick,
        agents_stepped,
        failures,
        conservation,
    })
}
