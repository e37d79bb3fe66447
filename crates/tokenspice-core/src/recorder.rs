//! Per-tick balance history.

use tokenspice_types::BalanceSnapshot;

use crate::runner::TickCallback;
use crate::state::SimulationState;
use crate::tick::TickSummary;

/// Records every agent's balances after every tick.
///
/// Snapshots are stored in tick order, and within a tick in stepping
/// order. The recorder only ever reads the state.
#[derive(Debug, Default)]
pub struct BalanceRecorder {
    snapshots: Vec<BalanceSnapshot>,
}

impl BalanceRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the current balances of every agent in `state`.
    pub fn record(&mut self, state: &SimulationState) {
        self.snapshots.extend(state.snapshots());
    }

    /// Every snapshot recorded so far.
    pub fn snapshots(&self) -> &[BalanceSnapshot] {
        &self.snapshots
    }

    /// Snapshots of one agent, oldest first.
    pub fn history<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = &'a BalanceSnapshot> {
        self.snapshots
            .iter()
            .filter(move |snapshot| snapshot.agent == agent)
    }

    /// The most recent snapshot of one agent.
    pub fn latest(&self, agent: &str) -> Option<&BalanceSnapshot> {
        self.snapshots
            .iter()
            .rev()
            .find(|snapshot| snapshot.agent == agent)
    }
}

impl TickCallback for BalanceRecorder {
    fn on_tick(&mut self, _summary: &TickSummary, state: &SimulationState) {
        self.record(state);
    }
}
