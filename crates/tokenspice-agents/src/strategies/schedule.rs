//! Scripted transfers on fixed ticks.

use serde::Deserialize;
use tokenspice_types::Resource;

use crate::agent::{Agent, AgentBase, StepContext};
use crate::error::AgentError;

/// One scripted transfer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduledTransfer {
    /// Tick on which the transfer executes.
    pub tick: u64,
    /// Resource to move.
    pub resource: Resource,
    /// Receiving agent, or `None` to burn.
    #[serde(default)]
    pub destination: Option<String>,
    /// Amount to move.
    pub amount: f64,
}

/// Executes a fixed script of transfers.
///
/// On each tick every transfer scheduled for that tick runs, in script
/// order. An agent with an empty script simply holds its balances.
#[derive(Debug)]
pub struct ScheduledTransferAgent {
    base: AgentBase,
    schedule: Vec<ScheduledTransfer>,
}

impl ScheduledTransferAgent {
    /// Create an agent running `schedule`.
    pub const fn new(base: AgentBase, schedule: Vec<ScheduledTransfer>) -> Self {
        Self { base, schedule }
    }

    /// Create an agent that never moves funds on its own.
    pub const fn passive(base: AgentBase) -> Self {
        Self::new(base, Vec::new())
    }

    /// The script.
    pub fn schedule(&self) -> &[ScheduledTransfer] {
        &self.schedule
    }
}

impl Agent for ScheduledTransferAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn take_step(&mut self, ctx: &mut dyn StepContext) -> Result<(), AgentError> {
        let tick = ctx.tick();
        let due: Vec<ScheduledTransfer> = self
            .schedule
            .iter()
            .filter(|transfer| transfer.tick == tick)
            .cloned()
            .collect();
        for transfer in due {
            self.send_to(
                ctx,
                transfer.resource,
                transfer.destination.as_deref(),
                transfer.amount,
            )?;
        }
        Ok(())
    }
}
