//! The name-keyed agent registry that the tick cycle drives.
//!
//! [`SimulationState`] owns every agent and the clock. Agents are stepped
//! in registration order. During its own step an agent is lent out of its
//! registry slot, so the state it receives as a [`StepContext`] can hand
//! out every *other* agent mutably without aliasing the one that is
//! running.

use std::collections::BTreeMap;

use tokenspice_agents::{Agent, AgentError, StepContext};
use tokenspice_ledger::{SupplyFlows, Tolerance};
use tokenspice_types::{BalanceSnapshot, Resource};
use tracing::debug;

use crate::clock::SimClock;
use crate::config::{SimulationConfig, StepFailurePolicy};
use crate::tick::{self, TickError, TickSummary};

/// Registry of agents plus the global parameters fixed at construction.
#[derive(Debug, Default)]
pub struct SimulationState {
    clock: SimClock,
    /// `None` while the agent is executing its own step.
    agents: BTreeMap<String, Option<Box<dyn Agent>>>,
    /// Registration order, which is also stepping order.
    order: Vec<String>,
    tolerance: Tolerance,
    step_failure_policy: StepFailurePolicy,
    halt_on_supply_anomaly: bool,
}

impl SimulationState {
    /// Create an empty state at tick 0 with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty state with parameters taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::config::ConfigError::Invalid`] if the configured
    /// tolerance is unusable.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new()
            .with_tolerance(config.economy.tolerance()?)
            .with_step_failure_policy(config.simulation.step_failure_policy)
            .with_halt_on_supply_anomaly(config.simulation.halt_on_supply_anomaly))
    }

    /// Set the tolerance used by the per-tick supply check.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set how a failed agent step is handled.
    #[must_use]
    pub const fn with_step_failure_policy(mut self, policy: StepFailurePolicy) -> Self {
        self.step_failure_policy = policy;
        self
    }

    /// Fail the tick, rather than only logging, on a supply anomaly.
    #[must_use]
    pub const fn with_halt_on_supply_anomaly(mut self, halt: bool) -> Self {
        self.halt_on_supply_anomaly = halt;
        self
    }

    /// Register an agent. It will be stepped after every agent already
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateName`] if the name is taken. The
    /// registry is left unchanged.
    pub fn add_agent(&mut self, agent: impl Agent + 'static) -> Result<(), AgentError> {
        self.add_boxed_agent(Box::new(agent))
    }

    /// Register an already boxed agent.
    pub fn add_boxed_agent(&mut self, agent: Box<dyn Agent>) -> Result<(), AgentError> {
        let name = agent.name().to_owned();
        if self.agents.contains_key(&name) {
            return Err(AgentError::DuplicateName(name));
        }
        debug!(agent = %name, "Agent registered");
        self.order.push(name.clone());
        self.agents.insert(name, Some(agent));
        Ok(())
    }

    /// Look up an agent by name.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotFound`] if no agent has this name, or
    /// [`AgentError::AgentBusy`] if it is the agent currently stepping.
    pub fn get_agent(&self, name: &str) -> Result<&dyn Agent, AgentError> {
        match self.agents.get(name) {
            None => Err(AgentError::NotFound(name.to_owned())),
            Some(None) => Err(AgentError::AgentBusy(name.to_owned())),
            Some(Some(agent)) => Ok(agent.as_ref()),
        }
    }

    /// Look up an agent by name for mutation.
    pub fn get_agent_mut(&mut self, name: &str) -> Result<&mut dyn Agent, AgentError> {
        match self.agents.get_mut(name) {
            None => Err(AgentError::NotFound(name.to_owned())),
            Some(None) => Err(AgentError::AgentBusy(name.to_owned())),
            Some(Some(agent)) => Ok(agent.as_mut()),
        }
    }

    /// Unregister an agent and hand it back to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotFound`] if no agent has this name, or
    /// [`AgentError::AgentBusy`] if it is mid-step.
    pub fn remove_agent(&mut self, name: &str) -> Result<Box<dyn Agent>, AgentError> {
        match self.agents.get(name) {
            None => return Err(AgentError::NotFound(name.to_owned())),
            Some(None) => return Err(AgentError::AgentBusy(name.to_owned())),
            Some(Some(_)) => {}
        }
        let agent = self
            .agents
            .remove(name)
            .flatten()
            .ok_or_else(|| AgentError::NotFound(name.to_owned()))?;
        self.order.retain(|registered| registered != name);
        debug!(agent = %name, "Agent removed");
        Ok(agent)
    }

    /// Names of all registered agents, in stepping order.
    pub fn agent_names(&self) -> &[String] {
        &self.order
    }

    /// Number of registered agents.
    pub const fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no agent is registered.
    pub const fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ticks completed so far (0 before the first step).
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The tolerance used by the supply check.
    pub const fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// How failed agent steps are handled.
    pub const fn step_failure_policy(&self) -> StepFailurePolicy {
        self.step_failure_policy
    }

    /// Whether a supply anomaly fails the tick.
    pub const fn halt_on_supply_anomaly(&self) -> bool {
        self.halt_on_supply_anomaly
    }

    /// Advance one tick: step every agent once, in registration order.
    ///
    /// # Errors
    ///
    /// See [`tick::run_tick`].
    pub fn take_step(&mut self) -> Result<TickSummary, TickError> {
        tick::run_tick(self)
    }

    /// Aggregate supply figures per resource across all resident agents.
    pub fn supply(&self) -> BTreeMap<Resource, SupplyFlows> {
        let mut totals: BTreeMap<Resource, SupplyFlows> = BTreeMap::new();
        for agent in self.agents.values().flatten() {
            for resource in Resource::ALL {
                totals
                    .entry(resource)
                    .or_default()
                    .absorb(agent.wallet().supply(resource));
            }
        }
        totals
    }

    /// Sum of `resource` balances across all resident agents.
    pub fn total_balance(&self, resource: Resource) -> f64 {
        self.agents
            .values()
            .flatten()
            .map(|agent| agent.balance(resource))
            .sum()
    }

    /// Read-only balance view of every agent at the current tick, in
    /// stepping order.
    pub fn snapshots(&self) -> Vec<BalanceSnapshot> {
        let tick = self.tick();
        self.order
            .iter()
            .filter_map(|name| self.get_agent(name).ok())
            .map(|agent| BalanceSnapshot {
                tick,
                agent: agent.name().to_owned(),
                usd: agent.balance(Resource::Usd),
                ocean: agent.balance(Resource::Ocean),
                total_usd_deposited: agent.total_deposited(Resource::Usd),
                total_ocean_deposited: agent.total_deposited(Resource::Ocean),
            })
            .collect()
    }

    pub(crate) const fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    /// Take an agent out of its slot for the duration of its step.
    pub(crate) fn lend(&mut self, name: &str) -> Result<Box<dyn Agent>, AgentError> {
        self.agents
            .get_mut(name)
            .ok_or_else(|| AgentError::NotFound(name.to_owned()))?
            .take()
            .ok_or_else(|| AgentError::AgentBusy(name.to_owned()))
    }

    /// Put a lent agent back into its slot.
    pub(crate) fn restore(&mut self, agent: Box<dyn Agent>) {
        if let Some(slot) = self.agents.get_mut(agent.name()) {
            *slot = Some(agent);
        }
    }
}

impl StepContext for SimulationState {
    fn tick(&self) -> u64 {
        self.clock.tick()
    }

    fn agent_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn agent(&self, name: &str) -> Result<&dyn Agent, AgentError> {
        self.get_agent(name)
    }

    fn agent_mut(&mut self, name: &str) -> Result<&mut dyn Agent, AgentError> {
        self.get_agent_mut(name)
    }
}
