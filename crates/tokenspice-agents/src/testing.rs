//! In-crate step context for unit tests.

use std::collections::BTreeMap;

use crate::agent::{Agent, AgentBase, StepContext};
use crate::error::AgentError;

/// Minimal registry of bare agents, stepping at a settable tick.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) tick: u64,
    pub(crate) agents: BTreeMap<String, AgentBase>,
}

impl Registry {
    /// A registry holding one bare agent per `(name, usd, ocean)`.
    pub(crate) fn with_agents(agents: &[(&str, f64, f64)]) -> Result<Self, AgentError> {
        let mut registry = Self::default();
        for &(name, usd, ocean) in agents {
            registry
                .agents
                .insert(name.to_owned(), AgentBase::new(name, usd, ocean)?);
        }
        Ok(registry)
    }

    /// The named agent's wallet view, if registered.
    pub(crate) fn base(&self, name: &str) -> Option<&AgentBase> {
        self.agents.get(name)
    }
}

impl StepContext for Registry {
    fn tick(&self) -> u64 {
        self.tick
    }

    fn agent_names(&self) -> Vec<String> {
        self.agents.keys().cloned().collect()
    }

    fn agent(&self, name: &str) -> Result<&dyn Agent, AgentError> {
        self.agents
            .get(name)
            .map(|agent| agent as &dyn Agent)
            .ok_or_else(|| AgentError::NotFound(name.to_owned()))
    }

    fn agent_mut(&mut self, name: &str) -> Result<&mut dyn Agent, AgentError> {
        self.agents
            .get_mut(name)
            .map(|agent| agent as &mut dyn Agent)
            .ok_or_else(|| AgentError::NotFound(name.to_owned()))
    }
}
