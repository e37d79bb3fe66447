//! Fixed-split routing of incoming funds.

use tokenspice_types::Resource;
use tracing::debug;

use crate::agent::{Agent, AgentBase, StepContext};
use crate::error::AgentError;

/// Forwards its entire USD and OCEAN balances to recipients each tick.
///
/// Every recipient gets a fixed fraction of the balance held at the start
/// of the step. The last recipient receives whatever is left, so the
/// router never retains roundoff dust.
#[derive(Debug)]
pub struct RouterAgent {
    base: AgentBase,
    recipients: Vec<(String, f64)>,
}

impl RouterAgent {
    /// Create a router splitting by `(recipient, fraction)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] if there are no recipients,
    /// a fraction lies outside `[0, 1]`, a recipient is the router
    /// itself, or the fractions do not sum to 1.
    pub fn new(base: AgentBase, recipients: Vec<(String, f64)>) -> Result<Self, AgentError> {
        if recipients.is_empty() {
            return Err(AgentError::InvalidArgument {
                reason: "router needs at least one recipient".to_owned(),
            });
        }
        for (name, fraction) in &recipients {
            if !(0.0..=1.0).contains(fraction) {
                return Err(AgentError::InvalidArgument {
                    reason: format!("fraction {fraction} for {name} is outside [0, 1]"),
                });
            }
            if name == base.name() {
                return Err(AgentError::InvalidArgument {
                    reason: format!("router {name} cannot route to itself"),
                });
            }
        }
        let total: f64 = recipients.iter().map(|(_, fraction)| fraction).sum();
        if !base.wallet().tolerance().approx_eq(total, 1.0) {
            return Err(AgentError::InvalidArgument {
                reason: format!("router fractions sum to {total}, expected 1"),
            });
        }
        Ok(Self { base, recipients })
    }

    /// The configured `(recipient, fraction)` pairs.
    pub fn recipients(&self) -> &[(String, f64)] {
        &self.recipients
    }

    fn route(&mut self, ctx: &mut dyn StepContext, resource: Resource) -> Result<(), AgentError> {
        let total = self.balance(resource);
        if self.wallet().tolerance().is_zero(total) {
            return Ok(());
        }

        let recipients = self.recipients.clone();
        let last = recipients.len().saturating_sub(1);
        for (index, (name, fraction)) in recipients.iter().enumerate() {
            let amount = if index == last {
                self.balance(resource)
            } else {
                total * fraction
            };
            self.send_to(ctx, resource, Some(name.as_str()), amount)?;
        }
        debug!(tick = ctx.tick(), router = self.name(), %resource, total, "Funds routed");
        Ok(())
    }
}

impl Agent for RouterAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn take_step(&mut self, ctx: &mut dyn StepContext) -> Result<(), AgentError> {
        for resource in Resource::ALL {
            self.route(ctx, resource)?;
        }
        Ok(())
    }
}
