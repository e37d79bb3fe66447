//! Grant flows: a granter paying out OCEAN and a taker spending it.

use tokenspice_types::Resource;
use tracing::debug;

use crate::agent::{Agent, AgentBase, StepContext};
use crate::error::AgentError;

/// Pays its OCEAN out to one receiver in equal installments.
///
/// The first grant goes out on the first step. After that, one grant every
/// `ticks_between_grants` ticks until `n_grants` have been made. Each
/// grant is the current OCEAN balance divided by the grants remaining, so
/// the last grant empties the wallet.
#[derive(Debug)]
pub struct GrantGivingAgent {
    base: AgentBase,
    receiving_agent: String,
    ticks_between_grants: u64,
    n_grants: u32,
    grants_made: u32,
    last_grant_tick: Option<u64>,
}

impl GrantGivingAgent {
    /// Create a granter paying `receiving_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] if `ticks_between_grants` or
    /// `n_grants` is zero.
    pub fn new(
        base: AgentBase,
        receiving_agent: impl Into<String>,
        ticks_between_grants: u64,
        n_grants: u32,
    ) -> Result<Self, AgentError> {
        if ticks_between_grants == 0 || n_grants == 0 {
            return Err(AgentError::InvalidArgument {
                reason: "grant interval and grant count must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            base,
            receiving_agent: receiving_agent.into(),
            ticks_between_grants,
            n_grants,
            grants_made: 0,
            last_grant_tick: None,
        })
    }

    /// Number of grants paid so far.
    pub const fn grants_made(&self) -> u32 {
        self.grants_made
    }

    fn grant_due(&self, tick: u64) -> bool {
        if self.grants_made >= self.n_grants {
            return false;
        }
        self.last_grant_tick
            .is_none_or(|last| tick.saturating_sub(last) >= self.ticks_between_grants)
    }
}

impl Agent for GrantGivingAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn take_step(&mut self, ctx: &mut dyn StepContext) -> Result<(), AgentError> {
        let tick = ctx.tick();
        if !self.grant_due(tick) {
            return Ok(());
        }

        let remaining = self.n_grants.saturating_sub(self.grants_made).max(1);
        let amount = self.balance(Resource::Ocean) / f64::from(remaining);
        let receiver = self.receiving_agent.clone();
        self.send_to(ctx, Resource::Ocean, Some(receiver.as_str()), amount)?;

        self.grants_made = self.grants_made.saturating_add(1);
        self.last_grant_tick = Some(tick);
        debug!(tick, granter = self.name(), %receiver, amount, "Grant paid");
        Ok(())
    }
}

/// Spends whatever OCEAN it was granted.
///
/// Each step it records the OCEAN that arrived since its previous step,
/// then forwards its whole OCEAN balance to `spend_to`, or burns it when no
/// destination is set.
#[derive(Debug)]
pub struct GrantTakingAgent {
    base: AgentBase,
    spend_to: Option<String>,
    seen_ocean_deposited: f64,
    received_last_step: f64,
    total_spent: f64,
}

impl GrantTakingAgent {
    /// Create a taker spending into `spend_to` (burning when `None`).
    pub const fn new(base: AgentBase, spend_to: Option<String>) -> Self {
        let seen_ocean_deposited = base.wallet().total_deposited(Resource::Ocean);
        Self {
            base,
            spend_to,
            seen_ocean_deposited,
            received_last_step: 0.0,
            total_spent: 0.0,
        }
    }

    /// OCEAN received between the previous step and the latest one.
    pub const fn received_last_step(&self) -> f64 {
        self.received_last_step
    }

    /// Total OCEAN spent so far.
    pub const fn total_spent(&self) -> f64 {
        self.total_spent
    }
}

impl Agent for GrantTakingAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn take_step(&mut self, ctx: &mut dyn StepContext) -> Result<(), AgentError> {
        let deposited = self.total_deposited(Resource::Ocean);
        self.received_last_step = deposited - self.seen_ocean_deposited;
        self.seen_ocean_deposited = deposited;

        let amount = self.balance(Resource::Ocean);
        if self.wallet().tolerance().is_zero(amount) {
            return Ok(());
        }

        let destination = self.spend_to.clone();
        self.send_to(ctx, Resource::Ocean, destination.as_deref(), amount)?;
        self.total_spent += amount;
        debug!(tick = ctx.tick(), taker = self.name(), amount, "Grant spent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use tokenspice_ledger::Tolerance;

    use super::*;
    use crate::testing::Registry;

    #[test]
    fn zero_interval_or_count_is_rejected() {
        let base = || AgentBase::new("granter", 0.0, 10.0).unwrap();
        assert!(GrantGivingAgent::new(base(), "taker", 0, 3).is_err());
        assert!(GrantGivingAgent::new(base(), "taker", 1, 0).is_err());
    }

    #[test]
    fn grants_follow_the_interval_and_empty_the_wallet() {
        let mut registry = Registry::with_agents(&[("taker", 0.0, 0.0)]).unwrap();
        let base = AgentBase::new("granter", 0.0, 100.0).unwrap();
        let mut granter = GrantGivingAgent::new(base, "taker", 2, 3).unwrap();

        let mut made = Vec::new();
        for tick in 1..=6 {
            registry.tick = tick;
            granter.take_step(&mut registry).unwrap();
            made.push(granter.grants_made());
        }

        // Ticks 1, 3 and 5 pay out; the third grant takes the remainder.
        assert_eq!(made, vec![1, 1, 2, 2, 3, 3]);
        assert_eq!(granter.balance(Resource::Ocean), 0.0);
        let received = registry.base("taker").unwrap().balance(Resource::Ocean);
        assert!(Tolerance::default().approx_eq(received, 100.0));
    }

    #[test]
    fn granter_with_a_missing_receiver_fails_without_paying() {
        let mut registry = Registry::default();
        let base = AgentBase::new("granter", 0.0, 10.0).unwrap();
        let mut granter = GrantGivingAgent::new(base, "nobody", 1, 2).unwrap();
        registry.tick = 1;
        assert!(matches!(
            granter.take_step(&mut registry),
            Err(AgentError::NotFound(_))
        ));
        assert_eq!(granter.grants_made(), 0);
        assert_eq!(granter.balance(Resource::Ocean), 10.0);
    }

    #[test]
    fn taker_tracks_receipts_and_forwards_them() {
        let mut registry = Registry::with_agents(&[("sink", 0.0, 0.0)]).unwrap();
        let base = AgentBase::new("taker", 0.0, 0.0).unwrap();
        let mut taker = GrantTakingAgent::new(base, Some("sink".to_owned()));

        taker.receive(Resource::Ocean, 30.0).unwrap();
        taker.take_step(&mut registry).unwrap();
        assert_eq!(taker.received_last_step(), 30.0);
        assert_eq!(taker.total_spent(), 30.0);
        assert_eq!(taker.balance(Resource::Ocean), 0.0);

        taker.take_step(&mut registry).unwrap();
        assert_eq!(taker.received_last_step(), 0.0);
        assert_eq!(taker.total_spent(), 30.0);

        taker.receive(Resource::Ocean, 5.0).unwrap();
        taker.take_step(&mut registry).unwrap();
        assert_eq!(taker.received_last_step(), 5.0);
        assert_eq!(taker.total_spent(), 35.0);
        assert_eq!(registry.base("sink").unwrap().balance(Resource::Ocean), 35.0);
    }

    #[test]
    fn taker_without_destination_burns_its_endowment() {
        let mut registry = Registry::default();
        let base = AgentBase::new("taker", 0.0, 10.0).unwrap();
        let mut taker = GrantTakingAgent::new(base, None);

        taker.take_step(&mut registry).unwrap();
        // The endowment predates the first step and is not a receipt.
        assert_eq!(taker.received_last_step(), 0.0);
        assert_eq!(taker.total_spent(), 10.0);
        assert_eq!(taker.wallet().drained(Resource::Ocean), 10.0);
    }
}
