//! Seeded random transfers between agents.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokenspice_types::Resource;
use tracing::debug;

use crate::agent::{Agent, AgentBase, StepContext};
use crate::error::AgentError;

/// Sends random slices of its balances to random peers.
///
/// Each step, for each resource, the agent trades with probability
/// `trade_probability`: it picks a peer uniformly among the other
/// registered agents and sends a uniformly drawn fraction (at most
/// `max_fraction`) of its balance. The generator is seeded, so a run is
/// reproducible for a given seed and agent order.
#[derive(Debug)]
pub struct NoiseTraderAgent {
    base: AgentBase,
    rng: StdRng,
    trade_probability: f64,
    max_fraction: f64,
    trades: u64,
}

impl NoiseTraderAgent {
    /// Create a noise trader with its own seeded generator.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] if either probability or
    /// fraction lies outside `[0, 1]`.
    pub fn new(
        base: AgentBase,
        seed: u64,
        trade_probability: f64,
        max_fraction: f64,
    ) -> Result<Self, AgentError> {
        for (label, value) in [
            ("trade_probability", trade_probability),
            ("max_fraction", max_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::InvalidArgument {
                    reason: format!("{label} must lie in [0, 1], got {value}"),
                });
            }
        }
        Ok(Self {
            base,
            rng: StdRng::seed_from_u64(seed),
            trade_probability,
            max_fraction,
            trades: 0,
        })
    }

    /// Number of trades executed so far.
    pub const fn trades(&self) -> u64 {
        self.trades
    }
}

impl Agent for NoiseTraderAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AgentBase {
        &mut self.base
    }

    fn take_step(&mut self, ctx: &mut dyn StepContext) -> Result<(), AgentError> {
        let me = self.name().to_owned();
        let peers: Vec<String> = ctx
            .agent_names()
            .into_iter()
            .filter(|name| *name != me)
            .collect();
        if peers.is_empty() {
            return Ok(());
        }

        for resource in Resource::ALL {
            if !self.rng.random_bool(self.trade_probability) {
                continue;
            }
            let pick = self.rng.random_range(0..peers.len());
            let fraction = self.rng.random_range(0.0..=self.max_fraction);
            let Some(peer) = peers.get(pick) else {
                continue;
            };
            let amount = self.balance(resource) * fraction;
            self.send_to(ctx, resource, Some(peer.as_str()), amount)?;
            self.trades = self.trades.saturating_add(1);
            debug!(tick = ctx.tick(), trader = %me, %peer, %resource, amount, "Noise trade");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::testing::Registry;

    fn trader(seed: u64, trade_probability: f64) -> NoiseTraderAgent {
        let base = AgentBase::new("noise", 50.0, 20.0).unwrap();
        NoiseTraderAgent::new(base, seed, trade_probability, 0.5).unwrap()
    }

    fn run(trader: &mut NoiseTraderAgent, ticks: u64) -> Registry {
        let mut registry = Registry::with_agents(&[("p1", 0.0, 0.0), ("p2", 0.0, 0.0)]).unwrap();
        for tick in 1..=ticks {
            registry.tick = tick;
            trader.take_step(&mut registry).unwrap();
        }
        registry
    }

    fn peer_balance(registry: &Registry, resource: Resource) -> f64 {
        ["p1", "p2"]
            .iter()
            .filter_map(|name| registry.base(name))
            .map(|peer| peer.balance(resource))
            .sum()
    }

    #[test]
    fn probability_outside_unit_interval_is_rejected() {
        let base = AgentBase::new("noise", 1.0, 1.0).unwrap();
        assert!(matches!(
            NoiseTraderAgent::new(base, 7, 1.5, 0.1),
            Err(AgentError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn nan_fraction_is_rejected() {
        let base = AgentBase::new("noise", 1.0, 1.0).unwrap();
        assert!(NoiseTraderAgent::new(base, 7, 0.5, f64::NAN).is_err());
    }

    #[test]
    fn certain_trader_trades_every_resource_every_step() {
        let mut noise = trader(7, 1.0);
        let registry = run(&mut noise, 3);
        assert_eq!(noise.trades(), 6);

        // Trades move value between agents without creating any.
        let tolerance = noise.wallet().tolerance();
        for (resource, endowment) in [(Resource::Usd, 50.0), (Resource::Ocean, 20.0)] {
            let total = noise.balance(resource) + peer_balance(&registry, resource);
            assert!(tolerance.approx_eq(total, endowment));
        }
    }

    #[test]
    fn same_seed_replays_the_same_trades() {
        let mut first = trader(42, 0.6);
        let mut second = trader(42, 0.6);
        let first_peers = run(&mut first, 10);
        let second_peers = run(&mut second, 10);

        assert_eq!(first.trades(), second.trades());
        for resource in Resource::ALL {
            assert_eq!(first.balance(resource), second.balance(resource));
            assert_eq!(
                peer_balance(&first_peers, resource),
                peer_balance(&second_peers, resource)
            );
        }
    }

    #[test]
    fn zero_probability_never_trades() {
        let mut noise = trader(7, 0.0);
        run(&mut noise, 5);
        assert_eq!(noise.trades(), 0);
        assert_eq!(noise.balance(Resource::Usd), 50.0);
    }

    #[test]
    fn lone_trader_has_no_one_to_trade_with() {
        let mut noise = trader(7, 1.0);
        let mut registry = Registry::default();
        registry.tick = 1;
        noise.take_step(&mut registry).unwrap();
        assert_eq!(noise.trades(), 0);
    }
}
