//! Supply conservation check for a single tick.
//!
//! Value moves between wallets through transfers, which never change the
//! total supply. Supply only changes through external flows: funding
//! (deposits from outside the simulation) and draining (withdrawals and
//! burns). For each resource R the check is:
//!
//! ```text
//! (held_after - held_before) == (funded_after - funded_before)
//!                              - (drained_after - drained_before)
//! ```
//!
//! Both sides are float sums, so equality is judged with the roundoff
//! [`Tolerance`] scaled by the larger supply figure.

use std::collections::BTreeMap;

use tokenspice_types::Resource;

use crate::SupplyAnomaly;
use crate::amount::Tolerance;

/// Aggregate supply figures for one resource at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SupplyFlows {
    /// Total balance held across all wallets.
    pub held: f64,
    /// Cumulative value ever funded into wallets from outside.
    pub funded: f64,
    /// Cumulative value ever drained out of wallets.
    pub drained: f64,
}

impl SupplyFlows {
    /// Accumulate another wallet's figures into this total.
    pub const fn absorb(&mut self, other: Self) {
        self.held += other.held;
        self.funded += other.funded;
        self.drained += other.drained;
    }
}

/// The result of a supply check for a single tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ConservationResult {
    /// Every resource's supply change is explained by external flows.
    Balanced,
    /// One or more resources changed supply without a matching flow.
    Anomaly(SupplyAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Verify supply conservation between two instants of the same tick.
///
/// Resources missing from either map count as all-zero figures.
pub fn verify_supply(
    tick: u64,
    before: &BTreeMap<Resource, SupplyFlows>,
    after: &BTreeMap<Resource, SupplyFlows>,
    tolerance: Tolerance,
) -> ConservationResult {
    let mut imbalances: BTreeMap<Resource, (f64, f64)> = BTreeMap::new();

    for resource in Resource::ALL {
        let start = before.get(&resource).copied().unwrap_or_default();
        let end = after.get(&resource).copied().unwrap_or_default();

        let expected = (end.funded - start.funded) - (end.drained - start.drained);
        let actual = end.held - start.held;

        // Roundoff grows with the magnitude of the sums involved.
        let scale = start
            .held
            .abs()
            .max(end.held.abs())
            .max(end.funded.abs())
            .max(end.drained.abs());
        if (expected - actual).abs() > tolerance.slack(scale) {
            imbalances.insert(resource, (expected, actual));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        ConservationResult::Anomaly(SupplyAnomaly {
            tick,
            imbalances,
            message: format!(
                "SUPPLY_ANOMALY at tick {tick}: conservation violated for {count} resource(s)",
            ),
        })
    }
}
