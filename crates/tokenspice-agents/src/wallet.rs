//! Wallet bookkeeping for agents.
//!
//! A [`Wallet`] holds one balance per [`Resource`] for a single owner,
//! together with a cumulative "total deposited" counter per resource that
//! never decreases. Balances never go negative.
//!
//! Amounts are decimal floats. Every comparison against a balance goes
//! through the wallet's [`Tolerance`]: a withdrawal that overshoots the
//! balance by roundoff alone is clamped to the balance, and negative
//! roundoff such as `-4e-16` counts as zero.
//!
//! # Ledger mirroring
//!
//! A wallet built with a [`LedgerBinding`] replays every balance change on
//! the external ledger: deposits as faucet funding, withdrawals as burns,
//! transfers as ledger transfers. The call is made after validation and
//! before the local update, and a failed call leaves the wallet untouched.
//! Float drift between the two views is absorbed on the ledger side: a
//! debit that empties the wallet sweeps the exact ledger balance, and any
//! other debit overshooting the ledger balance by roundoff is capped at it.
//! Local state stays authoritative for simulation decisions.

use tokenspice_ledger::{LedgerBinding, SupplyFlows, Tolerance};
use tokenspice_types::{LedgerAccount, Resource};
use tracing::debug;

use crate::error::AgentError;

/// Per-resource figures tracked by a wallet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Holding {
    /// Current balance, never negative.
    balance: f64,
    /// Everything ever deposited, transfers in included.
    total_deposited: f64,
    /// Value that entered the simulation through this wallet.
    funded: f64,
    /// Value that left the simulation through this wallet.
    drained: f64,
}

/// Whether a balance change crosses the simulation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Value enters or leaves the set of simulated wallets.
    External,
    /// Value moves between two simulated wallets.
    Internal,
}

/// Balances of USD and OCEAN for a single owner.
#[derive(Debug)]
pub struct Wallet {
    usd: Holding,
    ocean: Holding,
    tolerance: Tolerance,
    ledger: Option<LedgerBinding>,
}

impl Wallet {
    /// Create an in-memory wallet with the default tolerance.
    ///
    /// The initial balances are deposits: they count toward the
    /// cumulative deposit counters.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] if an initial balance is
    /// negative or not finite.
    pub fn new(usd: f64, ocean: f64) -> Result<Self, AgentError> {
        Self::with_tolerance(usd, ocean, Tolerance::default())
    }

    /// Create an in-memory wallet with an explicit tolerance.
    pub fn with_tolerance(usd: f64, ocean: f64, tolerance: Tolerance) -> Result<Self, AgentError> {
        Self::build(usd, ocean, tolerance, None)
    }

    /// Create a wallet that mirrors every balance change onto a ledger.
    ///
    /// The initial balances are funded on the ledger from its faucet.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] for a negative endowment, or
    /// [`AgentError::LedgerCallFailed`] if faucet funding fails.
    pub fn ledger_backed(
        usd: f64,
        ocean: f64,
        tolerance: Tolerance,
        binding: LedgerBinding,
    ) -> Result<Self, AgentError> {
        Self::build(usd, ocean, tolerance, Some(binding))
    }

    fn build(
        usd: f64,
        ocean: f64,
        tolerance: Tolerance,
        ledger: Option<LedgerBinding>,
    ) -> Result<Self, AgentError> {
        // Validate both endowments before any ledger call.
        tolerance.sanitize(usd)?;
        tolerance.sanitize(ocean)?;

        let mut wallet = Self {
            usd: Holding::default(),
            ocean: Holding::default(),
            tolerance,
            ledger,
        };
        wallet.deposit(Resource::Usd, usd)?;
        wallet.deposit(Resource::Ocean, ocean)?;
        Ok(wallet)
    }

    /// Current balance of `resource`.
    pub const fn balance(&self, resource: Resource) -> f64 {
        self.holding(resource).balance
    }

    /// Cumulative amount of `resource` ever deposited, transfers in included.
    pub const fn total_deposited(&self, resource: Resource) -> f64 {
        self.holding(resource).total_deposited
    }

    /// Cumulative amount of `resource` that entered the simulation here.
    pub const fn funded(&self, resource: Resource) -> f64 {
        self.holding(resource).funded
    }

    /// Cumulative amount of `resource` that left the simulation here.
    pub const fn drained(&self, resource: Resource) -> f64 {
        self.holding(resource).drained
    }

    /// Current USD balance.
    pub const fn usd(&self) -> f64 {
        self.usd.balance
    }

    /// Current OCEAN balance.
    pub const fn ocean(&self) -> f64 {
        self.ocean.balance
    }

    /// Supply figures of `resource` for conservation checks.
    pub const fn supply(&self, resource: Resource) -> SupplyFlows {
        let holding = self.holding(resource);
        SupplyFlows {
            held: holding.balance,
            funded: holding.funded,
            drained: holding.drained,
        }
    }

    /// The roundoff tolerance used by this wallet.
    pub const fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Whether balance changes are mirrored onto a ledger.
    pub const fn is_ledger_backed(&self) -> bool {
        self.ledger.is_some()
    }

    /// The mirrored ledger account, if any.
    pub fn ledger_account(&self) -> Option<&LedgerAccount> {
        self.ledger.as_ref().map(LedgerBinding::account)
    }

    /// Deposit `amount` of `resource` from outside the simulation.
    ///
    /// A zero amount is a valid no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] for a negative amount, or
    /// [`AgentError::LedgerCallFailed`] if the mirrored funding fails.
    pub fn deposit(&mut self, resource: Resource, amount: f64) -> Result<(), AgentError> {
        let amount = self.tolerance.sanitize(amount)?;
        self.ensure_creditable(resource, amount)?;

        if let Some(binding) = &self.ledger {
            binding.fund(resource, amount)?;
        }

        self.credit(resource, amount, Flow::External);
        debug!(%resource, amount, balance = self.balance(resource), "Wallet deposit");
        Ok(())
    }

    /// Withdraw `amount` of `resource` out of the simulation.
    ///
    /// A request exceeding the balance by roundoff alone empties the
    /// wallet exactly. The deposit counter is unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] for a negative amount,
    /// [`AgentError::InsufficientFunds`] if the balance is too low, or
    /// [`AgentError::LedgerCallFailed`] if the mirrored burn fails.
    pub fn withdraw(&mut self, resource: Resource, amount: f64) -> Result<(), AgentError> {
        let amount = self.fit_withdrawal(resource, amount)?;

        if let Some(binding) = &self.ledger {
            if self.empties(resource, amount) {
                binding.sweep_to(resource, &LedgerAccount::burn())?;
            } else {
                binding.burn(resource, amount, self.tolerance)?;
            }
        }

        self.debit(resource, amount, Flow::External);
        debug!(%resource, amount, balance = self.balance(resource), "Wallet withdrawal");
        Ok(())
    }

    /// Move `amount` of `resource` to `destination`, or burn it when
    /// `destination` is `None`.
    ///
    /// Either both sides are updated or neither is.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] for a negative amount or
    /// when only one side settles on a ledger,
    /// [`AgentError::InsufficientFunds`] if the balance is too low, or
    /// [`AgentError::LedgerCallFailed`] if the mirrored transfer fails.
    pub fn transfer(
        &mut self,
        resource: Resource,
        destination: Option<&mut Self>,
        amount: f64,
    ) -> Result<(), AgentError> {
        let Some(destination) = destination else {
            return self.withdraw(resource, amount);
        };

        let amount = self.fit_withdrawal(resource, amount)?;
        destination.ensure_creditable(resource, amount)?;

        match (&self.ledger, &destination.ledger) {
            (Some(source), Some(target)) => {
                if self.empties(resource, amount) {
                    source.sweep_to(resource, target.account())?;
                } else {
                    source.transfer_to(resource, target.account(), amount, self.tolerance)?;
                }
            }
            (None, None) => {}
            _ => {
                return Err(AgentError::InvalidArgument {
                    reason: "transfer between a ledger-backed and an in-memory wallet".to_owned(),
                });
            }
        }

        self.debit(resource, amount, Flow::Internal);
        destination.credit(resource, amount, Flow::Internal);
        debug!(
            %resource,
            amount,
            source_balance = self.balance(resource),
            destination_balance = destination.balance(resource),
            "Wallet transfer"
        );
        Ok(())
    }

    /// Read this wallet's balance of `resource` from the ledger.
    ///
    /// Returns `None` for an in-memory wallet.
    pub fn ledger_balance(&self, resource: Resource) -> Result<Option<f64>, AgentError> {
        match &self.ledger {
            Some(binding) => Ok(Some(binding.balance(resource)?)),
            None => Ok(None),
        }
    }

    /// Check that local and ledger balances agree within tolerance.
    ///
    /// Always succeeds for an in-memory wallet.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::LedgerOutOfSync`] on drift, or
    /// [`AgentError::LedgerCallFailed`] if the balance query fails.
    pub fn verify_ledger_sync(&self) -> Result<(), AgentError> {
        for resource in Resource::ALL {
            if let Some(ledger) = self.ledger_balance(resource)? {
                let local = self.balance(resource);
                if !self.tolerance.approx_eq(local, ledger) {
                    return Err(AgentError::LedgerOutOfSync {
                        resource,
                        local,
                        ledger,
                    });
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    const fn holding(&self, resource: Resource) -> &Holding {
        match resource {
            Resource::Usd => &self.usd,
            Resource::Ocean => &self.ocean,
        }
    }

    const fn holding_mut(&mut self, resource: Resource) -> &mut Holding {
        match resource {
            Resource::Usd => &mut self.usd,
            Resource::Ocean => &mut self.ocean,
        }
    }

    /// Validate a withdrawal and return the amount to actually debit.
    fn fit_withdrawal(&self, resource: Resource, amount: f64) -> Result<f64, AgentError> {
        let requested = self.tolerance.sanitize(amount)?;
        let available = self.balance(resource);
        self.tolerance
            .fit_to_balance(requested, available)
            .ok_or(AgentError::InsufficientFunds {
                resource,
                requested,
                available,
            })
    }

    /// Whether debiting `amount` leaves nothing behind.
    const fn empties(&self, resource: Resource, amount: f64) -> bool {
        amount > 0.0 && amount >= self.balance(resource)
    }

    /// Reject a credit that would push the balance past `f64::MAX`.
    fn ensure_creditable(&self, resource: Resource, amount: f64) -> Result<(), AgentError> {
        let holding = self.holding(resource);
        if (holding.balance + amount).is_finite() && (holding.total_deposited + amount).is_finite()
        {
            return Ok(());
        }
        Err(AgentError::InvalidArgument {
            reason: format!("depositing {amount} {resource} overflows the balance"),
        })
    }

    fn credit(&mut self, resource: Resource, amount: f64, flow: Flow) {
        let holding = self.holding_mut(resource);
        holding.balance += amount;
        holding.total_deposited += amount;
        if flow == Flow::External {
            holding.funded += amount;
        }
    }

    fn debit(&mut self, resource: Resource, amount: f64, flow: Flow) {
        let holding = self.holding_mut(resource);
        holding.balance = (holding.balance - amount).max(0.0);
        if flow == Flow::External {
            holding.drained += amount;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::sync::Arc;

    use tokenspice_ledger::{LedgerMirror, MemoryLedger, ResourceAddresses};

    use super::*;

    fn ledger_wallet(ledger: &Arc<MemoryLedger>, address: &str, usd: f64, ocean: f64) -> Wallet {
        let binding = LedgerBinding::new(
            LedgerAccount::new(address),
            ResourceAddresses::default(),
            Arc::clone(ledger) as Arc<dyn LedgerMirror>,
        );
        Wallet::ledger_backed(usd, ocean, Tolerance::default(), binding).unwrap()
    }

    #[test]
    fn new_wallet_defaults_to_zero() {
        let wallet = Wallet::new(0.0, 0.0).unwrap();
        assert_eq!(wallet.usd(), 0.0);
        assert_eq!(wallet.ocean(), 0.0);
        assert_eq!(wallet.total_deposited(Resource::Usd), 0.0);
        assert!(!wallet.is_ledger_backed());
    }

    #[test]
    fn initial_balances_count_as_deposits() {
        let wallet = Wallet::new(10.0, 200.0).unwrap();
        assert_eq!(wallet.total_deposited(Resource::Usd), 10.0);
        assert_eq!(wallet.total_deposited(Resource::Ocean), 200.0);
        assert_eq!(wallet.funded(Resource::Ocean), 200.0);
    }

    #[test]
    fn negative_endowment_is_rejected() {
        assert!(matches!(
            Wallet::new(-1.0, 0.0),
            Err(AgentError::InvalidArgument { .. })
        ));
        assert!(matches!(
            Wallet::new(0.0, -0.5),
            Err(AgentError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn deposit_increases_balance_and_counter() {
        let mut wallet = Wallet::new(0.0, 0.0).unwrap();
        wallet.deposit(Resource::Usd, 12.15).unwrap();
        assert_eq!(wallet.usd(), 12.15);
        assert_eq!(wallet.total_deposited(Resource::Usd), 12.15);
        assert_eq!(wallet.ocean(), 0.0);
    }

    #[test]
    fn zero_deposit_is_a_valid_noop() {
        let mut wallet = Wallet::new(1.0, 0.0).unwrap();
        wallet.deposit(Resource::Usd, 0.0).unwrap();
        assert_eq!(wallet.usd(), 1.0);
        assert_eq!(wallet.total_deposited(Resource::Usd), 1.0);
    }

    #[test]
    fn negative_amounts_are_invalid() {
        let mut wallet = Wallet::new(12.15, 0.0).unwrap();
        assert!(matches!(
            wallet.deposit(Resource::Usd, -5.0),
            Err(AgentError::InvalidArgument { .. })
        ));
        assert!(matches!(
            wallet.withdraw(Resource::Usd, -5.0),
            Err(AgentError::InvalidArgument { .. })
        ));
        assert_eq!(wallet.usd(), 12.15);
    }

    #[test]
    fn nan_amount_is_invalid() {
        let mut wallet = Wallet::new(1.0, 0.0).unwrap();
        assert!(matches!(
            wallet.deposit(Resource::Usd, f64::NAN),
            Err(AgentError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn overdraw_is_insufficient_funds() {
        let mut wallet = Wallet::new(12.15, 0.0).unwrap();
        let result = wallet.withdraw(Resource::Usd, 1000.0);
        assert!(matches!(
            result,
            Err(AgentError::InsufficientFunds {
                resource: Resource::Usd,
                ..
            })
        ));
        assert_eq!(wallet.usd(), 12.15);
    }

    #[test]
    fn roundoff_overshoot_empties_wallet_exactly() {
        let mut wallet = Wallet::new(0.0, 0.0).unwrap();
        wallet.deposit(Resource::Usd, 2.4).unwrap();
        wallet.withdraw(Resource::Usd, 2.400_000_000_000_000_4).unwrap();
        assert_eq!(wallet.usd(), 0.0);
    }

    #[test]
    fn negative_roundoff_withdrawal_is_zero() {
        let mut wallet = Wallet::new(1.0, 0.0).unwrap();
        wallet.withdraw(Resource::Usd, -4e-16).unwrap();
        assert_eq!(wallet.usd(), 1.0);
    }

    #[test]
    fn withdrawal_leaves_deposit_counter_alone() {
        let mut wallet = Wallet::new(0.0, 0.0).unwrap();
        wallet.deposit(Resource::Ocean, 5.0).unwrap();
        wallet.withdraw(Resource::Ocean, 3.0).unwrap();
        assert_eq!(wallet.ocean(), 2.0);
        assert_eq!(wallet.total_deposited(Resource::Ocean), 5.0);
        assert_eq!(wallet.drained(Resource::Ocean), 3.0);
    }

    #[test]
    fn transfer_moves_value_between_wallets() {
        let mut alice = Wallet::new(10.0, 0.0).unwrap();
        let mut bob = Wallet::new(1.0, 0.0).unwrap();
        alice.transfer(Resource::Usd, Some(&mut bob), 2.0).unwrap();
        assert_eq!(alice.usd(), 8.0);
        assert_eq!(bob.usd(), 3.0);
        assert_eq!(bob.total_deposited(Resource::Usd), 3.0);
        // Transfers are internal: no funding or draining recorded.
        assert_eq!(bob.funded(Resource::Usd), 1.0);
        assert_eq!(alice.drained(Resource::Usd), 0.0);
    }

    #[test]
    fn failed_transfer_changes_neither_side() {
        let mut alice = Wallet::new(1.0, 0.0).unwrap();
        let mut bob = Wallet::new(1.0, 0.0).unwrap();
        assert!(alice.transfer(Resource::Usd, Some(&mut bob), 5.0).is_err());
        assert_eq!(alice.usd(), 1.0);
        assert_eq!(bob.usd(), 1.0);
        assert_eq!(bob.total_deposited(Resource::Usd), 1.0);
    }

    #[test]
    fn transfer_without_destination_burns() {
        let mut alice = Wallet::new(0.0, 50.0).unwrap();
        alice.transfer(Resource::Ocean, None, 20.0).unwrap();
        assert_eq!(alice.ocean(), 30.0);
        assert_eq!(alice.drained(Resource::Ocean), 20.0);
    }

    #[test]
    fn ledger_backed_wallet_mirrors_every_change() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut alice = ledger_wallet(&ledger, "0xa11ce", 10.0, 0.0);
        let mut bob = ledger_wallet(&ledger, "0xb0b", 1.0, 0.0);

        alice.transfer(Resource::Usd, Some(&mut bob), 2.0).unwrap();
        bob.withdraw(Resource::Usd, 0.5).unwrap();
        alice.deposit(Resource::Ocean, 4.0).unwrap();

        assert_eq!(alice.ledger_balance(Resource::Usd).unwrap(), Some(8.0));
        assert_eq!(bob.ledger_balance(Resource::Usd).unwrap(), Some(2.5));
        assert_eq!(alice.ledger_balance(Resource::Ocean).unwrap(), Some(4.0));
        alice.verify_ledger_sync().unwrap();
        bob.verify_ledger_sync().unwrap();
    }

    #[test]
    fn emptying_a_ledger_wallet_sweeps_base_unit_drift() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut alice = ledger_wallet(&ledger, "0xa11ce", 0.0, 0.0);
        let mut bob = ledger_wallet(&ledger, "0xb0b", 0.0, 0.0);
        alice.deposit(Resource::Usd, 0.1).unwrap();
        alice.deposit(Resource::Usd, 0.2).unwrap();

        let everything = alice.usd();
        alice.transfer(Resource::Usd, Some(&mut bob), everything).unwrap();
        assert_eq!(alice.usd(), 0.0);
        assert_eq!(alice.ledger_balance(Resource::Usd).unwrap(), Some(0.0));
        bob.verify_ledger_sync().unwrap();

        bob.withdraw(Resource::Usd, everything).unwrap();
        assert_eq!(bob.ledger_balance(Resource::Usd).unwrap(), Some(0.0));
    }

    #[test]
    fn drifted_local_balance_still_settles_on_the_ledger() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut alice = ledger_wallet(&ledger, "0xa11ce", 0.0, 0.0);
        let mut bob = ledger_wallet(&ledger, "0xb0b", 0.0, 0.0);
        let mut local = Wallet::new(0.0, 0.0).unwrap();
        let mut local_peer = Wallet::new(0.0, 0.0).unwrap();
        for _ in 0..17 {
            alice.deposit(Resource::Usd, 0.1).unwrap();
            local.deposit(Resource::Usd, 0.1).unwrap();
        }
        assert_eq!(alice.usd(), 1.700_000_000_000_000_4);

        // Below the local balance but above the ledger's 1.7 tokens.
        let amount = 1.700_000_000_000_000_2;
        local.transfer(Resource::Usd, Some(&mut local_peer), amount).unwrap();
        alice.transfer(Resource::Usd, Some(&mut bob), amount).unwrap();
        assert_eq!(alice.usd(), local.usd());
        assert_eq!(alice.ledger_balance(Resource::Usd).unwrap(), Some(0.0));
        assert_eq!(bob.ledger_balance(Resource::Usd).unwrap(), Some(1.7));
        alice.verify_ledger_sync().unwrap();
        bob.verify_ledger_sync().unwrap();

        for _ in 0..17 {
            alice.deposit(Resource::Usd, 0.1).unwrap();
        }
        alice.withdraw(Resource::Usd, amount).unwrap();
        assert_eq!(alice.ledger_balance(Resource::Usd).unwrap(), Some(0.0));
        alice.verify_ledger_sync().unwrap();
    }

    #[test]
    fn ledger_failure_leaves_local_state_unchanged() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut alice = ledger_wallet(&ledger, "0xa11ce", 10.0, 0.0);
        let mut bob = ledger_wallet(&ledger, "0xb0b", 1.0, 0.0);

        ledger.fail_next_call("rpc timeout");
        let result = alice.transfer(Resource::Usd, Some(&mut bob), 2.0);
        assert!(matches!(result, Err(AgentError::LedgerCallFailed { .. })));
        assert_eq!(alice.usd(), 10.0);
        assert_eq!(bob.usd(), 1.0);

        ledger.fail_next_call("rpc timeout");
        assert!(alice.deposit(Resource::Usd, 1.0).is_err());
        assert_eq!(alice.usd(), 10.0);
        assert_eq!(alice.total_deposited(Resource::Usd), 10.0);

        alice.verify_ledger_sync().unwrap();
        bob.verify_ledger_sync().unwrap();
    }

    #[test]
    fn mixed_settlement_transfer_is_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let mut alice = ledger_wallet(&ledger, "0xa11ce", 10.0, 0.0);
        let mut bob = Wallet::new(0.0, 0.0).unwrap();
        assert!(matches!(
            alice.transfer(Resource::Usd, Some(&mut bob), 1.0),
            Err(AgentError::InvalidArgument { .. })
        ));
        assert_eq!(alice.usd(), 10.0);
        assert_eq!(bob.usd(), 0.0);
    }

    #[test]
    fn in_memory_wallet_has_no_ledger_balance() {
        let wallet = Wallet::new(3.0, 0.0).unwrap();
        assert_eq!(wallet.ledger_balance(Resource::Usd).unwrap(), None);
        assert!(wallet.ledger_account().is_none());
        wallet.verify_ledger_sync().unwrap();
    }
}
