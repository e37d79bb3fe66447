//! Ledger mirroring: the capability a ledger-backed wallet calls.
//!
//! A wallet that settles on an external ledger holds a [`LedgerBinding`]:
//! its own account, the token contract addresses, and a shared handle to a
//! [`LedgerMirror`]. The binding translates decimal wallet amounts into
//! base-unit ledger calls. Every call is synchronous and either succeeds or
//! returns a [`LedgerError`].

use std::sync::Arc;

use tokenspice_types::{LedgerAccount, Resource};
use tracing::debug;

use crate::LedgerError;
use crate::amount::{Tolerance, from_base_units_unsigned, to_base_units_unsigned};

/// The narrow settlement interface of an external ledger.
///
/// Implementations wrap a chain client, a development node, or the
/// in-process [`MemoryLedger`](crate::MemoryLedger). Nonce management,
/// signing, and retries all live behind this trait.
pub trait LedgerMirror: core::fmt::Debug + Send + Sync {
    /// Move `base_amount` units of the token at `resource_address` from one
    /// account to another.
    fn transfer(
        &self,
        resource_address: &str,
        from: &LedgerAccount,
        to: &LedgerAccount,
        base_amount: u128,
    ) -> Result<(), LedgerError>;

    /// Read an account's balance of the token at `resource_address`.
    fn balance_of(&self, account: &LedgerAccount, resource_address: &str)
    -> Result<u128, LedgerError>;

    /// Mint `base_amount` units of the token to `account` from a faucet.
    fn fund_from_faucet(
        &self,
        account: &LedgerAccount,
        resource_address: &str,
        base_amount: u128,
    ) -> Result<(), LedgerError>;
}

/// Token contract addresses for the two simulated resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAddresses {
    /// Address of the USD-pegged token contract.
    pub usd: String,
    /// Address of the OCEAN token contract.
    pub ocean: String,
}

impl ResourceAddresses {
    /// Return the contract address for `resource`.
    pub fn address(&self, resource: Resource) -> &str {
        match resource {
            Resource::Usd => &self.usd,
            Resource::Ocean => &self.ocean,
        }
    }
}

impl Default for ResourceAddresses {
    fn default() -> Self {
        Self {
            usd: "0x00000000000000000000000000000000000000a1".to_owned(),
            ocean: "0x00000000000000000000000000000000000000b2".to_owned(),
        }
    }
}

/// Ties one wallet to its account on a shared settlement ledger.
///
/// The ledger handle is shared by every wallet settling on the same
/// ledger; the account is referenced, never owned.
#[derive(Debug, Clone)]
pub struct LedgerBinding {
    account: LedgerAccount,
    addresses: ResourceAddresses,
    mirror: Arc<dyn LedgerMirror>,
}

impl LedgerBinding {
    /// Bind `account` on `mirror` with the given token addresses.
    pub const fn new(
        account: LedgerAccount,
        addresses: ResourceAddresses,
        mirror: Arc<dyn LedgerMirror>,
    ) -> Self {
        Self {
            account,
            addresses,
            mirror,
        }
    }

    /// The bound ledger account.
    pub const fn account(&self) -> &LedgerAccount {
        &self.account
    }

    /// The token addresses used for calls.
    pub const fn addresses(&self) -> &ResourceAddresses {
        &self.addresses
    }

    /// Fund the bound account from the ledger faucet.
    pub fn fund(&self, resource: Resource, amount: f64) -> Result<(), LedgerError> {
        let base = to_base_units_unsigned(amount)?;
        if base == 0 {
            return Ok(());
        }
        debug!(account = %self.account, %resource, base, "Mirroring deposit as faucet funding");
        self.mirror
            .fund_from_faucet(&self.account, self.addresses.address(resource), base)
    }

    /// Move value from the bound account to `to`.
    ///
    /// Repeated float credits can leave the wallet's local figure a few
    /// base units above the account's ledger balance. A request that
    /// overshoots the ledger balance by no more than `tolerance` grants
    /// around `amount` is capped at that balance; a larger overshoot is
    /// sent as is and rejected by the ledger.
    pub fn transfer_to(
        &self,
        resource: Resource,
        to: &LedgerAccount,
        amount: f64,
        tolerance: Tolerance,
    ) -> Result<(), LedgerError> {
        let requested = to_base_units_unsigned(amount)?;
        if requested == 0 {
            return Ok(());
        }

        let address = self.addresses.address(resource);
        let held = self.mirror.balance_of(&self.account, address)?;
        let base = match requested.checked_sub(held) {
            Some(excess) if excess > 0 => {
                let excess_amount = from_base_units_unsigned(excess)?;
                if excess_amount <= tolerance.slack(amount) {
                    debug!(
                        account = %self.account,
                        %resource,
                        excess,
                        "Capping transfer at ledger balance"
                    );
                    held
                } else {
                    requested
                }
            }
            _ => requested,
        };
        if base == 0 {
            return Ok(());
        }

        debug!(from = %self.account, %to, %resource, base, "Mirroring transfer");
        self.mirror.transfer(address, &self.account, to, base)
    }

    /// Burn value held by the bound account.
    pub fn burn(
        &self,
        resource: Resource,
        amount: f64,
        tolerance: Tolerance,
    ) -> Result<(), LedgerError> {
        self.transfer_to(resource, &LedgerAccount::burn(), amount, tolerance)
    }

    /// Move the bound account's entire ledger balance of `resource` to `to`.
    ///
    /// A wallet that empties itself sweeps rather than converting its
    /// float balance, so base-unit truncation can neither strand dust on
    /// the ledger nor overshoot what the account holds.
    pub fn sweep_to(&self, resource: Resource, to: &LedgerAccount) -> Result<(), LedgerError> {
        let address = self.addresses.address(resource);
        let base = self.mirror.balance_of(&self.account, address)?;
        if base == 0 {
            return Ok(());
        }
        debug!(from = %self.account, %to, %resource, base, "Mirroring sweep");
        self.mirror.transfer(address, &self.account, to, base)
    }

    /// Read the bound account's ledger balance as a decimal amount.
    pub fn balance(&self, resource: Resource) -> Result<f64, LedgerError> {
        let base = self
            .mirror
            .balance_of(&self.account, self.addresses.address(resource))?;
        Ok(from_base_units_unsigned(base)?)
    }
}
