//! Base-unit arithmetic, ledger mirroring, and supply conservation for the
//! TokenSPICE simulation.
//!
//! Wallets keep balances as decimal floats. Everything that has to agree
//! with an integer settlement ledger goes through this crate.
//!
//! # Architecture
//!
//! - [`amount`] -- 18-decimal base-unit conversion and the roundoff
//!   [`Tolerance`] every balance comparison uses.
//! - [`mirror`] -- The [`LedgerMirror`] capability a ledger-backed wallet
//!   calls, and the [`LedgerBinding`] that ties a wallet to an account.
//! - [`memory`] -- [`MemoryLedger`], an in-process settlement ledger.
//! - [`conservation`] -- Per-tick supply conservation check.
//!
//! # Conservation Law
//!
//! For every tick T and every resource R:
//!
//! ```text
//! held(R, end of T) - held(R, start of T) == funded(R, T) - drained(R, T)
//! ```
//!
//! Transfers between wallets never appear on the right-hand side. A
//! violation produces a [`SupplyAnomaly`].
//!
//! # Usage
//!
//! ```
//! use tokenspice_ledger::amount::{from_base_units, to_base_units};
//!
//! let base = to_base_units(2.4).ok();
//! assert_eq!(base, Some(2_400_000_000_000_000_000));
//! assert_eq!(base.and_then(|b| from_base_units(b).ok()), Some(2.4));
//! ```

pub mod amount;
pub mod conservation;
pub mod memory;
pub mod mirror;

// Re-export primary types at crate root.
pub use amount::{AmountError, Tolerance};
pub use conservation::{ConservationResult, SupplyFlows};
pub use memory::MemoryLedger;
pub use mirror::{LedgerBinding, LedgerMirror, ResourceAddresses};

use std::collections::BTreeMap;

use tokenspice_types::Resource;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by a settlement ledger call.
///
/// Any of these makes the wallet operation that issued the call fail as a
/// whole. Retrying is the ledger collaborator's business, never the core's.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The ledger rejected or could not complete the call.
    #[error("ledger call {operation} failed: {reason}")]
    CallFailed {
        /// The ledger operation that failed.
        operation: &'static str,
        /// Description reported by the ledger.
        reason: String,
    },

    /// The ledger did not answer in time.
    #[error("ledger call {operation} timed out after {elapsed_ms}ms")]
    Timeout {
        /// The ledger operation that timed out.
        operation: &'static str,
        /// How long the caller waited.
        elapsed_ms: u64,
    },

    /// The source account does not hold enough base units.
    #[error(
        "ledger account {account} holds {available} base units of {resource_address}, \
         {requested} requested"
    )]
    InsufficientBalance {
        /// The debited account.
        account: String,
        /// The token contract address.
        resource_address: String,
        /// Base units requested.
        requested: u128,
        /// Base units available.
        available: u128,
    },

    /// A ledger balance would exceed `u128::MAX` base units.
    #[error("ledger balance overflow for {account} in {resource_address}")]
    BalanceOverflow {
        /// The credited account.
        account: String,
        /// The token contract address.
        resource_address: String,
    },

    /// The amount could not be converted to base units.
    #[error("amount conversion failed: {source}")]
    Amount {
        /// The underlying conversion error.
        #[from]
        source: AmountError,
    },
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A supply conservation violation detected at the end of a tick.
///
/// Captures, for each resource that did not balance, the supply change the
/// external flows explain and the change actually observed in the wallets.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyAnomaly {
    /// The tick where the anomaly was detected.
    pub tick: u64,
    /// Per-resource imbalance: (`expected_change`, `actual_change`).
    pub imbalances: BTreeMap<Resource, (f64, f64)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for SupplyAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
