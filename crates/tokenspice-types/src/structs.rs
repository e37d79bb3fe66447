//! Core structs shared across the workspace.

use serde::{Deserialize, Serialize};

/// Reference to an account on an external settlement ledger.
///
/// A wallet never owns the account: it only names it when issuing
/// mirrored ledger calls. Addresses are compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerAccount(pub String);

impl LedgerAccount {
    /// Address that swallows burned value on the ledger.
    pub const BURN_ADDRESS: &'static str = "0x000000000000000000000000000000000000dEaD";

    /// Create an account reference from an address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The well-known burn account.
    pub fn burn() -> Self {
        Self(Self::BURN_ADDRESS.to_owned())
    }

    /// Return the address string.
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LedgerAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One agent's balances at the end of a tick.
///
/// This is the read-only view external reporters consume: it carries
/// nothing a reporter could use to mutate a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// The tick the snapshot was taken after.
    pub tick: u64,
    /// The agent's unique name.
    pub agent: String,
    /// USD balance.
    pub usd: f64,
    /// OCEAN balance.
    pub ocean: f64,
    /// Cumulative USD ever deposited.
    pub total_usd_deposited: f64,
    /// Cumulative OCEAN ever deposited.
    pub total_ocean_deposited: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn burn_account_uses_dead_address() {
        assert_eq!(LedgerAccount::burn().address(), LedgerAccount::BURN_ADDRESS);
    }

    #[test]
    fn snapshot_serializes_field_names() {
        let snapshot = BalanceSnapshot {
            tick: 3,
            agent: "granter".to_owned(),
            usd: 0.0,
            ocean: 150.0,
            total_usd_deposited: 0.0,
            total_ocean_deposited: 200.0,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["agent"], "granter");
        assert_eq!(json["tick"], 3);
        assert_eq!(json["total_ocean_deposited"], 200.0);
    }
}
