//! Error types for the tokenspice-agents crate.
//!
//! Wallet bookkeeping, agent construction, registry lookups made through a
//! [`StepContext`](crate::StepContext), and strategy steps all report
//! failures through [`AgentError`]. Nothing here is retried: the error
//! surfaces immediately to the agent's step or to the driver.

use tokenspice_ledger::{AmountError, LedgerError};
use tokenspice_types::Resource;

/// Errors that can occur during wallet and agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Negative amount, negative endowment, or otherwise malformed input.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of what is wrong with the input.
        reason: String,
    },

    /// Withdrawal or transfer exceeds the balance beyond tolerance.
    #[error("insufficient funds: wanted {requested} {resource} but only have {available}")]
    InsufficientFunds {
        /// The resource being withdrawn.
        resource: Resource,
        /// The amount requested.
        requested: f64,
        /// The balance actually held.
        available: f64,
    },

    /// An agent with this name is already registered.
    #[error("duplicate agent name: {0}")]
    DuplicateName(String),

    /// No agent with this name is registered.
    #[error("agent not found: {0}")]
    NotFound(String),

    /// The agent is currently executing its own step and cannot be lent out.
    #[error("agent {0} is mid-step")]
    AgentBusy(String),

    /// A mirrored ledger call failed; the wallet operation was aborted.
    #[error("ledger call failed: {source}")]
    LedgerCallFailed {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },

    /// Local and ledger balances have drifted apart.
    #[error("ledger out of sync for {resource}: local {local}, ledger {ledger}")]
    LedgerOutOfSync {
        /// The drifting resource.
        resource: Resource,
        /// Balance in the local wallet.
        local: f64,
        /// Balance reported by the ledger.
        ledger: f64,
    },

    /// The agent has no step strategy.
    #[error("agent {agent} does not implement take_step")]
    NotImplemented {
        /// The agent whose step was invoked.
        agent: String,
    },
}

impl From<AmountError> for AgentError {
    fn from(source: AmountError) -> Self {
        Self::InvalidArgument {
            reason: source.to_string(),
        }
    }
}
