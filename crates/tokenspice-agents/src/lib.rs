//! Wallets, the agent contract, and agent strategies for the TokenSPICE
//! simulation.
//!
//! This crate holds everything that operates on agent state without
//! driving time. It sits between `tokenspice-ledger` (amount arithmetic and
//! ledger mirroring) and `tokenspice-core` (registry and tick cycle).
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] trait, [`AgentBase`], and [`StepContext`]
//! - [`error`] -- Error types for all agent operations ([`AgentError`])
//! - [`strategies`] -- Granting, routing, scripted, and noise agents
//! - [`wallet`] -- Two-resource [`Wallet`] with optional ledger mirroring

pub mod agent;
pub mod error;
pub mod strategies;
pub mod wallet;

#[cfg(test)]
mod testing;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, AgentBase, StepContext};
pub use error::AgentError;
pub use strategies::{
    GrantGivingAgent, GrantTakingAgent, NoiseTraderAgent, RouterAgent, ScheduledTransfer,
    ScheduledTransferAgent,
};
pub use wallet::Wallet;
