//! Shared type definitions for the TokenSPICE agent simulation.
//!
//! This crate is the single source of truth for the small set of types that
//! flow between the ledger, agent, and engine crates.
//!
//! # Modules
//!
//! - [`enums`] -- The two simulated resources ([`Resource`])
//! - [`structs`] -- Ledger account references and per-tick balance snapshots

pub mod enums;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::Resource;
pub use structs::{BalanceSnapshot, LedgerAccount};
