//! Agent registry, tick cycle, and simulation runner for the TokenSPICE
//! simulation.
//!
//! This crate owns time. Each tick advances the clock, then steps every
//! registered agent once in registration order, then checks that the
//! total supply moved only through external flows.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter with checked advancement.
//! - [`config`] -- Configuration loading from `tokenspice-config.yaml` into
//!   strongly-typed structs.
//! - [`recorder`] -- [`BalanceRecorder`], per-tick balance snapshots.
//! - [`runner`] -- Bounded run loop with per-tick callbacks.
//! - [`state`] -- [`SimulationState`], the name-keyed agent registry.
//! - [`tick`] -- The single-tick cycle and its [`TickSummary`].
//!
//! [`BalanceRecorder`]: recorder::BalanceRecorder
//! [`SimulationState`]: state::SimulationState
//! [`TickSummary`]: tick::TickSummary

pub mod clock;
pub mod config;
pub mod recorder;
pub mod runner;
pub mod state;
pub mod tick;
