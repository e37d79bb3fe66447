//! Concrete agent strategies.
//!
//! - [`grant`] -- [`GrantGivingAgent`] and [`GrantTakingAgent`]
//! - [`router`] -- [`RouterAgent`], fixed-fraction forwarding
//! - [`schedule`] -- [`ScheduledTransferAgent`], scripted transfers
//! - [`noise`] -- [`NoiseTraderAgent`], seeded random transfers

pub mod grant;
pub mod noise;
pub mod router;
pub mod schedule;

pub use grant::{GrantGivingAgent, GrantTakingAgent};
pub use noise::NoiseTraderAgent;
pub use router::RouterAgent;
pub use schedule::{ScheduledTransfer, ScheduledTransferAgent};
