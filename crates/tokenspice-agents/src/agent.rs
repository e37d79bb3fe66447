//! The agent contract and the bare agent.
//!
//! Every agent has a unique name and exclusively owns one [`Wallet`]. The
//! only behaviour an agent variant supplies is [`Agent::take_step`], invoked
//! once per tick by the driver with the shared simulation state as a
//! [`StepContext`].
//!
//! [`AgentBase`] carries the name and wallet that every variant embeds.
//! Used on its own it is the bare agent: its step fails with
//! [`AgentError::NotImplemented`].

use tokenspice_ledger::{LedgerBinding, Tolerance};
use tokenspice_types::Resource;

use crate::error::AgentError;
use crate::wallet::Wallet;

/// The shared simulation state as seen by an agent during its step.
///
/// The stepping agent itself is lent out of the registry for the duration
/// of its step, so looking it up by name yields [`AgentError::AgentBusy`].
pub trait StepContext {
    /// The tick currently being executed.
    fn tick(&self) -> u64;

    /// Names of all registered agents, in stepping order.
    fn agent_names(&self) -> Vec<String>;

    /// Look up another agent by name.
    fn agent(&self, name: &str) -> Result<&dyn Agent, AgentError>;

    /// Look up another agent by name for mutation.
    fn agent_mut(&mut self, name: &str) -> Result<&mut dyn Agent, AgentError>;

    /// Borrow another agent's wallet for mutation.
    fn wallet_mut(&mut self, name: &str) -> Result<&mut Wallet, AgentError> {
        Ok(self.agent_mut(name)?.wallet_mut())
    }
}

/// A named economic actor owning exactly one wallet.
pub trait Agent: core::fmt::Debug {
    /// The embedded name and wallet.
    fn base(&self) -> &AgentBase;

    /// The embedded name and wallet, mutably.
    fn base_mut(&mut self) -> &mut AgentBase;

    /// Execute this agent's strategy for the current tick.
    ///
    /// Variants override this. The default reports that the agent has no
    /// strategy.
    fn take_step(&mut self, _ctx: &mut dyn StepContext) -> Result<(), AgentError> {
        Err(AgentError::NotImplemented {
            agent: self.name().to_owned(),
        })
    }

    /// The agent's unique name.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// The agent's wallet.
    fn wallet(&self) -> &Wallet {
        self.base().wallet()
    }

    /// The agent's wallet, mutably.
    fn wallet_mut(&mut self) -> &mut Wallet {
        self.base_mut().wallet_mut()
    }

    /// Current balance of `resource`.
    fn balance(&self, resource: Resource) -> f64 {
        self.wallet().balance(resource)
    }

    /// Cumulative amount of `resource` ever deposited.
    fn total_deposited(&self, resource: Resource) -> f64 {
        self.wallet().total_deposited(resource)
    }

    /// Receive `amount` of `resource` from outside the simulation.
    fn receive(&mut self, resource: Resource, amount: f64) -> Result<(), AgentError> {
        self.wallet_mut().deposit(resource, amount)
    }

    /// Send `amount` of `resource` to the named agent, or burn it when
    /// `destination` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::NotFound`] if the destination is not
    /// registered, [`AgentError::InvalidArgument`] if it names this agent,
    /// or any error from [`Wallet::transfer`].
    fn send_to(
        &mut self,
        ctx: &mut dyn StepContext,
        resource: Resource,
        destination: Option<&str>,
        amount: f64,
    ) -> Result<(), AgentError> {
        let Some(name) = destination else {
            return self.wallet_mut().transfer(resource, None, amount);
        };
        if name == self.name() {
            return Err(AgentError::InvalidArgument {
                reason: format!("agent {name} cannot send to itself"),
            });
        }
        let target = ctx.wallet_mut(name)?;
        self.wallet_mut().transfer(resource, Some(target), amount)
    }
}

/// Name and wallet shared by every agent variant.
#[derive(Debug)]
pub struct AgentBase {
    name: String,
    wallet: Wallet,
}

impl AgentBase {
    /// Create a ledger-free agent with the given endowments.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] for an empty name or a
    /// negative endowment.
    pub fn new(name: impl Into<String>, usd: f64, ocean: f64) -> Result<Self, AgentError> {
        Self::with_tolerance(name, usd, ocean, Tolerance::default())
    }

    /// Create a ledger-free agent with an explicit roundoff tolerance.
    pub fn with_tolerance(
        name: impl Into<String>,
        usd: f64,
        ocean: f64,
        tolerance: Tolerance,
    ) -> Result<Self, AgentError> {
        let name = validate_name(name.into())?;
        let wallet = Wallet::with_tolerance(usd, ocean, tolerance)?;
        Ok(Self { name, wallet })
    }

    /// Create an agent whose wallet mirrors every change onto a ledger.
    ///
    /// The endowments are funded on the ledger at construction.
    pub fn ledger_backed(
        name: impl Into<String>,
        usd: f64,
        ocean: f64,
        tolerance: Tolerance,
        binding: LedgerBinding,
    ) -> Result<Self, AgentError> {
        let name = validate_name(name.into())?;
        let wallet = Wallet::ledger_backed(usd, ocean, tolerance, binding)?;
        Ok(Self { name, wallet })
    }

    /// The agent's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The agent's wallet.
    pub const fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// The agent's wallet, mutably.
    pub const fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    /// Whether the wallet settles on an external ledger.
    pub const fn is_ledger_backed(&self) -> bool {
        self.wallet.is_ledger_backed()
    }
}

impl Agent for AgentBase {
    fn base(&self) -> &Self {
        self
    }

    fn base_mut(&mut self) -> &mut Self {
        self
    }
}

fn validate_name(name: String) -> Result<String, AgentError> {
    if name.trim().is_empty() {
        return Err(AgentError::InvalidArgument {
            reason: "agent name must not be empty".to_owned(),
        });
    }
    Ok(name)
}
