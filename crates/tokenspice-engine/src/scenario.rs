//! Scenario construction for the engine.
//!
//! The `scenario` section of `tokenspice-config.yaml` lists the agents to
//! register, in stepping order, and whether their wallets settle on a
//! ledger. Without that section the engine runs the demo economy: a
//! granter paying a taker, who spends into a router splitting between two
//! sinks.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tokenspice_agents::{
    AgentBase, GrantGivingAgent, GrantTakingAgent, NoiseTraderAgent, RouterAgent,
    ScheduledTransfer, ScheduledTransferAgent,
};
use tokenspice_core::config::SimulationConfig;
use tokenspice_core::state::SimulationState;
use tokenspice_ledger::{LedgerBinding, LedgerMirror, MemoryLedger, ResourceAddresses};
use tokenspice_types::LedgerAccount;
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// The agents to simulate, loaded from the `scenario` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioConfig {
    /// Mirror every wallet onto an in-process settlement ledger.
    #[serde(default)]
    pub ledger_backed: bool,

    /// Agents in registration (and stepping) order.
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentSpec>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            ledger_backed: false,
            agents: default_agents(),
        }
    }
}

/// One agent in the scenario.
///
/// Endowments left out fall back to `economy.initial_usd` and
/// `economy.initial_ocean`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentSpec {
    /// A [`GrantGivingAgent`].
    GrantGiver {
        /// Unique agent name.
        name: String,
        /// USD endowment.
        #[serde(default)]
        usd: Option<f64>,
        /// OCEAN endowment.
        #[serde(default)]
        ocean: Option<f64>,
        /// Agent receiving the grants.
        receiver: String,
        /// Ticks between consecutive grants.
        #[serde(default = "default_ticks_between_grants")]
        ticks_between_grants: u64,
        /// Number of grants the OCEAN endowment is split into.
        n_grants: u32,
    },
    /// A [`GrantTakingAgent`].
    GrantTaker {
        /// Unique agent name.
        name: String,
        /// USD endowment.
        #[serde(default)]
        usd: Option<f64>,
        /// OCEAN endowment.
        #[serde(default)]
        ocean: Option<f64>,
        /// Agent receiving the spent grants; burned when absent.
        #[serde(default)]
        spend_to: Option<String>,
    },
    /// A [`RouterAgent`].
    Router {
        /// Unique agent name.
        name: String,
        /// USD endowment.
        #[serde(default)]
        usd: Option<f64>,
        /// OCEAN endowment.
        #[serde(default)]
        ocean: Option<f64>,
        /// Recipients and their fractions.
        recipients: Vec<RouteSpec>,
    },
    /// A [`ScheduledTransferAgent`]; with no schedule it only holds funds.
    Scheduled {
        /// Unique agent name.
        name: String,
        /// USD endowment.
        #[serde(default)]
        usd: Option<f64>,
        /// OCEAN endowment.
        #[serde(default)]
        ocean: Option<f64>,
        /// Scripted transfers.
        #[serde(default)]
        schedule: Vec<ScheduledTransfer>,
    },
    /// A [`NoiseTraderAgent`], seeded from `simulation.seed` and its
    /// position in the list.
    NoiseTrader {
        /// Unique agent name.
        name: String,
        /// USD endowment.
        #[serde(default)]
        usd: Option<f64>,
        /// OCEAN endowment.
        #[serde(default)]
        ocean: Option<f64>,
        /// Per-resource chance of trading each tick.
        trade_probability: f64,
        /// Largest fraction of a balance moved in one trade.
        max_fraction: f64,
    },
}

impl AgentSpec {
    /// The agent's name.
    pub fn name(&self) -> &str {
        match self {
            Self::GrantGiver { name, .. }
            | Self::GrantTaker { name, .. }
            | Self::Router { name, .. }
            | Self::Scheduled { name, .. }
            | Self::NoiseTrader { name, .. } => name,
        }
    }

    const fn endowment(&self) -> (Option<f64>, Option<f64>) {
        match self {
            Self::GrantGiver { usd, ocean, .. }
            | Self::GrantTaker { usd, ocean, .. }
            | Self::Router { usd, ocean, .. }
            | Self::Scheduled { usd, ocean, .. }
            | Self::NoiseTrader { usd, ocean, .. } => (*usd, *ocean),
        }
    }
}

/// A router recipient.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteSpec {
    /// Receiving agent.
    pub to: String,
    /// Share of each balance sent to it.
    pub fraction: f64,
}

const fn default_ticks_between_grants() -> u64 {
    1
}

fn scheduled(name: &str) -> AgentSpec {
    AgentSpec::Scheduled {
        name: name.to_owned(),
        usd: None,
        ocean: None,
        schedule: Vec::new(),
    }
}

fn default_agents() -> Vec<AgentSpec> {
    vec![
        AgentSpec::GrantGiver {
            name: String::from("granter"),
            usd: None,
            ocean: Some(200.0),
            receiver: String::from("taker"),
            ticks_between_grants: 2,
            n_grants: 5,
        },
        AgentSpec::GrantTaker {
            name: String::from("taker"),
            usd: None,
            ocean: None,
            spend_to: Some(String::from("router")),
        },
        AgentSpec::Router {
            name: String::from("router"),
            usd: None,
            ocean: None,
            recipients: vec![
                RouteSpec {
                    to: String::from("sink_a"),
                    fraction: 0.7,
                },
                RouteSpec {
                    to: String::from("sink_b"),
                    fraction: 0.3,
                },
            ],
        },
        scheduled("sink_a"),
        scheduled("sink_b"),
    ]
}

// -----------------------------------------------------------------------
// Loading
// -----------------------------------------------------------------------

/// Load the scenario from the config file at `path`.
///
/// Reads the `scenario` section of the YAML file. If the file does not
/// exist or lacks the `scenario` key, the demo scenario is used.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, EngineError> {
    if !path.exists() {
        return Ok(ScenarioConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Scenario {
        message: format!("failed to read config file: {e}"),
    })?;
    parse_scenario(&contents)
}

/// Parse the `scenario` section out of a full config document.
pub fn parse_scenario(yaml: &str) -> Result<ScenarioConfig, EngineError> {
    if yaml.trim().is_empty() {
        return Ok(ScenarioConfig::default());
    }
    let raw: serde_yml::Value = serde_yml::from_str(yaml).map_err(|e| EngineError::Scenario {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("scenario").map_or_else(
        || Ok(ScenarioConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Scenario {
                message: format!("failed to parse scenario: {e}"),
            })
        },
    )
}

// -----------------------------------------------------------------------
// Building
// -----------------------------------------------------------------------

/// A ready-to-run simulation.
#[derive(Debug)]
pub struct Scenario {
    /// The populated registry.
    pub state: SimulationState,
    /// The settlement ledger, for ledger-backed scenarios.
    pub ledger: Option<Arc<MemoryLedger>>,
}

/// Register every agent of `scenario` into a fresh state.
///
/// # Errors
///
/// Returns [`EngineError::Config`] for an unusable tolerance, or
/// [`EngineError::Agent`] for an invalid agent or a duplicate name.
pub fn build_scenario(
    config: &SimulationConfig,
    scenario: &ScenarioConfig,
) -> Result<Scenario, EngineError> {
    let tolerance = config.economy.tolerance()?;
    let mut state = SimulationState::from_config(config)?;
    let ledger = scenario.ledger_backed.then(|| Arc::new(MemoryLedger::new()));
    let addresses = ResourceAddresses::default();

    for (index, spec) in (0_u64..).zip(&scenario.agents) {
        let (usd, ocean) = spec.endowment();
        let usd = usd.unwrap_or(config.economy.initial_usd);
        let ocean = ocean.unwrap_or(config.economy.initial_ocean);

        let base = match &ledger {
            Some(ledger) => {
                let mirror: Arc<dyn LedgerMirror> = ledger.clone();
                let account = LedgerAccount::new(account_address(index));
                let binding = LedgerBinding::new(account, addresses.clone(), mirror);
                AgentBase::ledger_backed(spec.name(), usd, ocean, tolerance, binding)?
            }
            None => AgentBase::with_tolerance(spec.name(), usd, ocean, tolerance)?,
        };

        register(&mut state, spec, base, config.simulation.seed.wrapping_add(index))?;
    }

    info!(
        agents = state.len(),
        ledger_backed = scenario.ledger_backed,
        "Scenario built"
    );

    Ok(Scenario { state, ledger })
}

fn register(
    state: &mut SimulationState,
    spec: &AgentSpec,
    base: AgentBase,
    seed: u64,
) -> Result<(), EngineError> {
    match spec {
        AgentSpec::GrantGiver {
            receiver,
            ticks_between_grants,
            n_grants,
            ..
        } => state.add_agent(GrantGivingAgent::new(
            base,
            receiver.clone(),
            *ticks_between_grants,
            *n_grants,
        )?)?,
        AgentSpec::GrantTaker { spend_to, .. } => {
            state.add_agent(GrantTakingAgent::new(base, spend_to.clone()))?;
        }
        AgentSpec::Router { recipients, .. } => {
            let recipients = recipients
                .iter()
                .map(|route| (route.to.clone(), route.fraction))
                .collect();
            state.add_agent(RouterAgent::new(base, recipients)?)?;
        }
        AgentSpec::Scheduled { schedule, .. } => {
            state.add_agent(ScheduledTransferAgent::new(base, schedule.clone()))?;
        }
        AgentSpec::NoiseTrader {
            trade_probability,
            max_fraction,
            ..
        } => state.add_agent(NoiseTraderAgent::new(
            base,
            seed,
            *trade_probability,
            *max_fraction,
        )?)?,
    }
    Ok(())
}

/// Deterministic ledger account for the agent at `index`.
fn account_address(index: u64) -> String {
    format!("0x{:040x}", u128::from(index).saturating_add(1))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use tokenspice_core::runner::{NoOpCallback, run_simulation};
    use tokenspice_ledger::Tolerance;
    use tokenspice_types::Resource;

    use super::*;

    fn ocean(state: &SimulationState, name: &str) -> f64 {
        state.get_agent(name).unwrap().balance(Resource::Ocean)
    }

    #[test]
    fn missing_section_yields_demo_scenario() {
        let scenario = parse_scenario("simulation:\n  max_ticks: 3\n").unwrap();
        assert_eq!(scenario, ScenarioConfig::default());
        let names: Vec<&str> = scenario.agents.iter().map(AgentSpec::name).collect();
        assert_eq!(names, ["granter", "taker", "router", "sink_a", "sink_b"]);
    }

    #[test]
    fn demo_scenario_routes_every_grant() {
        let config = SimulationConfig::default();
        let mut built = build_scenario(&config, &ScenarioConfig::default()).unwrap();
        assert!(built.ledger.is_none());

        run_simulation(&mut built.state, 10, &mut NoOpCallback).unwrap();

        let tolerance = Tolerance::default();
        assert!(tolerance.is_zero(ocean(&built.state, "granter")));
        assert!(tolerance.approx_eq(ocean(&built.state, "sink_a"), 140.0));
        assert!(tolerance.approx_eq(ocean(&built.state, "sink_b"), 60.0));
    }

    #[test]
    fn parses_tagged_agent_list() {
        let yaml = r"
scenario:
  ledger_backed: true
  agents:
    - kind: scheduled
      name: payer
      usd: 10.0
      schedule:
        - { tick: 1, resource: usd, destination: payee, amount: 4.0 }
        - { tick: 2, resource: usd, amount: 1.0 }
    - kind: scheduled
      name: payee
    - kind: noise_trader
      name: noise
      ocean: 5.0
      trade_probability: 0.5
      max_fraction: 0.1
";
        let scenario = parse_scenario(yaml).unwrap();
        assert!(scenario.ledger_backed);
        assert_eq!(scenario.agents.len(), 3);
        assert!(matches!(
            &scenario.agents[0],
            AgentSpec::Scheduled { usd: Some(usd), schedule, .. }
                if *usd == 10.0 && schedule.len() == 2 && schedule[1].destination.is_none()
        ));
        assert_eq!(scenario.agents[2].name(), "noise");
    }

    #[test]
    fn ledger_backed_scenario_stays_in_sync() {
        let yaml = r"
scenario:
  ledger_backed: true
  agents:
    - kind: scheduled
      name: payer
      usd: 10.0
      schedule:
        - { tick: 1, resource: usd, destination: payee, amount: 4.0 }
        - { tick: 2, resource: usd, amount: 1.0 }
    - kind: scheduled
      name: payee
";
        let scenario = parse_scenario(yaml).unwrap();
        let mut built = build_scenario(&SimulationConfig::default(), &scenario).unwrap();
        run_simulation(&mut built.state, 2, &mut NoOpCallback).unwrap();

        for name in ["payer", "payee"] {
            let agent = built.state.get_agent(name).unwrap();
            assert!(agent.wallet().is_ledger_backed());
            agent.wallet().verify_ledger_sync().unwrap();
        }
        let usd = |name: &str| built.state.get_agent(name).unwrap().balance(Resource::Usd);
        assert_eq!(usd("payer"), 5.0);
        assert_eq!(usd("payee"), 4.0);
        assert!(built.ledger.is_some());
    }

    #[test]
    fn endowments_fall_back_to_economy_defaults() {
        let config =
            SimulationConfig::parse("economy:\n  initial_usd: 3.0\n  initial_ocean: 1.5\n")
                .unwrap();
        let built = build_scenario(&config, &ScenarioConfig::default()).unwrap();
        let sink = built.state.get_agent("sink_a").unwrap();
        assert_eq!(sink.balance(Resource::Usd), 3.0);
        assert_eq!(sink.balance(Resource::Ocean), 1.5);
        // An explicit endowment wins.
        assert_eq!(ocean(&built.state, "granter"), 200.0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let scenario = ScenarioConfig {
            ledger_backed: false,
            agents: vec![scheduled("twin"), scheduled("twin")],
        };
        let result = build_scenario(&SimulationConfig::default(), &scenario);
        assert!(matches!(result, Err(EngineError::Agent { .. })));
    }

    #[test]
    fn unknown_kind_is_a_scenario_error() {
        let result = parse_scenario("scenario:\n  agents:\n    - kind: oracle\n      name: x\n");
        assert!(matches!(result, Err(EngineError::Scenario { .. })));
    }

    #[test]
    fn project_config_describes_the_demo_scenario() {
        let yaml = include_str!("../../../tokenspice-config.yaml");
        assert_eq!(parse_scenario(yaml).unwrap(), ScenarioConfig::default());
    }

    #[test]
    fn account_addresses_are_unique_and_padded() {
        assert_eq!(account_address(0).len(), 42);
        assert_ne!(account_address(0), account_address(1));
    }
}
