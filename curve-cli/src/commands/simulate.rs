//! Scenario replay
//!
//! Runs each step against a fresh ledger, printing the events it emits as
//! JSON. A failed step is reported and skipped; with `strict` it stops the
//! run.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use lib_curve::config::resolve_address;
use lib_curve::{CurveConfig, EventIndexer, ExchangeStats, Ledger};
use lib_types::Address;

use crate::error::{CliError, CliResult};
use crate::output::{print_json, Output};
use crate::scenario::{Scenario, Step};

/// Result of a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub steps: usize,
    pub failed: usize,
    pub events: usize,
    /// Final state of every pair, by scenario label
    pub exchanges: BTreeMap<String, ExchangeStats>,
}

/// Ledger plus the labels scenario steps use for pairs
pub struct Simulation {
    ledger: Ledger,
    /// label -> (token, exchange)
    pairs: BTreeMap<String, (Address, Address)>,
}

impl Simulation {
    pub fn new(config: &CurveConfig) -> CliResult<Self> {
        Ok(Self {
            ledger: Ledger::new(config.factory_settings()?)?,
            pairs: BTreeMap::new(),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    /// (token, exchange) for a pair label
    pub fn pair(&self, label: &str) -> CliResult<(Address, Address)> {
        self.pairs
            .get(label)
            .copied()
            .ok_or_else(|| CliError::UnknownPair(label.to_string()))
    }

    pub fn apply(&mut self, step: &Step) -> CliResult<()> {
        match step {
            Step::Fund { to, amount } => {
                self.ledger.mint_native(resolve_address(to)?, *amount)?;
            }
            Step::Create { pair, creator, name, symbol, supply, decimals } => {
                if self.pairs.contains_key(pair) {
                    return Err(CliError::ScenarioError(format!("pair '{}' already defined", pair)));
                }
                let created = self.ledger.create_pair(
                    resolve_address(creator)?,
                    name,
                    symbol,
                    *supply,
                    *decimals,
                )?;
                self.pairs.insert(pair.clone(), created);
            }
            Step::Approve { pair, owner, amount } => {
                let (token, exchange) = self.pair(pair)?;
                self.ledger
                    .token_approve(token, resolve_address(owner)?, exchange, *amount)?;
            }
            Step::Buy { pair, buyer, amount, payment } => {
                let (_, exchange) = self.pair(pair)?;
                self.ledger
                    .buy(exchange, resolve_address(buyer)?, *amount, *payment)?;
            }
            Step::Sell { pair, seller, amount } => {
                let (_, exchange) = self.pair(pair)?;
                self.ledger.sell(exchange, resolve_address(seller)?, *amount)?;
            }
            Step::Deposit { pair, from, amount } => {
                let (_, exchange) = self.pair(pair)?;
                self.ledger.deposit(exchange, resolve_address(from)?, *amount)?;
            }
            Step::UpdateAdmin { caller, new_admin } => {
                self.ledger
                    .update_factory_admin(resolve_address(caller)?, resolve_address(new_admin)?)?;
            }
            Step::AdvanceBlock => {
                self.ledger.advance_block();
            }
        }
        Ok(())
    }

    /// Stats for every labelled pair
    pub fn exchange_stats(&self) -> CliResult<BTreeMap<String, ExchangeStats>> {
        let mut stats = BTreeMap::new();
        for (label, (_, exchange)) in &self.pairs {
            stats.insert(label.clone(), self.ledger.exchange_stats(exchange)?);
        }
        Ok(stats)
    }
}

/// Replay `scenario`, sending committed events to `output` and `indexer`
pub fn run_simulation(
    scenario: &Scenario,
    config: &CurveConfig,
    strict: bool,
    mut indexer: Option<&mut dyn EventIndexer>,
    output: &dyn Output,
) -> CliResult<SimulationSummary> {
    let mut simulation = Simulation::new(config)?;
    let mut failed = 0;
    let mut events = 0;

    for (index, step) in scenario.steps.iter().enumerate() {
        if let Err(e) = simulation.apply(step) {
            failed += 1;
            warn!("step {} ({}) failed: {}", index, step.action(), e);
            output.error(&format!("step {} ({}) failed: {}", index, step.action(), e))?;
            if strict {
                return Err(CliError::StepFailed {
                    index,
                    action: step.action().to_string(),
                    reason: e.to_string(),
                });
            }
            continue;
        }

        for event in simulation.ledger_mut().drain_events() {
            print_json(output, &event)?;
            if let Some(indexer) = indexer.as_mut() {
                indexer.index_event(event);
            }
            events += 1;
        }
    }

    let summary = SimulationSummary {
        steps: scenario.steps.len(),
        failed,
        events,
        exchanges: simulation.exchange_stats()?,
    };
    info!(
        "scenario finished: {} steps, {} failed, {} events",
        summary.steps, summary.failed, summary.events
    );
    Ok(summary)
}
