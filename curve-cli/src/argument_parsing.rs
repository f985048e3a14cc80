//! Curve CLI argument parsing and dispatch

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lib_curve::{CurveConfig, SledEventIndexer};
use lib_types::Amount;

use crate::commands::{run_quote, run_simulation};
use crate::output::{print_json, ConsoleOutput, Output};
use crate::scenario::Scenario;

/// Creator-token bonding curve tool
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(name = "curve-cli")]
pub struct CurveCli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CURVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides the config file)
    #[arg(long, global = true, env = "CURVE_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: CurveCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CurveCommand {
    /// Price a buy and a sell of AMOUNT units at SUPPLY
    Quote(QuoteArgs),
    /// Replay a scenario file on a fresh ledger
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct QuoteArgs {
    /// Curve constant (defaults to the config's default_k)
    #[arg(long)]
    pub k: Option<Amount>,

    /// Circulating supply
    #[arg(long, default_value_t = 0)]
    pub supply: Amount,

    /// Units to buy or sell
    #[arg(long)]
    pub amount: Amount,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Scenario TOML file
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Persist events to a sled index in this directory
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Stop at the first failed step
    #[arg(long)]
    pub strict: bool,
}

/// Parse arguments and run the selected command
pub fn run_cli() -> Result<()> {
    let cli = CurveCli::parse();

    let config = match &cli.config {
        Some(path) => CurveConfig::load(path)?,
        None => CurveConfig::default(),
    };
    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    let output = ConsoleOutput;
    match cli.command {
        CurveCommand::Quote(args) => {
            run_quote(args.k.unwrap_or(config.default_k), args.supply, args.amount, config.fees, &output)?;
        }
        CurveCommand::Simulate(args) => simulate(args, config, &output)?,
    }
    Ok(())
}

fn simulate(args: SimulateArgs, config: CurveConfig, output: &dyn Output) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    let config = scenario.config.clone().unwrap_or(config);

    let mut sled_indexer = match &args.index_dir {
        Some(dir) => Some(
            SledEventIndexer::open(dir)
                .with_context(|| format!("Failed to open event index {}", dir.display()))?,
        ),
        None => None,
    };

    let summary = run_simulation(
        &scenario,
        &config,
        args.strict,
        sled_indexer
            .as_mut()
            .map(|indexer| indexer as &mut dyn lib_curve::EventIndexer),
        output,
    )?;

    if let Some(indexer) = &sled_indexer {
        indexer.flush().context("Failed to flush event index")?;
    }

    output.header("Summary")?;
    print_json(output, &summary)?;
    Ok(())
}

/// Initialise tracing; `RUST_LOG` wins over `default_level`
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CurveCli::command().debug_assert();
    }

    #[test]
    fn test_parse_quote() {
        let cli = CurveCli::try_parse_from([
            "curve-cli", "quote", "--k", "1000", "--supply", "5", "--amount", "10",
        ])
        .unwrap();
        match cli.command {
            CurveCommand::Quote(args) => {
                assert_eq!(args.k, Some(1_000));
                assert_eq!(args.supply, 5);
                assert_eq!(args.amount, 10);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_simulate() {
        let cli = CurveCli::try_parse_from([
            "curve-cli", "simulate", "--scenario", "s.toml", "--strict", "--config", "c.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        match cli.command {
            CurveCommand::Simulate(args) => {
                assert!(args.strict);
                assert_eq!(args.scenario, PathBuf::from("s.toml"));
                assert!(args.index_dir.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_amount_is_rejected() {
        assert!(CurveCli::try_parse_from(["curve-cli", "quote", "--k", "1"]).is_err());
    }
}
