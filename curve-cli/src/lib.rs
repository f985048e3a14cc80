//! Curve CLI Library
//!
//! Command-line front end for the creator-token bonding curve:
//!
//! - `quote`: price a buy and a sell at a given supply
//! - `simulate`: replay a TOML scenario on a fresh in-memory ledger and
//!   print every emitted event
//!
//! Pure computation lives in `logic/`; `commands/` does the I/O.

pub mod argument_parsing;
pub mod commands;
pub mod error;
pub mod logic;
pub mod output;
pub mod scenario;

pub use argument_parsing::{init_logging, run_cli, CurveCli, CurveCommand};
pub use error::{CliError, CliResult};
pub use output::{CapturedOutput, ConsoleOutput, Output};
pub use scenario::{Scenario, Step};
