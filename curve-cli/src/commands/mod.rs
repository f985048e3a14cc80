//! Imperative shell: I/O around the pure logic and the ledger

pub mod quote;
pub mod simulate;

pub use quote::run_quote;
pub use simulate::{run_simulation, Simulation, SimulationSummary};
