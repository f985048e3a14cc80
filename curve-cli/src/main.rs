//! Entry point for the curve-cli binary

use curve_cli::run_cli;

fn main() -> anyhow::Result<()> {
    run_cli()
}
