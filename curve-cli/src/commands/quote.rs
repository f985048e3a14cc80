//! `quote` command

use lib_curve::FeeSchedule;
use lib_types::Amount;

use crate::error::CliResult;
use crate::logic::build_quote;
use crate::output::{print_json, Output};

pub fn run_quote(
    k: Amount,
    supply: Amount,
    amount: Amount,
    fees: FeeSchedule,
    output: &dyn Output,
) -> CliResult<()> {
    let report = build_quote(k, supply, amount, fees)?;
    print_json(output, &report)
}
