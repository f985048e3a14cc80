//! Pure curve quotes

use serde::Serialize;

use lib_curve::{ExchangeError, FeeSchedule, FeeSplit, QuadraticCurve};
use lib_types::Amount;

use crate::error::CliResult;

/// Everything `quote` prints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteReport {
    pub k: Amount,
    pub supply: Amount,
    pub amount: Amount,
    /// Price of the next unit at `supply`
    pub price_per_token: Amount,
    pub buy_cost: Amount,
    pub buy_fees: FeeSplit,
    /// Added to the reserve by the buy
    pub reserve_increase: Amount,
    /// `None` when `amount > supply`
    pub sell_reward: Option<Amount>,
    pub sell_fees: Option<FeeSplit>,
    /// Paid to the seller after fees
    pub seller_proceeds: Option<Amount>,
}

pub fn build_quote(k: Amount, supply: Amount, amount: Amount, fees: FeeSchedule) -> CliResult<QuoteReport> {
    let curve = QuadraticCurve::new(k)?;
    fees.validate()?;

    let buy_cost = curve.buy_cost(supply, amount)?;
    let buy_fees = fees.split(buy_cost)?;

    let (sell_reward, sell_fees) = match curve.sell_reward(supply, amount) {
        Ok(reward) => (Some(reward), Some(fees.split(reward)?)),
        Err(ExchangeError::SellExceedsSupply { .. }) => (None, None),
        Err(e) => return Err(e.into()),
    };

    Ok(QuoteReport {
        k,
        supply,
        amount,
        price_per_token: curve.price_per_token(supply)?,
        buy_cost,
        buy_fees,
        reserve_increase: buy_fees.net(),
        sell_reward,
        sell_fees,
        seller_proceeds: sell_fees.map(|f| f.net()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_quote_hundred_units() {
        let report = build_quote(1_000_000_000_000, 0, 100, FeeSchedule::default()).unwrap();
        assert_eq!(report.buy_cost, 10_000_000_000_000_000);
        assert_eq!(report.buy_fees.creator, 5_000_000_000_000);
        assert_eq!(report.reserve_increase, 9_992_000_000_000_000);
        assert_eq!(report.price_per_token, 1_000_000_000_000);
        // Nothing to sell yet
        assert_eq!(report.sell_reward, None);
        assert_eq!(report.seller_proceeds, None);
    }

    #[test]
    fn test_quote_with_sell_side() {
        let report = build_quote(1_000_000_000_000, 100, 100, FeeSchedule::default()).unwrap();
        assert_eq!(report.sell_reward, Some(10_000_000_000_000_000));
        assert_eq!(report.seller_proceeds, Some(9_992_000_000_000_000));
    }

    #[test]
    fn test_quote_rejects_bad_input() {
        assert!(matches!(
            build_quote(0, 0, 1, FeeSchedule::default()),
            Err(CliError::Exchange(ExchangeError::InvalidParameters(_)))
        ));
        assert!(matches!(
            build_quote(1, Amount::MAX, 2, FeeSchedule::default()),
            Err(CliError::Exchange(ExchangeError::Overflow))
        ));
    }
}
