//! Quadratic Bonding Curve Pricing
//!
//! Marginal price grows linearly with circulating supply:
//!
//! ```text
//!   price(x)          = k · 2x
//!   buy_cost(s, n)    = ∫[s, s+n] price = k · (2sn + n²)
//!   sell_reward(s, n) = ∫[s-n, s] price = k · (2sn − n²),   n ≤ s
//!   price_per_token(s) = buy_cost(s, 1) = k · (2s + 1)
//! ```
//!
//! Both integrals are path independent, so `buy_cost(s, n)` equals
//! `sell_reward(s + n, n)` exactly. All arithmetic is checked `u128`;
//! overflow is reported as [`ExchangeError::Overflow`] and never wraps.

use serde::{Deserialize, Serialize};

use lib_types::Amount;

use crate::errors::{ExchangeError, ExchangeResult};

/// Curve with constant `k` (currency atomic units per unit²)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuadraticCurve {
    k: Amount,
}

impl QuadraticCurve {
    /// Create a curve; `k` must be positive
    pub fn new(k: Amount) -> ExchangeResult<Self> {
        if k == 0 {
            return Err(ExchangeError::InvalidParameters(
                "Curve constant k must be greater than zero".to_string(),
            ));
        }
        Ok(Self { k })
    }

    /// Curve constant
    pub fn k(&self) -> Amount {
        self.k
    }

    /// Cost of buying `amount` units starting at circulating `supply`
    pub fn buy_cost(&self, supply: Amount, amount: Amount) -> ExchangeResult<Amount> {
        // k · (2·s·n + n²)
        let two_s_n = mul(mul(2, supply)?, amount)?;
        let n_sq = mul(amount, amount)?;
        let area = two_s_n.checked_add(n_sq).ok_or(ExchangeError::Overflow)?;
        mul(self.k, area)
    }

    /// Reward for selling `amount` units back at circulating `supply`
    pub fn sell_reward(&self, supply: Amount, amount: Amount) -> ExchangeResult<Amount> {
        if amount > supply {
            return Err(ExchangeError::SellExceedsSupply {
                requested: amount,
                supply,
            });
        }
        // k · (2·s·n − n²); n ≤ s keeps the difference non-negative
        let two_s_n = mul(mul(2, supply)?, amount)?;
        let n_sq = mul(amount, amount)?;
        let area = two_s_n.checked_sub(n_sq).ok_or(ExchangeError::Overflow)?;
        mul(self.k, area)
    }

    /// Price of the next single unit at `supply`
    pub fn price_per_token(&self, supply: Amount) -> ExchangeResult<Amount> {
        self.buy_cost(supply, 1)
    }
}

fn mul(a: Amount, b: Amount) -> ExchangeResult<Amount> {
    a.checked_mul(b).ok_or(ExchangeError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const K: Amount = 1_000_000_000_000;

    fn curve() -> QuadraticCurve {
        QuadraticCurve::new(K).unwrap()
    }

    #[test]
    fn test_zero_k_rejected() {
        assert!(matches!(
            QuadraticCurve::new(0),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_buy_from_empty_curve() {
        // k · 100² = 1e16
        assert_eq!(curve().buy_cost(0, 100).unwrap(), 10_000_000_000_000_000);
    }

    #[test]
    fn test_sell_back_full_supply() {
        // k · (2·100·100 − 100²) = 1e16
        assert_eq!(curve().sell_reward(100, 100).unwrap(), 10_000_000_000_000_000);
    }

    #[test]
    fn test_price_per_token() {
        let c = curve();
        assert_eq!(c.price_per_token(0).unwrap(), K);
        assert_eq!(c.price_per_token(100).unwrap(), K * 201);
    }

    #[test]
    fn test_sell_more_than_supply() {
        assert_eq!(
            curve().sell_reward(10, 11).unwrap_err(),
            ExchangeError::SellExceedsSupply { requested: 11, supply: 10 }
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        let c = curve();
        assert_eq!(c.buy_cost(Amount::MAX / 2, 2).unwrap_err(), ExchangeError::Overflow);
        assert_eq!(c.buy_cost(0, 1u128 << 64).unwrap_err(), ExchangeError::Overflow);
        assert_eq!(c.sell_reward(Amount::MAX, 1).unwrap_err(), ExchangeError::Overflow);

        let steep = QuadraticCurve::new(Amount::MAX).unwrap();
        assert_eq!(steep.price_per_token(0).unwrap(), Amount::MAX);
        assert_eq!(steep.price_per_token(1).unwrap_err(), ExchangeError::Overflow);
    }

    proptest! {
        #[test]
        fn prop_buy_then_sell_same_amount_is_symmetric(
            k in 1u128..1_000_000_000_000_000u128,
            s in 0u128..1_000_000_000u128,
            n in 1u128..1_000_000_000u128,
        ) {
            let c = QuadraticCurve::new(k).unwrap();
            prop_assert_eq!(c.buy_cost(s, n).unwrap(), c.sell_reward(s + n, n).unwrap());
        }

        #[test]
        fn prop_buy_cost_strictly_increasing(
            k in 1u128..1_000_000_000_000u128,
            s in 0u128..1_000_000_000u128,
            n in 1u128..1_000_000_000u128,
        ) {
            let c = QuadraticCurve::new(k).unwrap();
            let base = c.buy_cost(s, n).unwrap();
            prop_assert!(c.buy_cost(s + 1, n).unwrap() > base);
            prop_assert!(c.buy_cost(s, n + 1).unwrap() > base);
        }

        #[test]
        fn prop_split_purchases_cost_the_same(
            k in 1u128..1_000_000_000_000u128,
            s in 0u128..1_000_000u128,
            a in 1u128..1_000_000u128,
            b in 1u128..1_000_000u128,
        ) {
            let c = QuadraticCurve::new(k).unwrap();
            let whole = c.buy_cost(s, a + b).unwrap();
            let parts = c.buy_cost(s, a).unwrap() + c.buy_cost(s + a, b).unwrap();
            prop_assert_eq!(whole, parts);
        }

        #[test]
        fn prop_large_inputs_never_panic(
            k in 1u128..=Amount::MAX,
            s in 0u128..=Amount::MAX,
            n in 0u128..=Amount::MAX,
        ) {
            let c = QuadraticCurve::new(k).unwrap();
            let _ = c.buy_cost(s, n);
            let _ = c.sell_reward(s, n);
            let _ = c.price_per_token(s);
        }
    }
}
