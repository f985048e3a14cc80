//! Bonding Curve Exchange
//!
//! Per (creator, token) market maker. The exchange holds a currency reserve
//! and prices trades on a [`QuadraticCurve`]. This module is the pure state
//! machine: quoting, counter updates and the reentrancy flag. Moving
//! currency and tokens is done by the ledger (see `trade.rs`), which wraps
//! each call in a rollback boundary.
//!
//! # Invariants
//! - `config` is frozen at construction; later factory changes never reach it
//! - `total_supply` and `reserve_balance` change together or not at all
//! - `reserve_balance` only drops on a sell, by exactly the sell reward
//! - At most one buy/sell is in progress per exchange (`locked`)

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::fees::{FeeSchedule, FeeSplit};
use crate::pricing::QuadraticCurve;

/// Configuration captured once when the exchange is deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Paired token
    pub token: Address,
    /// Creator fee recipient
    pub creator: Address,
    /// Admin fee recipient
    pub admin: Address,
    /// Pricing curve
    pub curve: QuadraticCurve,
    /// Fee rates
    pub fees: FeeSchedule,
}

/// Everything a buy will do, computed before any state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyQuote {
    /// Units the buyer receives
    pub amount_out: Amount,
    /// Currency the buyer offered
    pub payment: Amount,
    /// Curve cost of `amount_out` at the current supply
    pub cost: Amount,
    /// Fees on `cost`
    pub fees: FeeSplit,
    /// Returned to the buyer (`payment - cost`)
    pub refund: Amount,
}

impl BuyQuote {
    /// Increase of `reserve_balance` (`cost - total fee`)
    pub fn reserve_increase(&self) -> Amount {
        self.fees.net()
    }
}

/// Everything a sell will do, computed before any state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    /// Units the seller returns to the vault
    pub amount_in: Amount,
    /// Curve reward for `amount_in` at the current supply
    pub payout: Amount,
    /// Fees on `payout`
    pub fees: FeeSplit,
}

impl SellQuote {
    /// Currency the seller receives (`payout - total fee`)
    pub fn seller_proceeds(&self) -> Amount {
        self.fees.net()
    }
}

/// Exchange state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Exchange address (also the vault holding the paired token)
    pub address: Address,
    config: ExchangeConfig,
    /// Units sold through this curve and not yet sold back
    total_supply: Amount,
    /// Currency backing the circulating units
    reserve_balance: Amount,
    /// Set while a buy/sell is executing
    locked: bool,
}

impl Exchange {
    /// Create an exchange with empty counters
    pub fn new(address: Address, config: ExchangeConfig) -> ExchangeResult<Self> {
        if address.is_zero()
            || config.token.is_zero()
            || config.creator.is_zero()
            || config.admin.is_zero()
        {
            return Err(ExchangeError::ZeroAddress);
        }
        config.fees.validate()?;

        Ok(Self {
            address,
            config,
            total_supply: 0,
            reserve_balance: 0,
            locked: false,
        })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn token(&self) -> Address {
        self.config.token
    }

    pub fn creator(&self) -> Address {
        self.config.creator
    }

    pub fn admin(&self) -> Address {
        self.config.admin
    }

    pub fn k(&self) -> Amount {
        self.config.curve.k()
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn reserve_balance(&self) -> Amount {
        self.reserve_balance
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    // =========================================================================
    // Pricing views
    // =========================================================================

    /// Cost of buying `amount` units now
    pub fn buy_cost(&self, amount: Amount) -> ExchangeResult<Amount> {
        self.config.curve.buy_cost(self.total_supply, amount)
    }

    /// Reward for selling `amount` units now
    pub fn sell_reward(&self, amount: Amount) -> ExchangeResult<Amount> {
        self.config.curve.sell_reward(self.total_supply, amount)
    }

    /// Price of the next single unit
    pub fn current_price_per_token(&self) -> ExchangeResult<Amount> {
        self.config.curve.price_per_token(self.total_supply)
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Validate and price a buy of `amount_out` units paid with `payment`
    pub fn quote_buy(&self, amount_out: Amount, payment: Amount) -> ExchangeResult<BuyQuote> {
        if amount_out == 0 {
            return Err(ExchangeError::NonPositiveAmount);
        }

        let cost = self.buy_cost(amount_out)?;
        if payment < cost {
            return Err(ExchangeError::InsufficientPayment {
                required: cost,
                provided: payment,
            });
        }

        Ok(BuyQuote {
            amount_out,
            payment,
            cost,
            fees: self.config.fees.split(cost)?,
            refund: payment - cost,
        })
    }

    /// Validate and price a sell of `amount_in` units
    pub fn quote_sell(&self, amount_in: Amount) -> ExchangeResult<SellQuote> {
        if amount_in == 0 {
            return Err(ExchangeError::NonPositiveAmount);
        }
        if amount_in > self.total_supply {
            return Err(ExchangeError::SellExceedsSupply {
                requested: amount_in,
                supply: self.total_supply,
            });
        }

        let payout = self.sell_reward(amount_in)?;
        if self.reserve_balance < payout {
            return Err(ExchangeError::InsufficientReserve {
                required: payout,
                available: self.reserve_balance,
            });
        }

        Ok(SellQuote {
            amount_in,
            payout,
            fees: self.config.fees.split(payout)?,
        })
    }

    // =========================================================================
    // Reentrancy guard
    // =========================================================================

    /// Mark a buy/sell as in progress; fails if one already is
    pub fn enter(&mut self) -> ExchangeResult<()> {
        if self.locked {
            return Err(ExchangeError::ReentrancyRejected);
        }
        self.locked = true;
        Ok(())
    }

    /// Clear the in-progress flag
    pub fn exit(&mut self) {
        self.locked = false;
    }

    // =========================================================================
    // Counter effects
    // =========================================================================

    /// `total_supply += amount_out`, `reserve_balance += cost - total fee`
    pub fn apply_buy(&mut self, quote: &BuyQuote) -> ExchangeResult<()> {
        let supply = self
            .total_supply
            .checked_add(quote.amount_out)
            .ok_or(ExchangeError::Overflow)?;
        let reserve = self
            .reserve_balance
            .checked_add(quote.reserve_increase())
            .ok_or(ExchangeError::Overflow)?;

        self.total_supply = supply;
        self.reserve_balance = reserve;
        Ok(())
    }

    /// `total_supply -= amount_in`, `reserve_balance -= payout`
    pub fn apply_sell(&mut self, quote: &SellQuote) -> ExchangeResult<()> {
        let supply = self
            .total_supply
            .checked_sub(quote.amount_in)
            .ok_or(ExchangeError::SellExceedsSupply {
                requested: quote.amount_in,
                supply: self.total_supply,
            })?;
        let reserve = self
            .reserve_balance
            .checked_sub(quote.payout)
            .ok_or(ExchangeError::InsufficientReserve {
                required: quote.payout,
                available: self.reserve_balance,
            })?;

        self.total_supply = supply;
        self.reserve_balance = reserve;
        Ok(())
    }

    /// Direct currency deposit: reserve grows, supply does not
    pub fn apply_deposit(&mut self, amount: Amount) -> ExchangeResult<()> {
        self.reserve_balance = self
            .reserve_balance
            .checked_add(amount)
            .ok_or(ExchangeError::Overflow)?;
        Ok(())
    }
}
