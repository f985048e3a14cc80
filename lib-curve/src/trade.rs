//! Buy, Sell and Deposit
//!
//! Each operation validates and quotes first, updates the exchange counters
//! second and only then pays out: fees to the creator and admin, tokens or
//! currency to the trader. Any failing step rolls the whole call back.
//!
//! The exchange and its token can never be the trading party: a transfer
//! from the exchange to itself moves nothing, so the reserve and supply
//! counters would grow with nothing behind them.

use tracing::debug;

use lib_types::{Address, Amount};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::events::CurveEvent;
use crate::exchange::{BuyQuote, SellQuote};
use crate::ledger::Ledger;

impl Ledger {
    /// Buy exactly `amount_out` units from `exchange`, offering `payment`
    ///
    /// The curve cost is charged and `payment - cost` is refunded.
    pub fn buy(
        &mut self,
        exchange: Address,
        buyer: Address,
        amount_out: Amount,
        payment: Amount,
    ) -> ExchangeResult<BuyQuote> {
        self.atomic("buy", |ledger| {
            ledger.check_counterparty(exchange, buyer)?;
            ledger.exchange_mut(&exchange)?.enter()?;

            let current = ledger.exchange_ref(&exchange)?;
            let quote = current.quote_buy(amount_out, payment)?;
            let config = *current.config();

            // Payment arrives with the call
            ledger.move_native(buyer, exchange, payment)?;

            ledger.exchange_mut(&exchange)?.apply_buy(&quote)?;

            ledger.pay_fee(exchange, config.creator, quote.fees.creator)?;
            ledger.pay_fee(exchange, config.admin, quote.fees.admin)?;

            ledger
                .send_tokens(config.token, exchange, buyer, amount_out)
                .map_err(ExchangeError::TokenTransferFailed)?;

            if quote.refund > 0 {
                ledger
                    .send_native(exchange, buyer, quote.refund)
                    .map_err(|reason| ExchangeError::NativeTransferFailed {
                        recipient: buyer,
                        reason,
                    })?;
            }

            let updated = ledger.exchange_mut(&exchange)?;
            updated.exit();
            let total_supply = updated.total_supply();
            let reserve_balance = updated.reserve_balance();
            let price = updated.current_price_per_token()?;

            debug!(
                "buy on {}: {} units for {} (fees {}/{}), supply {}",
                exchange.short(),
                amount_out,
                quote.cost,
                quote.fees.creator,
                quote.fees.admin,
                total_supply
            );

            let block_height = ledger.block_height();
            ledger.emit(CurveEvent::Bought {
                exchange,
                buyer,
                tokens_out: amount_out,
                amount_paid: quote.cost,
                creator_fee: quote.fees.creator,
                admin_fee: quote.fees.admin,
                total_supply,
                reserve_balance,
                price,
                block_height,
            });

            Ok(quote)
        })
    }

    /// Sell `amount_in` units back to `exchange`
    ///
    /// The seller must have approved the exchange for at least `amount_in`.
    pub fn sell(
        &mut self,
        exchange: Address,
        seller: Address,
        amount_in: Amount,
    ) -> ExchangeResult<SellQuote> {
        self.atomic("sell", |ledger| {
            ledger.check_counterparty(exchange, seller)?;
            ledger.exchange_mut(&exchange)?.enter()?;

            let current = ledger.exchange_ref(&exchange)?;
            let quote = current.quote_sell(amount_in)?;
            let config = *current.config();

            // Tokens come back into the vault before any currency leaves
            ledger
                .spend_tokens(config.token, exchange, seller, exchange, amount_in)
                .map_err(|e| match e {
                    ExchangeError::Token(inner) => ExchangeError::TokenTransferFailed(inner.to_string()),
                    other => other,
                })?;

            ledger.exchange_mut(&exchange)?.apply_sell(&quote)?;

            ledger.pay_fee(exchange, config.creator, quote.fees.creator)?;
            ledger.pay_fee(exchange, config.admin, quote.fees.admin)?;

            let proceeds = quote.seller_proceeds();
            ledger
                .send_native(exchange, seller, proceeds)
                .map_err(|reason| ExchangeError::NativeTransferFailed {
                    recipient: seller,
                    reason,
                })?;

            let updated = ledger.exchange_mut(&exchange)?;
            updated.exit();
            let total_supply = updated.total_supply();
            let reserve_balance = updated.reserve_balance();
            let price = updated.current_price_per_token()?;

            debug!(
                "sell on {}: {} units for {} (fees {}/{}), supply {}",
                exchange.short(),
                amount_in,
                proceeds,
                quote.fees.creator,
                quote.fees.admin,
                total_supply
            );

            let block_height = ledger.block_height();
            ledger.emit(CurveEvent::Sold {
                exchange,
                seller,
                tokens_in: amount_in,
                amount_paid: proceeds,
                creator_fee: quote.fees.creator,
                admin_fee: quote.fees.admin,
                total_supply,
                reserve_balance,
                price,
                block_height,
            });

            Ok(quote)
        })
    }

    /// Send currency to `exchange` outside any trade
    ///
    /// The reserve grows by `amount`; supply is unchanged.
    pub fn deposit(&mut self, exchange: Address, from: Address, amount: Amount) -> ExchangeResult<()> {
        self.atomic("deposit", |ledger| {
            if amount == 0 {
                return Err(ExchangeError::NonPositiveAmount);
            }
            ledger.check_counterparty(exchange, from)?;

            ledger.move_native(from, exchange, amount)?;
            let updated = ledger.exchange_mut(&exchange)?;
            updated.apply_deposit(amount)?;
            let reserve_balance = updated.reserve_balance();

            debug!(
                "deposit of {} into {}, reserve {}",
                amount,
                exchange.short(),
                reserve_balance
            );

            let block_height = ledger.block_height();
            ledger.emit(CurveEvent::ReserveDeposited {
                exchange,
                from,
                amount,
                reserve_balance,
                block_height,
            });
            Ok(())
        })
    }

    /// Reject the exchange itself or its token as the other side of a call
    fn check_counterparty(&self, exchange: Address, party: Address) -> ExchangeResult<()> {
        let token = self.exchange_ref(&exchange)?.token();
        if party == exchange || party == token {
            return Err(ExchangeError::InvalidParameters(format!(
                "{} cannot trade with exchange {}",
                party,
                exchange.short()
            )));
        }
        Ok(())
    }

    /// Fee payments are attempted even when the fee truncated to zero
    fn pay_fee(&mut self, exchange: Address, recipient: Address, amount: Amount) -> ExchangeResult<()> {
        self.send_native(exchange, recipient, amount)
            .map_err(|reason| ExchangeError::FeeTransferFailed { recipient, reason })
    }
}
