//! Pair deployment and factory administration

use tracing::info;

use lib_tokens::CreatorToken;
use lib_types::{Address, Amount};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::events::CurveEvent;
use crate::exchange::Exchange;
use crate::ledger::Ledger;

impl Ledger {
    /// Deploy a token with a fixed `total_supply` and its exchange
    ///
    /// The caller becomes the pair's creator. The whole supply is moved into
    /// the exchange vault. Returns `(token, exchange)`.
    pub fn create_pair(
        &mut self,
        caller: Address,
        name: &str,
        symbol: &str,
        total_supply: Amount,
        decimals: u8,
    ) -> ExchangeResult<(Address, Address)> {
        self.atomic("create_pair", |ledger| {
            if caller.is_zero() {
                return Err(ExchangeError::ZeroAddress);
            }
            if total_supply == 0 {
                return Err(ExchangeError::NonPositiveAmount);
            }
            if name.trim().is_empty() || symbol.trim().is_empty() {
                return Err(ExchangeError::InvalidParameters(
                    "Token name and symbol are required".to_string(),
                ));
            }

            let factory = ledger.factory();
            let factory_address = factory.address;
            let (token_address, exchange_address) = factory.next_addresses();
            let config = factory.exchange_config(token_address, caller);

            let token = CreatorToken::new(
                token_address,
                factory_address,
                name.to_string(),
                symbol.to_string(),
                total_supply,
                decimals,
            )?;
            let exchange = Exchange::new(exchange_address, config)?;

            ledger.insert_token(token);
            ledger.insert_exchange(exchange);
            ledger.with_token(
                token_address,
                |t| {
                    vec![
                        t.balance_entry(token_address),
                        t.balance_entry(exchange_address),
                        t.withdrawn_entry(),
                    ]
                },
                |t| t.withdraw_to(factory_address, exchange_address, total_supply),
            )?;
            ledger.register_pair(caller, token_address, exchange_address)?;

            info!(
                "pair created: {} ({}) token {} exchange {} for creator {}",
                name,
                symbol,
                token_address.short(),
                exchange_address.short(),
                caller.short()
            );

            let block_height = ledger.block_height();
            ledger.emit(CurveEvent::PairCreated {
                creator: caller,
                token: token_address,
                exchange: exchange_address,
                initial_supply: total_supply,
                block_height,
            });

            Ok((token_address, exchange_address))
        })
    }

    /// Change the admin captured by future deployments
    pub fn update_factory_admin(&mut self, caller: Address, new_admin: Address) -> ExchangeResult<()> {
        self.atomic("update_admin", |ledger| {
            let previous = ledger.set_factory_admin(caller, new_admin)?;

            info!("factory admin changed from {} to {}", previous.short(), new_admin.short());

            let block_height = ledger.block_height();
            ledger.emit(CurveEvent::AdminUpdated {
                previous,
                new_admin,
                block_height,
            });
            Ok(())
        })
    }
}
