//! Creator Token Bonding Curve
//!
//! A factory deploys, per (creator, token), a fixed-supply token and an
//! exchange that sells units of it on a quadratic curve against the native
//! currency and buys them back.
//!
//! # Key Types
//!
//! - [`QuadraticCurve`]: checked `k·(2sn ± n²)` pricing
//! - [`FeeSchedule`]: creator/admin basis-point fees with truncation
//! - [`Exchange`]: supply and reserve counters, quotes, reentrancy flag
//! - [`Factory`]: pair deployment and the `creator -> token -> exchange` registry
//! - [`Ledger`]: world state; runs `create_pair`, `buy`, `sell` and `deposit`
//!   with rollback on failure
//! - [`CurveEvent`] / [`EventIndexer`]: event log and queryable history
//!
//! # Example
//!
//! ```ignore
//! let mut ledger = Ledger::new(CurveConfig::default().factory_settings()?)?;
//! let (token, exchange) = ledger.create_pair(creator, "Track", "TRK", 1_000, 18)?;
//! ledger.mint_native(buyer, 10u128.pow(17))?;
//! ledger.buy(exchange, buyer, 100, 10u128.pow(16))?;
//! ```

pub mod config;
pub mod deploy;
pub mod errors;
pub mod event_indexer;
pub mod events;
pub mod exchange;
pub mod factory;
pub mod fees;
pub mod ledger;
pub mod pricing;
pub mod trade;

pub use config::CurveConfig;
pub use errors::{ExchangeError, ExchangeResult};
pub use event_indexer::SledEventIndexer;
pub use events::{CurveEvent, EventIndexer, InMemoryEventIndexer, PricePoint};
pub use exchange::{BuyQuote, Exchange, ExchangeConfig, SellQuote};
pub use factory::{Factory, FactorySettings};
pub use fees::{FeeSchedule, FeeSplit};
pub use ledger::{ExchangeStats, Ledger, TransferHook};
pub use pricing::QuadraticCurve;

pub use lib_tokens::DEFAULT_DECIMALS;

/// Default curve constant (currency atomic units per unit²)
pub const DEFAULT_K: lib_types::Amount = 1_000_000_000_000;
