//! Creator Token
//!
//! Fixed-supply fungible asset paired one-to-one with a bonding-curve
//! exchange.
//!
//! # Key Types
//!
//! - [`CreatorToken`]: balances, allowances and the one-time vault hand-off
//! - [`TokenError`]: failure reasons for every token operation
//! - [`TokenEntry`]: captured balance, allowance or withdrawal state, for undo
//!
//! # Lifecycle
//!
//! 1. `CreatorToken::new` mints the full supply to the token's own address.
//! 2. The owner (the factory) calls `withdraw_to` once, moving that supply
//!    into the exchange vault.
//! 3. From then on the token behaves like any fungible asset: `transfer`,
//!    `approve`, `transfer_from`.

pub mod contract;
pub mod errors;
pub mod transfer;

pub use contract::{CreatorToken, TokenEntry, DEFAULT_DECIMALS};
pub use errors::{TokenError, TokenResult};
