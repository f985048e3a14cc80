//! Creator-token exchange primitives.
//! Stable, protocol-neutral, behavior-free.

pub mod primitives;

pub use primitives::{Address, AddressParseError, Amount, BlockHeight, Bps, BPS_DENOMINATOR};
