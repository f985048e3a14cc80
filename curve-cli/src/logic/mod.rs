//! Pure logic: no I/O, no ledger side effects

pub mod quote;

pub use quote::{build_quote, QuoteReport};
