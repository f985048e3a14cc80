//! Exchange and Factory Errors
//!
//! Every variant aborts the whole call; the ledger rolls back to the state
//! it had before the call started.

use lib_tokens::TokenError;
use lib_types::{Address, Amount};
use thiserror::Error;

/// Error during factory, exchange or ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    // Construction
    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    // Trade preconditions
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Insufficient payment: cost {required}, provided {provided}")]
    InsufficientPayment { required: Amount, provided: Amount },

    #[error("Sell of {requested} exceeds circulating supply {supply}")]
    SellExceedsSupply { requested: Amount, supply: Amount },

    #[error("Insufficient reserve: payout {required}, reserve {available}")]
    InsufficientReserve { required: Amount, available: Amount },

    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Amount, need: Amount },

    // External calls
    #[error("Token transfer failed: {0}")]
    TokenTransferFailed(String),

    #[error("Fee transfer to {recipient} failed: {reason}")]
    FeeTransferFailed { recipient: Address, reason: String },

    #[error("Native transfer to {recipient} failed: {reason}")]
    NativeTransferFailed { recipient: Address, reason: String },

    #[error("Reentrant call rejected")]
    ReentrancyRejected,

    // Arithmetic
    #[error("Arithmetic overflow")]
    Overflow,

    // Registry / authority
    #[error("Exchange not found: {0}")]
    ExchangeNotFound(Address),

    #[error("Token not found: {0}")]
    TokenNotFound(Address),

    #[error("Pair already exists for creator {creator} and token {token}")]
    PairAlreadyExists { creator: Address, token: Address },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Direct token operations routed through the ledger
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Result type for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;
