//! Token Contract Errors

use lib_types::{Address, Amount};
use thiserror::Error;

/// Error during token operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Total supply must be greater than zero")]
    ZeroSupply,

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Invalid token parameters: {0}")]
    InvalidParameters(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Amount, need: Amount },

    #[error("Unauthorized: {caller} is not the token owner")]
    Unauthorized { caller: Address },

    #[error("Initial supply has already been withdrawn")]
    AlreadyWithdrawn,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
