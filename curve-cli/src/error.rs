//! Structured error types for the curve CLI

use thiserror::Error;

use lib_curve::ExchangeError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid scenario: {0}")]
    ScenarioError(String),

    #[error("Step {index} ({action}) failed: {reason}")]
    StepFailed {
        index: usize,
        action: String,
        reason: String,
    },

    #[error("Unknown pair '{0}'")]
    UnknownPair(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::ConfigError(format!("{:#}", err))
    }
}
