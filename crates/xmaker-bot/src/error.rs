//! Error types for the xmaker binary.

use thiserror::Error;
use xmaker_core::CoreError;
use xmaker_exchange::ExchangeError;
use xmaker_strategy::StrategyError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type alias for application operations.
pub type AppResult<T> = std::result::Result<T, AppError>;
