//! Error types for xmaker-strategy.

use thiserror::Error;
use xmaker_core::Pair;
use xmaker_exchange::ExchangeError;

/// Errors that terminate a reconciler task.
///
/// Only fatal venue errors surface here; transport failures and selector
/// vetoes are absorbed at the tick level.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("venue call failed fatally for {pair}: {source}")]
    Venue {
        pair: Pair,
        #[source]
        source: ExchangeError,
    },

    #[error("venue call failed fatally during startup: {0}")]
    Startup(#[source] ExchangeError),

    #[error("pair rules missing for {0}; info endpoint did not list it")]
    MissingRules(Pair),
}

/// Result type alias for strategy operations.
pub type Result<T> = std::result::Result<T, StrategyError>;
