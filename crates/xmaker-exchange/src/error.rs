//! Error taxonomy for venue calls.
//!
//! Three classes drive the reconciler's failure policy:
//! - `Transport`: network/HTTP failure - retried indefinitely at the call
//!   site, no state mutated.
//! - `Domain`: the venue answered `success: false` with a stable code -
//!   classified below into skip/terminal/fatal.
//! - `Decode`: the venue answered something unparseable - fatal, state on
//!   the wire can no longer be trusted.

use std::fmt;
use thiserror::Error;

/// Stable venue error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainCode {
    InvalidSignature,
    InvalidIpAddress,
    LimitExceeded,
    InvalidTimestamp,
    AccessDenied,
    InvalidParameter,
    ParameterEmpty,
    InvalidStatusForRefund,
    RefundLimit,
    UnknownError,
    InvalidDateRange,
    InsufficientFunds,
    InsufficientVolume,
    IncorrectPrice,
    MinAmount,
    MinValue,
    /// Code this client does not recognize. Always fatal: an unknown
    /// failure mode must not be silently retried into state divergence.
    Other(String),
}

impl DomainCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "INVALID_SIGNATURE" => Self::InvalidSignature,
            "INVALID_IP_ADDRESS" => Self::InvalidIpAddress,
            "LIMIT_EXCEEDED" => Self::LimitExceeded,
            "INVALID_TIMESTAMP" => Self::InvalidTimestamp,
            "ACCESS_DENIED" => Self::AccessDenied,
            "INVALID_PARAMETER" => Self::InvalidParameter,
            "PARAMETER_EMPTY" => Self::ParameterEmpty,
            "INVALID_STATUS_FOR_REFUND" => Self::InvalidStatusForRefund,
            "REFUND_LIMIT" => Self::RefundLimit,
            "UNKNOWN_ERROR" => Self::UnknownError,
            "INVALID_DATE_RANGE" => Self::InvalidDateRange,
            "INSUFFICIENT_FUNDS" => Self::InsufficientFunds,
            "INSUFFICIENT_VOLUME" => Self::InsufficientVolume,
            "INCORRECT_PRICE" => Self::IncorrectPrice,
            "MIN_AMOUNT" => Self::MinAmount,
            "MIN_VALUE" => Self::MinValue,
            other => Self::Other(other.to_string()),
        }
    }

    /// Funds/volume shortfall: refresh balances and skip the tick.
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::InsufficientFunds | Self::InsufficientVolume)
    }

    /// Cancel target is no longer refundable (already filled or resolved).
    /// Terminal for that order: treated as success-equivalent, never retried.
    pub fn is_refund_ineligible(&self) -> bool {
        matches!(self, Self::InvalidStatusForRefund)
    }

    /// Venue-side rate limiting: retry at the next tick. Aborting here would
    /// strand resting orders, which is worse than an over-budget window.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::LimitExceeded)
    }

    /// Anything else diverges local state from the venue: fail fast.
    pub fn is_fatal(&self) -> bool {
        !self.is_insufficient() && !self.is_refund_ineligible() && !self.is_rate_limited()
    }
}

impl fmt::Display for DomainCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidIpAddress => "INVALID_IP_ADDRESS",
            Self::LimitExceeded => "LIMIT_EXCEEDED",
            Self::InvalidTimestamp => "INVALID_TIMESTAMP",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::ParameterEmpty => "PARAMETER_EMPTY",
            Self::InvalidStatusForRefund => "INVALID_STATUS_FOR_REFUND",
            Self::RefundLimit => "REFUND_LIMIT",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::InvalidDateRange => "INVALID_DATE_RANGE",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::InsufficientVolume => "INSUFFICIENT_VOLUME",
            Self::IncorrectPrice => "INCORRECT_PRICE",
            Self::MinAmount => "MIN_AMOUNT",
            Self::MinValue => "MIN_VALUE",
            Self::Other(s) => s,
        };
        write!(f, "{s}")
    }
}

/// Errors returned by venue operations.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("venue error: {0}")]
    Domain(DomainCode),

    #[error("decode error: {0}")]
    Decode(String),
}

impl ExchangeError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn domain_code(&self) -> Option<&DomainCode> {
        match self {
            Self::Domain(code) => Some(code),
            _ => None,
        }
    }

    /// True when the process should terminate rather than keep running with
    /// state it can no longer trust.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(_) => false,
            Self::Domain(code) => code.is_fatal(),
            Self::Decode(_) => true,
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Result type alias for venue operations.
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
