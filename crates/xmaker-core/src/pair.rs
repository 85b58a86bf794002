//! Trading pair identification and venue-declared trading rules.

use crate::{Amount, CoreError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Venue trading pair in `BASE_QUOTE` form, e.g. `BTC_USD`.
///
/// The underscore split is part of the venue wire format; balances are keyed
/// by the base and quote asset symbols this type exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pair(String);

impl Pair {
    /// Parse a pair, validating the `BASE_QUOTE` shape.
    pub fn new(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        let mut parts = s.split('_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Ok(Self(s))
            }
            _ => Err(CoreError::InvalidPair(s)),
        }
    }

    /// Base asset symbol (left of the underscore).
    pub fn base(&self) -> &str {
        self.0.split('_').next().unwrap_or_default()
    }

    /// Quote asset symbol (right of the underscore).
    pub fn quote(&self) -> &str {
        self.0.split('_').nth(1).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Per-pair trading rules declared by the venue `info` endpoint.
///
/// Fetched once at startup and cached for the process lifetime; the venue
/// does not change these without notice windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRules {
    /// Minimum order amount in base asset.
    pub min_amount: Amount,
    /// Minimum order value in quote asset.
    pub min_value: Decimal,
    /// Decimal places accepted for prices.
    pub price_precision: u32,
    /// Decimal places accepted for amounts.
    pub amount_precision: u32,
    /// Decimal places the venue reports for level values.
    pub value_precision: u32,
    /// Maker fee, percent.
    pub fee_maker_percent: Decimal,
    /// Taker fee, percent.
    pub fee_taker_percent: Decimal,
}

impl Default for PairRules {
    fn default() -> Self {
        Self {
            min_amount: Amount::ZERO,
            min_value: Decimal::ZERO,
            price_precision: 2,
            amount_precision: 8,
            value_precision: 2,
            fee_maker_percent: Decimal::ZERO,
            fee_taker_percent: Decimal::ZERO,
        }
    }
}
