//! Order identity, side, and resting-order state.

use crate::{Amount, Pair, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Order side: buy or sell.
///
/// Side also determines which half of the book an order rests on (bids for
/// buys, asks for sells) and therefore which direction is "toward the
/// spread": up for bids, down for asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Step a price one increment toward the spread for this side.
    ///
    /// Bids improve upward, asks improve downward.
    pub fn toward_spread(&self, price: Price, step: Decimal) -> Price {
        match self {
            Self::Buy => Price::new(price.inner() + step),
            Self::Sell => Price::new(price.inner() - step),
        }
    }

    /// Step a price one increment away from the spread for this side.
    pub fn away_from_spread(&self, price: Price, step: Decimal) -> Price {
        match self {
            Self::Buy => Price::new(price.inner() - step),
            Self::Sell => Price::new(price.inner() + step),
        }
    }

    /// True when `a` would fill before `b` on this side of the book.
    pub fn closer_to_spread(&self, a: Price, b: Price) -> bool {
        match self {
            Self::Buy => a > b,
            Self::Sell => a < b,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Venue-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl OrderId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn inner(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open limit order tracked by the reconciler.
///
/// Exists exactly as long as the order is open on the venue: created on a
/// successful placement response, destroyed on confirmed cancellation or
/// confirmed full fill. Each (pair, side) slot owns at most one.
#[derive(Debug, Clone)]
pub struct RestingOrder {
    pub id: OrderId,
    pub pair: Pair,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Amount,
    /// Monotonic placement time, for the minimum-hold check.
    pub placed_at: Instant,
}

impl RestingOrder {
    /// Age since placement.
    pub fn age(&self) -> std::time::Duration {
        self.placed_at.elapsed()
    }
}
