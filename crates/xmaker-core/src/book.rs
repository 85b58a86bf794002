//! Order-book snapshots and reference prices.
//!
//! Snapshots are immutable once fetched and replaced wholesale on refresh;
//! last write wins, no history is retained.

use crate::{Amount, OrderSide, Pair, Price};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price level of a book side.
///
/// `value` is the quote-asset value as reported by the venue. It tracks
/// `price × amount` but carries the venue's own rounding, so it is stored
/// rather than derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub amount: Amount,
    pub value: Decimal,
}

impl BookLevel {
    pub fn new(price: Price, amount: Amount, value: Decimal) -> Self {
        Self {
            price,
            amount,
            value,
        }
    }
}

/// Full depth snapshot for one pair.
///
/// Invariant: bids are ordered by price descending, asks ascending - both
/// monotonically away from the spread, best level first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub pair: Pair,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub fetched_at: DateTime<Utc>,
}

impl OrderBookSnapshot {
    pub fn new(pair: Pair, bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self {
            pair,
            bids,
            asks,
            fetched_at: Utc::now(),
        }
    }

    /// Levels on the side an order of `side` would rest on.
    pub fn side_levels(&self, side: OrderSide) -> &[BookLevel] {
        match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        }
    }

    /// Check the ordering invariant on both sides.
    pub fn is_ordered(&self) -> bool {
        let bids_ok = self.bids.windows(2).all(|w| w[0].price >= w[1].price);
        let asks_ok = self.asks.windows(2).all(|w| w[0].price <= w[1].price);
        bids_ok && asks_ok
    }

    /// Snapshot age in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_milliseconds()
    }
}

/// Best bid/ask observed on the reference exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub pair: Pair,
    pub bid: Price,
    pub ask: Price,
    pub observed_at: DateTime<Utc>,
}

impl ReferencePrice {
    pub fn new(pair: Pair, bid: Price, ask: Price) -> Self {
        Self {
            pair,
            bid,
            ask,
            observed_at: Utc::now(),
        }
    }

    /// The reference price a quote on `side` is compared against.
    ///
    /// Buys are bounded by the reference bid, sells by the reference ask.
    pub fn side_price(&self, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => self.bid,
            OrderSide::Sell => self.ask,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.bid.is_positive() && self.ask.is_positive()
    }

    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.observed_at).num_milliseconds()
    }
}
