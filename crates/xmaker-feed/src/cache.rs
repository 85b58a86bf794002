//! Shared market-data and balance cache.
//!
//! Three independent maps, each atomic at map level only. Readers and
//! writers of different entries may interleave freely; a few hundred
//! milliseconds of staleness is accepted. No history is retained: every
//! write replaces the previous value wholesale.

use dashmap::DashMap;
use rust_decimal::Decimal;
use xmaker_core::{Balance, OrderBookSnapshot, Pair, ReferencePrice};

/// Last-write-wins cache for snapshots, reference prices, and balances.
#[derive(Debug, Default)]
pub struct MarketCache {
    books: DashMap<Pair, OrderBookSnapshot>,
    references: DashMap<Pair, ReferencePrice>,
    balances: DashMap<String, Balance>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the book snapshot for a pair.
    pub fn update_book(&self, snapshot: OrderBookSnapshot) {
        self.books.insert(snapshot.pair.clone(), snapshot);
    }

    /// Latest book snapshot for a pair, if any has been fetched yet.
    pub fn book(&self, pair: &Pair) -> Option<OrderBookSnapshot> {
        self.books.get(pair).map(|entry| entry.value().clone())
    }

    pub fn book_age_ms(&self, pair: &Pair) -> Option<i64> {
        self.books.get(pair).map(|entry| entry.value().age_ms())
    }

    /// Replace the reference price for a pair.
    pub fn update_reference(&self, tick: ReferencePrice) {
        self.references.insert(tick.pair.clone(), tick);
    }

    /// Latest reference price for a pair, if the stream has delivered one.
    pub fn reference(&self, pair: &Pair) -> Option<ReferencePrice> {
        self.references.get(pair).map(|entry| entry.value().clone())
    }

    pub fn reference_age_ms(&self, pair: &Pair) -> Option<i64> {
        self.references.get(pair).map(|entry| entry.value().age_ms())
    }

    /// Replace all balances with an authoritative server snapshot.
    pub fn replace_balances(&self, balances: std::collections::HashMap<String, Balance>) {
        self.balances.retain(|asset, _| balances.contains_key(asset));
        for (asset, balance) in balances {
            self.balances.insert(asset, balance);
        }
    }

    pub fn balance(&self, asset: &str) -> Option<Balance> {
        self.balances.get(asset).map(|entry| *entry.value())
    }

    /// Optimistically move `value` of an asset from available to hold.
    /// Overwritten by the next `replace_balances`.
    pub fn apply_hold(&self, asset: &str, value: Decimal) {
        if let Some(mut entry) = self.balances.get_mut(asset) {
            entry.apply_hold(value);
        }
    }

    /// Optimistically release `value` of held asset back to available.
    pub fn release_hold(&self, asset: &str, value: Decimal) {
        if let Some(mut entry) = self.balances.get_mut(asset) {
            entry.release_hold(value);
        }
    }
}
