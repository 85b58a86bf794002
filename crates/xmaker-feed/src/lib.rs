//! Market data cache and background collectors.
//!
//! `MarketCache` holds the latest order-book snapshot and reference price
//! per pair plus the balance cache, all last-write-wins. Collectors are the
//! background tasks that keep the reference side fresh; book snapshots are
//! refreshed inline by their consumers, which own the call-weight tradeoff.

pub mod cache;
pub mod collector;

pub use cache::MarketCache;
pub use collector::spawn_reference_collector;
