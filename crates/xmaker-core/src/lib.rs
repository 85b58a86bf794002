//! Core domain types for the xmaker cross-exchange market maker.
//!
//! This crate provides the fundamental types shared across the system:
//! - `Pair`: venue trading pair ("BTC_USD") with base/quote split
//! - `Price`, `Amount`: precision-safe decimal newtypes
//! - `BookLevel`, `OrderBookSnapshot`: one side-ordered depth snapshot
//! - `ReferencePrice`: bid/ask from the reference exchange stream
//! - `RestingOrder`, `Balance`, `PairRules`: order and account state

pub mod balance;
pub mod book;
pub mod decimal;
pub mod error;
pub mod order;
pub mod pair;

pub use balance::Balance;
pub use book::{BookLevel, OrderBookSnapshot, ReferencePrice};
pub use decimal::{Amount, Price};
pub use error::{CoreError, Result};
pub use order::{OrderId, OrderSide, RestingOrder};
pub use pair::{Pair, PairRules};
