//! Venue API surface for the xmaker market maker.
//!
//! Exposes the boundary the strategy core consumes:
//! - `VenueApi`: signed REST operations (book, balances, place/cancel/status)
//! - `ReferenceFeed`: streaming best bid/ask from the reference exchange
//! - `RateBudget`: the shared per-minute call-weight window every signed
//!   call is charged against
//!
//! `RestClient` and `ReferenceStream` are the production implementations;
//! tests substitute their own `VenueApi` impls.

pub mod api;
pub mod error;
pub mod rate_budget;
pub mod rest;
pub mod stream;
mod wire;

pub use api::{NewOrder, OpenOrder, OrderDetails, PlacedOrder, ReferenceFeed, TradeFill, VenueApi};
pub use error::{DomainCode, ExchangeError, ExchangeResult};
pub use rate_budget::{weight, RateBudget};
pub use rest::{RestClient, RestConfig};
pub use stream::ReferenceStream;
