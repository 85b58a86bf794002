//! Market-making strategy core for xmaker.
//!
//! Three tightly-coupled pieces:
//! - `selector`: the four-stage price selection pipeline (value-offset
//!   anchor → elevation → WMA sanity filter → reference-price guard)
//! - `balance_gate`: pre-placement amount/balance/minimum filters
//! - `reconciler`: per-(pair, side) order lifecycle state machine that turns
//!   selector output into place/cancel calls against the venue
//!
//! # Architecture
//!
//! ```text
//! reference stream ─▶ MarketCache ◀─ book fetch (inline, weight-charged)
//!                         │
//!          Reconciler place tick (per pair+side)
//!                         ├─ selector::select_price
//!                         ├─ balance_gate::resolve_order_amount
//!                         └─ VenueApi::place_order ─▶ resting-order table
//!                         │
//!          Reconciler check tick (per pair) ─ cancel/replace on drift
//!          Reconciler fill sweep ─ drop locally on confirmed full fill
//! ```

pub mod balance_gate;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod selector;

pub use balance_gate::{resolve_order_amount, GateSkip};
pub use config::{ReconcilerConfig, SelectorConfig, SelectorFallback};
pub use error::StrategyError;
pub use reconciler::{Reconciler, SlotState};
pub use selector::{select_price, value_ahead_of, SelectorInput};
