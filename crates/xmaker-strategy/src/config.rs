//! Strategy configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the selector does when the WMA or reference-price filter vetoes.
///
/// Both behaviors exist in production deployments of this strategy; the
/// choice is configuration, not inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorFallback {
    /// Hard veto: no order this tick.
    #[default]
    Reject,
    /// Re-seed from the reference side price and re-run the elevation stage
    /// only, quoting off the reference market instead of the local book.
    Reference,
}

/// Price selection pipeline constants, one set per strategy instance.
/// Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Book value (quote asset) that must rest in front of the anchor.
    pub placement_value_offset: Decimal,

    /// Elevation budget as a fraction of the anchor price.
    #[serde(default = "default_elevation_price_fraction")]
    pub elevation_price_fraction: Decimal,

    /// Maximum tolerated surplus of the candidate over the side WMA.
    #[serde(default = "default_max_wma_surplus")]
    pub max_wma_surplus: Decimal,

    /// Levels taken into the WMA. Zero = unbounded.
    #[serde(default)]
    pub wma_take_count: usize,

    /// Accumulated amount after which WMA intake stops. Zero = unbounded.
    #[serde(default)]
    pub wma_take_amount: Decimal,

    /// Upper bound on buy price / reference bid.
    #[serde(default = "default_bid_max_reference_ratio")]
    pub bid_max_reference_ratio: Decimal,

    /// Lower bound on sell price / reference ask.
    #[serde(default = "default_ask_min_reference_ratio")]
    pub ask_min_reference_ratio: Decimal,

    /// Minimal currency unit used for price stepping.
    #[serde(default = "default_tick")]
    pub tick: Decimal,

    /// Behavior on WMA/reference veto.
    #[serde(default)]
    pub fallback: SelectorFallback,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            placement_value_offset: default_placement_value_offset(),
            elevation_price_fraction: default_elevation_price_fraction(),
            max_wma_surplus: default_max_wma_surplus(),
            wma_take_count: 0,
            wma_take_amount: Decimal::ZERO,
            bid_max_reference_ratio: default_bid_max_reference_ratio(),
            ask_min_reference_ratio: default_ask_min_reference_ratio(),
            tick: default_tick(),
            fallback: SelectorFallback::default(),
        }
    }
}

/// Order lifecycle settings shared by all (pair, side) slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Order amount in base asset.
    pub amount: Decimal,

    /// Optional cap on buy amounts.
    #[serde(default)]
    pub max_buy_amount: Option<Decimal>,

    /// Competing value ahead of a resting order that forces replacement.
    pub replacement_value_offset: Decimal,

    /// Relative price drift (vs. a fresh selector run) that forces
    /// replacement. Zero disables the re-run trigger.
    #[serde(default)]
    pub requote_drift: Decimal,

    /// Minimum resting time before an order may be cancelled. Guards
    /// against rapid cancel churn.
    #[serde(default = "default_min_hold_secs")]
    pub min_hold_secs: u64,

    /// Placement loop interval.
    #[serde(default = "default_place_interval_ms")]
    pub place_interval_ms: u64,

    /// Cancel-check loop interval.
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,

    /// Fill-sweep loop interval.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Quote the bid side.
    #[serde(default = "default_true")]
    pub buy_enabled: bool,

    /// Quote the ask side.
    #[serde(default = "default_true")]
    pub sell_enabled: bool,
}

impl ReconcilerConfig {
    pub fn min_hold(&self) -> Duration {
        Duration::from_secs(self.min_hold_secs)
    }

    pub fn place_interval(&self) -> Duration {
        Duration::from_millis(self.place_interval_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            amount: Decimal::ZERO,
            max_buy_amount: None,
            replacement_value_offset: Decimal::ZERO,
            requote_drift: Decimal::ZERO,
            min_hold_secs: default_min_hold_secs(),
            place_interval_ms: default_place_interval_ms(),
            check_interval_ms: default_check_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            buy_enabled: true,
            sell_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_placement_value_offset() -> Decimal {
    Decimal::new(5000, 0)
}
fn default_elevation_price_fraction() -> Decimal {
    Decimal::new(5, 4) // 0.0005
}
fn default_max_wma_surplus() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_bid_max_reference_ratio() -> Decimal {
    Decimal::new(1005, 3) // 1.005
}
fn default_ask_min_reference_ratio() -> Decimal {
    Decimal::new(995, 3) // 0.995
}
fn default_tick() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_min_hold_secs() -> u64 {
    60
}
fn default_place_interval_ms() -> u64 {
    2000
}
fn default_check_interval_ms() -> u64 {
    500
}
fn default_sweep_interval_ms() -> u64 {
    5000
}
