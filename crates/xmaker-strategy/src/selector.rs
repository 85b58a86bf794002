//! Price selection pipeline.
//!
//! Given one side of a depth snapshot, a reference price, and the selector
//! configuration, produce the price a new resting order should quote - or
//! nothing, when no defensible price exists this tick.
//!
//! Four stages run in order, each consuming the previous stage's price:
//! 1. value-offset anchor: place behind a configured amount of book value
//! 2. elevation: absorb nearby competing levels within a bounded tolerance
//! 3. WMA filter: reject prices detached from the bulk of resting liquidity
//! 4. reference guard: reject prices stale against the reference market
//!
//! Everything here is pure: no I/O, no clocks, exact decimal arithmetic.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{SelectorConfig, SelectorFallback};
use xmaker_core::{Amount, BookLevel, OrderBookSnapshot, OrderSide, Price, ReferencePrice};

/// Inputs for one selection run.
#[derive(Debug, Clone, Copy)]
pub struct SelectorInput<'a> {
    pub side: OrderSide,
    pub book: &'a OrderBookSnapshot,
    /// Latest reference tick, if the stream has delivered one.
    pub reference: Option<&'a ReferencePrice>,
    /// Own resting orders on this side, matched by price and amount so the
    /// elevation walk does not climb past the engine's own quotes.
    pub my_orders: &'a [(Price, Amount)],
}

/// Run the full pipeline. `None` is a veto - a normal "no action this
/// tick" outcome, not an error.
pub fn select_price(input: &SelectorInput<'_>, config: &SelectorConfig) -> Option<Price> {
    let levels = input.book.side_levels(input.side);

    // Stage 1 failure is always hard: with no anchor there is no book
    // liquidity to quote against, reference-seeded or not.
    let anchor = anchor_by_value_offset(levels, input.side, config)?;
    let elevated = elevate(anchor, levels, input, config);

    let wma_ok = match weighted_mean(levels, config) {
        Some(wma) => check_wma(elevated, input.side, wma, config.max_wma_surplus),
        None => false,
    };
    let reference_ok = check_reference(elevated, input.side, input.reference, config);

    if wma_ok && reference_ok {
        return Some(elevated);
    }

    debug!(
        side = %input.side,
        price = %elevated,
        wma_ok,
        reference_ok,
        fallback = ?config.fallback,
        "selection vetoed"
    );

    match config.fallback {
        SelectorFallback::Reject => None,
        SelectorFallback::Reference => {
            let seed = input.reference?.side_price(input.side);
            if !seed.is_positive() {
                return None;
            }
            Some(elevate(seed, levels, input, config))
        }
    }
}

/// Stage 1: value-offset anchor.
///
/// Walk the placing side from the best price outward, accumulating level
/// value. The anchor is the first level whose preceding levels already
/// carry `placement_value_offset` of value, stepped one tick further from
/// the spread - resting just behind that much liquidity rather than in
/// front of it. A book that never accumulates enough value yields `None`.
pub fn anchor_by_value_offset(
    levels: &[BookLevel],
    side: OrderSide,
    config: &SelectorConfig,
) -> Option<Price> {
    let mut accumulated = Decimal::ZERO;
    for level in levels {
        if accumulated >= config.placement_value_offset {
            return Some(side.away_from_spread(level.price, config.tick));
        }
        accumulated += level.value;
    }
    None
}

/// Stage 2: elevation.
///
/// Walk from the working price back toward the spread. Each competing level
/// within the remaining budget is absorbed: the working price advances one
/// tick past it and the consumed distance (including the tick) is deducted.
/// The budget starts at `elevation_price_fraction × seed`, so total
/// displacement never exceeds that bound. Levels matching one of the
/// caller's own orders are skipped. Boundary ties are inclusive.
pub fn elevate(
    seed: Price,
    levels: &[BookLevel],
    input: &SelectorInput<'_>,
    config: &SelectorConfig,
) -> Price {
    if levels.is_empty() {
        return seed;
    }
    let side = input.side;
    let mut budget = config.elevation_price_fraction * seed.inner();
    let mut price = seed;

    // First level at or behind the working price; the walk runs from there
    // back toward the best level. A price behind the whole book competes
    // with every level.
    let start = levels
        .iter()
        .position(|level| !side.closer_to_spread(level.price, price))
        .unwrap_or(levels.len() - 1);

    for level in levels[..=start].iter().rev() {
        if input
            .my_orders
            .iter()
            .any(|(p, a)| *p == level.price && *a == level.amount)
        {
            continue;
        }
        let distance = match side {
            OrderSide::Buy => level.price.inner() - price.inner(),
            OrderSide::Sell => price.inner() - level.price.inner(),
        };
        if distance < Decimal::ZERO {
            continue;
        }
        let step = distance + config.tick;
        if step <= budget {
            price = side.toward_spread(level.price, config.tick);
            budget -= step;
            if budget <= Decimal::ZERO {
                break;
            }
        }
    }
    price
}

/// Stage 3 input: value-weighted mean price over the side, truncated after
/// `wma_take_count` levels or once accumulated amount exceeds
/// `wma_take_amount` (whichever bound is configured non-zero).
///
/// An empty side (zero total amount) yields `None` - an input problem,
/// never a division panic.
pub fn weighted_mean(levels: &[BookLevel], config: &SelectorConfig) -> Option<Decimal> {
    let mut total_value = Decimal::ZERO;
    let mut total_amount = Decimal::ZERO;
    for (taken, level) in levels.iter().enumerate() {
        total_value += level.value;
        total_amount += level.amount.inner();
        if config.wma_take_count > 0 && taken + 1 >= config.wma_take_count {
            break;
        }
        if config.wma_take_amount > Decimal::ZERO && total_amount > config.wma_take_amount {
            break;
        }
    }
    if total_amount.is_zero() {
        return None;
    }
    Some(total_value / total_amount)
}

/// Stage 3: WMA sanity filter.
///
/// A buy must price strictly below `(1 + surplus) × wma`; a sell strictly
/// above `(1 - surplus) × wma`.
pub fn check_wma(price: Price, side: OrderSide, wma: Decimal, max_surplus: Decimal) -> bool {
    match side {
        OrderSide::Buy => price.inner() < (Decimal::ONE + max_surplus) * wma,
        OrderSide::Sell => price.inner() > (Decimal::ONE - max_surplus) * wma,
    }
}

/// Stage 4: reference-price guard.
///
/// A buy passes iff `price / reference bid < bid_max_reference_ratio`; a
/// sell passes iff `price / reference ask > ask_min_reference_ratio`.
/// A missing or empty reference is a veto.
pub fn check_reference(
    price: Price,
    side: OrderSide,
    reference: Option<&ReferencePrice>,
    config: &SelectorConfig,
) -> bool {
    let Some(reference) = reference else {
        return false;
    };
    let Some(ratio) = price.ratio_to(reference.side_price(side)) else {
        return false;
    };
    match side {
        OrderSide::Buy => ratio < config.bid_max_reference_ratio,
        OrderSide::Sell => ratio > config.ask_min_reference_ratio,
    }
}

/// Competing book value strictly ahead of `price` on its side - the
/// quantity that would have to trade before a resting order at `price`.
/// The cancel loop compares this against the replacement offset.
pub fn value_ahead_of(price: Price, side: OrderSide, levels: &[BookLevel]) -> Decimal {
    let mut accumulated = Decimal::ZERO;
    for level in levels {
        if side.closer_to_spread(level.price, price) {
            accumulated += level.value;
        } else {
            break;
        }
    }
    accumulated
}
