//! Per-minute call-weight budget shared by all venue REST callers.
//!
//! The venue allows a fixed weight per rolling minute per credential. This
//! tracker is a soft governor, not an admission controller: `consume` never
//! blocks or rejects, because refusing a cancel to stay under budget would
//! leave a stale order resting. Callers of *optional* reads check
//! `remaining()` before spending.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Call weights charged by the venue, per endpoint.
pub mod weight {
    /// Order-book query, per pair in the request.
    pub const BOOK_PER_PAIR: i64 = 1;
    /// Place a limit order.
    pub const PLACE: i64 = 5;
    /// Order status query.
    pub const STATUS: i64 = 5;
    /// Cancel an order.
    pub const CANCEL: i64 = 10;
    /// Account balance query.
    pub const BALANCE: i64 = 10;
    /// Open-orders listing.
    pub const OPEN_ORDERS: i64 = 60;
}

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    remaining: i64,
}

/// Decaying per-minute call-weight budget.
///
/// One instance per API credential, shared by every caller.
#[derive(Debug)]
pub struct RateBudget {
    capacity: i64,
    state: Mutex<WindowState>,
}

impl RateBudget {
    /// Create a budget with the venue-declared per-minute capacity.
    pub fn new(capacity: i64) -> Self {
        Self {
            capacity,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                remaining: capacity,
            }),
        }
    }

    /// Charge `weight` against the current window, returning the remaining
    /// budget. A window older than one minute is reset before charging.
    /// May go negative: state-changing calls are charged but never refused.
    pub fn consume(&self, weight: i64) -> i64 {
        self.consume_at(weight, Instant::now())
    }

    /// `consume` with an explicit clock, the seam the window tests use.
    pub fn consume_at(&self, weight: i64, now: Instant) -> i64 {
        let mut state = self.state.lock();
        if now.duration_since(state.window_start) > WINDOW {
            state.window_start = now;
            state.remaining = self.capacity - weight;
        } else {
            state.remaining -= weight;
        }
        if state.remaining < 0 {
            warn!(
                remaining = state.remaining,
                capacity = self.capacity,
                "call-weight budget exhausted for this window"
            );
        }
        state.remaining
    }

    /// Remaining weight in the current window. Does not roll the window;
    /// a stale window reports its last value until the next `consume`.
    pub fn remaining(&self) -> i64 {
        self.state.lock().remaining
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }
}
