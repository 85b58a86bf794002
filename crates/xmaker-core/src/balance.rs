//! Account balances, keyed by asset symbol.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance for a single asset.
///
/// `available` is what new orders may spend; `hold` is locked behind open
/// orders. The local copy is a best-effort cache: it is adjusted
/// optimistically at placement and reconciled wholesale from the venue after
/// every confirmed order event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balance {
    pub total: Decimal,
    pub available: Decimal,
    pub hold: Decimal,
}

impl Balance {
    pub fn new(total: Decimal, available: Decimal, hold: Decimal) -> Self {
        Self {
            total,
            available,
            hold,
        }
    }

    /// Move `value` from available to hold, saturating at zero available.
    /// Used for the optimistic adjustment between authoritative refreshes.
    pub fn apply_hold(&mut self, value: Decimal) {
        let moved = value.min(self.available);
        self.available -= moved;
        self.hold += moved;
    }

    /// Release `value` of hold back to available, saturating at zero hold.
    pub fn release_hold(&mut self, value: Decimal) {
        let moved = value.min(self.hold);
        self.hold -= moved;
        self.available += moved;
    }
}
