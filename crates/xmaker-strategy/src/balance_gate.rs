//! Pre-placement balance and exchange-minimum filters.
//!
//! Runs after the selector and before any order hits the wire. A gate skip
//! costs nothing: no budget weight, no state change, just a quiet tick.

use rust_decimal::Decimal;
use thiserror::Error;

use xmaker_core::{Amount, OrderSide, PairRules, Price};

/// Why placement was skipped this tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateSkip {
    #[error("no balance entry for {asset}")]
    NoBalance { asset: String },

    #[error("insufficient {asset}: required {required}, available {available}")]
    Insufficient {
        asset: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("amount {amount} below venue minimum {min_amount}")]
    BelowMinAmount { amount: Amount, min_amount: Amount },

    #[error("order value {value} below venue minimum {min_value}")]
    BelowMinValue { value: Decimal, min_value: Decimal },
}

/// Resolve the final order amount for a placement, or the reason to skip.
///
/// Applies, in order: the buy-side cap, precision round-down, the venue's
/// amount and value minimums, and the balance check - quote-asset value for
/// buys, base-asset amount for sells.
pub fn resolve_order_amount(
    side: OrderSide,
    price: Price,
    desired: Amount,
    max_buy_amount: Option<Amount>,
    rules: &PairRules,
    available: Option<(&str, Decimal)>,
) -> Result<Amount, GateSkip> {
    let mut amount = desired;
    if side == OrderSide::Buy {
        if let Some(cap) = max_buy_amount {
            amount = amount.min(cap);
        }
    }
    let amount = amount.round_down_to_dp(rules.amount_precision);

    if !amount.is_positive() || amount < rules.min_amount {
        return Err(GateSkip::BelowMinAmount {
            amount,
            min_amount: rules.min_amount,
        });
    }

    let value = amount.value_at(price);
    if value < rules.min_value {
        return Err(GateSkip::BelowMinValue {
            value,
            min_value: rules.min_value,
        });
    }

    let (asset, available) = match available {
        Some(entry) => entry,
        None => {
            let asset = spending_asset_name(side);
            return Err(GateSkip::NoBalance {
                asset: asset.to_string(),
            });
        }
    };

    let required = required_balance(side, price, amount);
    if available < required {
        return Err(GateSkip::Insufficient {
            asset: asset.to_string(),
            required,
            available,
        });
    }

    Ok(amount)
}

/// Balance a placement locks up: quote value for buys, base amount for sells.
pub fn required_balance(side: OrderSide, price: Price, amount: Amount) -> Decimal {
    match side {
        OrderSide::Buy => amount.value_at(price),
        OrderSide::Sell => amount.inner(),
    }
}

fn spending_asset_name(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "quote",
        OrderSide::Sell => "base",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rules() -> PairRules {
        PairRules {
            min_amount: Amount::new(dec!(0.001)),
            min_value: dec!(0.5),
            amount_precision: 4,
            ..PairRules::default()
        }
    }

    #[test]
    fn test_amount_rounds_down_to_precision() {
        let amount = resolve_order_amount(
            OrderSide::Sell,
            Price::new(dec!(100)),
            Amount::new(dec!(0.12349)),
            None,
            &rules(),
            Some(("BTC", dec!(1))),
        )
        .unwrap();
        assert_eq!(amount.inner(), dec!(0.1234));
    }

    #[test]
    fn test_buy_cap_clamps() {
        let amount = resolve_order_amount(
            OrderSide::Buy,
            Price::new(dec!(100)),
            Amount::new(dec!(0.5)),
            Some(Amount::new(dec!(0.2))),
            &rules(),
            Some(("USD", dec!(1000))),
        )
        .unwrap();
        assert_eq!(amount.inner(), dec!(0.2));
    }

    #[test]
    fn test_cap_does_not_apply_to_sells() {
        let amount = resolve_order_amount(
            OrderSide::Sell,
            Price::new(dec!(100)),
            Amount::new(dec!(0.5)),
            Some(Amount::new(dec!(0.2))),
            &rules(),
            Some(("BTC", dec!(1))),
        )
        .unwrap();
        assert_eq!(amount.inner(), dec!(0.5));
    }

    #[test]
    fn test_below_min_amount_skips() {
        let result = resolve_order_amount(
            OrderSide::Sell,
            Price::new(dec!(100)),
            Amount::new(dec!(0.0004)),
            None,
            &rules(),
            Some(("BTC", dec!(1))),
        );
        assert!(matches!(result, Err(GateSkip::BelowMinAmount { .. })));
    }

    #[test]
    fn test_below_min_value_skips() {
        let result = resolve_order_amount(
            OrderSide::Sell,
            Price::new(dec!(0.1)),
            Amount::new(dec!(0.002)),
            None,
            &rules(),
            Some(("BTC", dec!(1))),
        );
        assert!(matches!(result, Err(GateSkip::BelowMinValue { .. })));
    }

    #[test]
    fn test_buy_requires_quote_value() {
        // buying 0.01 at 100 needs 1.0 of quote; only 0.9 available
        let result = resolve_order_amount(
            OrderSide::Buy,
            Price::new(dec!(100)),
            Amount::new(dec!(0.01)),
            None,
            &rules(),
            Some(("USD", dec!(0.9))),
        );
        assert!(matches!(result, Err(GateSkip::Insufficient { .. })));
    }

    #[test]
    fn test_sell_requires_base_amount() {
        let result = resolve_order_amount(
            OrderSide::Sell,
            Price::new(dec!(100)),
            Amount::new(dec!(0.01)),
            None,
            &rules(),
            Some(("BTC", dec!(0.005))),
        );
        assert!(matches!(result, Err(GateSkip::Insufficient { .. })));

        let ok = resolve_order_amount(
            OrderSide::Sell,
            Price::new(dec!(100)),
            Amount::new(dec!(0.01)),
            None,
            &rules(),
            Some(("BTC", dec!(0.01))),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_missing_balance_skips() {
        let result = resolve_order_amount(
            OrderSide::Buy,
            Price::new(dec!(100)),
            Amount::new(dec!(0.01)),
            None,
            &rules(),
            None,
        );
        assert!(matches!(result, Err(GateSkip::NoBalance { .. })));
    }
}
