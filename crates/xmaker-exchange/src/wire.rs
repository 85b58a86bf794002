//! Wire-format types for the venue REST API.
//!
//! The venue quotes every price/amount/value as a string; those fields parse
//! straight into `Decimal` so precision survives the decode boundary. Numeric
//! balance fields arrive as JSON numbers. Malformed numerics fail the decode,
//! which is fatal per the error taxonomy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{DomainCode, ExchangeError};
use crate::{OpenOrder, OrderDetails, TradeFill};
use xmaker_core::{
    Amount, Balance, BookLevel, OrderBookSnapshot, OrderId, OrderSide, Pair, PairRules, Price,
};

#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub code: String,
}

/// Shared `success`/`error` envelope on every venue response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    pub error: Option<WireError>,
}

impl Envelope {
    /// Convert a failed envelope into the typed domain error.
    pub fn check(&self) -> Result<(), ExchangeError> {
        if self.success {
            return Ok(());
        }
        let code = self
            .error
            .as_ref()
            .map(|e| DomainCode::parse(&e.code))
            .unwrap_or(DomainCode::UnknownError);
        Err(ExchangeError::Domain(code))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLevel {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
}

impl From<WireLevel> for BookLevel {
    fn from(w: WireLevel) -> Self {
        BookLevel::new(Price::new(w.price), Amount::new(w.amount), w.value)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePairOrders {
    #[serde(default)]
    pub bids: Vec<WireLevel>,
    #[serde(default)]
    pub asks: Vec<WireLevel>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrdersRequest {
    /// Comma-joined pair list.
    pub pair: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrdersResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default)]
    pub pairs: HashMap<String, WirePairOrders>,
}

impl WirePairOrders {
    pub fn into_snapshot(self, pair: Pair) -> OrderBookSnapshot {
        OrderBookSnapshot::new(
            pair,
            self.bids.into_iter().map(Into::into).collect(),
            self.asks.into_iter().map(Into::into).collect(),
        )
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TimestampedRequest {
    pub ts: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireBalance {
    pub total: Decimal,
    pub available: Decimal,
    pub hold: Decimal,
}

impl From<WireBalance> for Balance {
    fn from(w: WireBalance) -> Self {
        Balance::new(w.total, w.available, w.hold)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BalanceResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default)]
    pub balances: HashMap<String, WireBalance>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlaceOrderRequest {
    pub pair: String,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub action: OrderSide,
    pub amount: String,
    pub price: String,
    pub ts: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceOrderResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default)]
    pub order_id: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct OrderIdRequest {
    pub order_id: u64,
    pub ts: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTrade {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    pub date: i64,
}

impl From<WireTrade> for TradeFill {
    fn from(w: WireTrade) -> Self {
        TradeFill {
            price: Price::new(w.price),
            amount: Amount::new(w.amount),
            value: w.value,
            executed_at: chrono::DateTime::from_timestamp(w.date, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireOrderDetails {
    pub id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_remaining: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub value_remaining: Decimal,
    #[serde(default)]
    pub trades: Vec<WireTrade>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrderStatusResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    pub order: Option<WireOrderDetails>,
}

impl WireOrderDetails {
    pub fn into_details(self) -> Result<OrderDetails, ExchangeError> {
        let id = self
            .id
            .parse::<u64>()
            .map_err(|_| ExchangeError::Decode(format!("bad order id: {}", self.id)))?;
        Ok(OrderDetails {
            id: OrderId::new(id),
            amount_remaining: Amount::new(self.amount_remaining),
            value_remaining: self.value_remaining,
            trades: self.trades.into_iter().map(Into::into).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireOpenOrder {
    pub id: String,
    pub pair: String,
    pub action: OrderSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub date: i64,
}

impl WireOpenOrder {
    pub fn into_open_order(self) -> Result<OpenOrder, ExchangeError> {
        let id = self
            .id
            .parse::<u64>()
            .map_err(|_| ExchangeError::Decode(format!("bad order id: {}", self.id)))?;
        let pair = Pair::new(self.pair.clone())
            .map_err(|_| ExchangeError::Decode(format!("bad pair: {}", self.pair)))?;
        Ok(OpenOrder {
            id: OrderId::new(id),
            pair,
            side: self.action,
            price: Price::new(self.price),
            amount: Amount::new(self.amount),
            created_at: chrono::DateTime::from_timestamp(self.date, 0).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MyOrdersResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default)]
    pub orders: HashMap<String, WireOpenOrder>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WirePairInfo {
    pub price_prec: u32,
    pub amount_prec: u32,
    pub value_prec: u32,
    pub min_amount: Decimal,
    pub min_value: Decimal,
    pub fee_maker_percent: Decimal,
    pub fee_taker_percent: Decimal,
}

impl From<WirePairInfo> for PairRules {
    fn from(w: WirePairInfo) -> Self {
        PairRules {
            min_amount: Amount::new(w.min_amount),
            min_value: w.min_value,
            price_precision: w.price_prec,
            amount_precision: w.amount_prec,
            value_precision: w.value_prec,
            fee_maker_percent: w.fee_maker_percent,
            fee_taker_percent: w.fee_taker_percent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct InfoResponse {
    pub success: bool,
    #[serde(default)]
    pub pairs: HashMap<String, WirePairInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_orders_decode() {
        let json = r#"{
            "success": true,
            "pairs": {
                "BTC_USD": {
                    "bids": [{"price": "99.50", "amount": "2", "value": "199.00"}],
                    "asks": [{"price": "100.50", "amount": "1", "value": "100.50"}]
                }
            }
        }"#;
        let rsp: OrdersResponse = serde_json::from_str(json).unwrap();
        assert!(rsp.envelope.check().is_ok());
        let book = rsp
            .pairs
            .into_iter()
            .next()
            .map(|(p, o)| o.into_snapshot(Pair::new(p).unwrap()))
            .unwrap();
        assert_eq!(book.bids[0].price.inner(), dec!(99.50));
        assert_eq!(book.asks[0].value, dec!(100.50));
        assert!(book.is_ordered());
    }

    #[test]
    fn test_error_envelope_decode() {
        let json = r#"{"success": false, "error": {"code": "INSUFFICIENT_FUNDS"}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let err = envelope.check().unwrap_err();
        assert!(matches!(
            err.domain_code(),
            Some(code) if code.is_insufficient()
        ));
    }

    #[test]
    fn test_balance_decode_from_numbers() {
        let json = r#"{
            "success": true,
            "balances": {"USD": {"total": 120.5, "available": 100, "hold": 20.5}}
        }"#;
        let rsp: BalanceResponse = serde_json::from_str(json).unwrap();
        let usd: Balance = rsp.balances.get("USD").cloned().map(Into::into).unwrap();
        assert_eq!(usd.available, dec!(100));
        assert_eq!(usd.hold, dec!(20.5));
    }

    #[test]
    fn test_order_status_decode() {
        let json = r#"{
            "success": true,
            "order": {
                "id": "37054293",
                "amount_remaining": "0",
                "value_remaining": "0",
                "trades": [{"price": "100.00", "amount": "0.5", "value": "50.00", "date": 1700000000}]
            }
        }"#;
        let rsp: OrderStatusResponse = serde_json::from_str(json).unwrap();
        let details = rsp.order.unwrap().into_details().unwrap();
        assert_eq!(details.id.inner(), 37054293);
        assert!(details.is_filled());
        assert_eq!(details.trades.len(), 1);
    }

    #[test]
    fn test_bad_order_id_is_decode_error() {
        let wire = WireOrderDetails {
            id: "not-a-number".to_string(),
            amount_remaining: dec!(1),
            value_remaining: dec!(1),
            trades: Vec::new(),
        };
        assert!(matches!(
            wire.into_details(),
            Err(ExchangeError::Decode(_))
        ));
    }
}
