//! Venue and reference-feed contracts consumed by the strategy core.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ExchangeResult;
use xmaker_core::{Amount, Balance, OrderBookSnapshot, OrderId, OrderSide, Pair, PairRules, Price, ReferencePrice};

/// Parameters for a new limit order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub pair: Pair,
    pub side: OrderSide,
    pub amount: Amount,
    pub price: Price,
}

/// Successful placement response.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub pair: Pair,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Amount,
}

/// One execution against an order.
#[derive(Debug, Clone)]
pub struct TradeFill {
    pub price: Price,
    pub amount: Amount,
    pub value: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// Current state of an order, from the status endpoint.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub id: OrderId,
    pub amount_remaining: Amount,
    /// Quote-asset value still unfilled. Zero means fully filled.
    pub value_remaining: Decimal,
    pub trades: Vec<TradeFill>,
}

impl OrderDetails {
    pub fn is_filled(&self) -> bool {
        self.value_remaining.is_zero()
    }
}

/// An order the venue reports as open, from the open-orders listing.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub id: OrderId,
    pub pair: Pair,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

/// Signed venue REST operations.
///
/// Every implementation charges the shared [`RateBudget`](crate::RateBudget)
/// before returning, so call sites see a budget that already reflects their
/// own call.
#[async_trait]
pub trait VenueApi: Send + Sync {
    /// Depth snapshots for `pairs`. Weight: 1 per pair.
    async fn fetch_book(
        &self,
        pairs: &[Pair],
    ) -> ExchangeResult<HashMap<Pair, OrderBookSnapshot>>;

    /// All asset balances. Weight: 10.
    async fn fetch_balances(&self) -> ExchangeResult<HashMap<String, Balance>>;

    /// Per-pair trading rules. Fetched once at startup.
    async fn fetch_rules(&self) -> ExchangeResult<HashMap<Pair, PairRules>>;

    /// Place a limit order. Weight: 5.
    async fn place_order(&self, order: &NewOrder) -> ExchangeResult<PlacedOrder>;

    /// Cancel an order. Weight: 10.
    async fn cancel_order(&self, id: OrderId) -> ExchangeResult<()>;

    /// Status of one order. Weight: 5.
    async fn order_status(&self, id: OrderId) -> ExchangeResult<OrderDetails>;

    /// All open orders for this credential. Weight: 60.
    async fn open_orders(&self) -> ExchangeResult<Vec<OpenOrder>>;
}

/// Streaming best bid/ask from the reference exchange.
///
/// `subscribe` spawns the read loop internally and hands back the receiving
/// end; delivery is at-least-one-per-interval in arrival order, no replay.
/// The loop reconnects forever on transport errors and exits only when
/// `cancel` fires.
pub trait ReferenceFeed: Send + Sync {
    fn subscribe(
        &self,
        pair: Pair,
        symbol: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ReferencePrice>;
}
