//! Order lifecycle reconciliation.
//!
//! One slot per (pair, side), states `Idle → Placing → Resting → Cancelling
//! → Idle`. The owning task strictly sequences every transition for its key;
//! different keys interleave freely at the shared caches.
//!
//! Three loops per reconciler:
//! - place loop (per pair+side): selector → balance gate → place
//! - check loop (per pair): cancel resting orders that drifted out of
//!   tolerance once past the minimum hold
//! - fill sweep (global): drop orders the venue reports fully filled
//!
//! Failure policy: transport errors are absorbed and retried at the next
//! tick; insufficient-funds refreshes balances and skips; a refund-ineligible
//! cancel is terminal success; any other domain error tears the task down.

use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::balance_gate::{required_balance, resolve_order_amount};
use crate::config::{ReconcilerConfig, SelectorConfig};
use crate::error::{Result, StrategyError};
use crate::selector::{check_reference, select_price, value_ahead_of, SelectorInput};
use xmaker_core::{Amount, OrderSide, Pair, PairRules, RestingOrder};
use xmaker_exchange::{weight, ExchangeError, NewOrder, RateBudget, VenueApi};
use xmaker_feed::MarketCache;

/// Retry pause for transport failures during startup reset, where there is
/// no tick interval to lean on yet.
const STARTUP_RETRY: Duration = Duration::from_secs(1);

/// Lifecycle state of one (pair, side) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Placing,
    Resting,
    Cancelling,
}

type SlotKey = (Pair, OrderSide);

/// Owns the resting-order table and drives all lifecycle transitions.
pub struct Reconciler<V: VenueApi> {
    venue: Arc<V>,
    cache: Arc<MarketCache>,
    budget: Arc<RateBudget>,
    rules: HashMap<Pair, PairRules>,
    selector: SelectorConfig,
    config: ReconcilerConfig,
    orders: DashMap<SlotKey, RestingOrder>,
    states: DashMap<SlotKey, SlotState>,
}

impl<V: VenueApi> Reconciler<V> {
    pub fn new(
        venue: Arc<V>,
        cache: Arc<MarketCache>,
        budget: Arc<RateBudget>,
        rules: HashMap<Pair, PairRules>,
        selector: SelectorConfig,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            venue,
            cache,
            budget,
            rules,
            selector,
            config,
            orders: DashMap::new(),
            states: DashMap::new(),
        }
    }

    /// Current lifecycle state of a slot.
    pub fn slot_state(&self, pair: &Pair, side: OrderSide) -> SlotState {
        self.states
            .get(&(pair.clone(), side))
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// The resting order for a slot, if one is open.
    pub fn resting(&self, pair: &Pair, side: OrderSide) -> Option<RestingOrder> {
        self.orders
            .get(&(pair.clone(), side))
            .map(|entry| entry.value().clone())
    }

    /// Cancel whatever survived a previous run, then load balances.
    /// Orders younger than the minimum hold are awaited until the venue
    /// will accept the cancel as refund-eligible.
    pub async fn startup_reset(&self, cancel: &CancellationToken) -> Result<()> {
        info!("cancelling pre-existing open orders");
        let open = loop {
            match self.venue.open_orders().await {
                Ok(open) => break open,
                Err(e) if e.is_fatal() => {
                    return Err(self.fatal(e, None));
                }
                Err(e) => {
                    warn!(error = %e, "open-orders fetch failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(STARTUP_RETRY) => {}
                    }
                }
            }
        };

        for order in open {
            let age = (chrono::Utc::now() - order.created_at)
                .to_std()
                .unwrap_or_default();
            if let Some(wait) = self.config.min_hold().checked_sub(age) {
                info!(order_id = %order.id, wait_secs = wait.as_secs(), "waiting for order to become refund-eligible");
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            loop {
                match self.venue.cancel_order(order.id).await {
                    Ok(()) => break,
                    Err(ExchangeError::Domain(code)) if code.is_refund_ineligible() => {
                        info!(order_id = %order.id, "order already resolved on venue");
                        break;
                    }
                    Err(e) if e.is_fatal() => return Err(self.fatal(e, Some(&order.pair))),
                    Err(e) => {
                        warn!(order_id = %order.id, error = %e, "startup cancel failed, retrying");
                        tokio::select! {
                            _ = cancel.cancelled() => return Ok(()),
                            _ = tokio::time::sleep(STARTUP_RETRY) => {}
                        }
                    }
                }
            }
        }

        self.refresh_balances(None).await
    }

    /// Placement loop for one (pair, side) slot.
    pub async fn run_place_loop(
        &self,
        pair: Pair,
        side: OrderSide,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.place_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(pair = %pair, side = %side, "place loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(pair = %pair, side = %side, "place loop stopped");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }
            self.place_tick(&pair, side).await?;
        }
    }

    /// Cancel-check loop for one pair (both sides).
    pub async fn run_check_loop(&self, pair: Pair, cancel: CancellationToken) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.check_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(pair = %pair, "check loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(pair = %pair, "check loop stopped");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }
            self.check_tick(&pair).await?;
        }
    }

    /// Fill-sweep loop over all tracked orders.
    pub async fn run_sweep_loop(&self, cancel: CancellationToken) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.sweep_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = interval.tick() => {}
            }
            self.sweep_tick().await?;
        }
    }

    /// One placement attempt: `Idle → Placing → Resting`, or back to `Idle`.
    pub async fn place_tick(&self, pair: &Pair, side: OrderSide) -> Result<()> {
        let key = (pair.clone(), side);
        if self.orders.contains_key(&key) {
            return Ok(());
        }

        let rules = self
            .rules
            .get(pair)
            .ok_or_else(|| StrategyError::MissingRules(pair.clone()))?;

        let book = match self.venue.fetch_book(std::slice::from_ref(pair)).await {
            Ok(mut books) => match books.remove(pair) {
                Some(book) => book,
                None => {
                    warn!(pair = %pair, "venue returned no book for pair");
                    return Ok(());
                }
            },
            Err(e) => return self.absorb(e, pair, "fetch_book"),
        };
        self.cache.update_book(book.clone());

        let reference = self.cache.reference(pair);
        let input = SelectorInput {
            side,
            book: &book,
            reference: reference.as_ref(),
            my_orders: &[],
        };
        let Some(price) = select_price(&input, &self.selector) else {
            debug!(pair = %pair, side = %side, "selector vetoed, no order this tick");
            return Ok(());
        };

        let asset = spending_asset(pair, side);
        let available = self
            .cache
            .balance(asset)
            .map(|balance| (asset, balance.available));
        let amount = match resolve_order_amount(
            side,
            price,
            Amount::new(self.config.amount),
            self.config.max_buy_amount.map(Amount::new),
            rules,
            available,
        ) {
            Ok(amount) => amount,
            Err(skip) => {
                warn!(pair = %pair, side = %side, %skip, "placement gated off");
                return Ok(());
            }
        };

        self.states.insert(key.clone(), SlotState::Placing);
        let order = NewOrder {
            pair: pair.clone(),
            side,
            amount,
            price,
        };
        match self.venue.place_order(&order).await {
            Ok(placed) => {
                info!(
                    pair = %pair,
                    side = %side,
                    order_id = %placed.id,
                    price = %placed.price,
                    amount = %placed.amount,
                    "order resting"
                );
                self.orders.insert(
                    key.clone(),
                    RestingOrder {
                        id: placed.id,
                        pair: pair.clone(),
                        side,
                        price: placed.price,
                        amount: placed.amount,
                        placed_at: Instant::now(),
                    },
                );
                self.states.insert(key, SlotState::Resting);
                self.cache
                    .apply_hold(asset, required_balance(side, price, amount));
                self.refresh_balances(Some(pair)).await
            }
            Err(e) => {
                self.states.insert(key, SlotState::Idle);
                if let Some(code) = e.domain_code() {
                    if code.is_insufficient() {
                        warn!(pair = %pair, side = %side, code = %code, "venue rejected for funds, refreshing balances");
                        return self.refresh_balances(Some(pair)).await;
                    }
                }
                self.absorb(e, pair, "place_order")
            }
        }
    }

    /// One cancel evaluation over both sides of a pair.
    pub async fn check_tick(&self, pair: &Pair) -> Result<()> {
        let held: Vec<(SlotKey, RestingOrder)> = self
            .orders
            .iter()
            .filter(|entry| {
                entry.key().0 == *pair && entry.value().age() >= self.config.min_hold()
            })
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        if held.is_empty() {
            return Ok(());
        }

        let book = match self.venue.fetch_book(std::slice::from_ref(pair)).await {
            Ok(mut books) => match books.remove(pair) {
                Some(book) => book,
                None => return Ok(()),
            },
            Err(e) => return self.absorb(e, pair, "fetch_book"),
        };
        self.cache.update_book(book.clone());
        let reference = self.cache.reference(pair);

        for (key, order) in held {
            let side = key.1;
            let levels = book.side_levels(side);

            let ahead = value_ahead_of(order.price, side, levels);
            if ahead > self.config.replacement_value_offset {
                info!(
                    pair = %pair,
                    side = %side,
                    order_id = %order.id,
                    value_ahead = %ahead,
                    "replacing: competing value ahead exceeds offset"
                );
                self.cancel_resting(&key, &order).await?;
                continue;
            }

            if let Some(reference) = reference.as_ref() {
                if !check_reference(order.price, side, Some(reference), &self.selector) {
                    info!(
                        pair = %pair,
                        side = %side,
                        order_id = %order.id,
                        price = %order.price,
                        reference = %reference.side_price(side),
                        "replacing: resting price violates reference guard"
                    );
                    self.cancel_resting(&key, &order).await?;
                    continue;
                }
            }

            if self.config.requote_drift > Decimal::ZERO {
                let mine = [(order.price, order.amount)];
                let input = SelectorInput {
                    side,
                    book: &book,
                    reference: reference.as_ref(),
                    my_orders: &mine,
                };
                if let Some(fresh) = select_price(&input, &self.selector) {
                    let drift = (fresh.inner() - order.price.inner()).abs() / order.price.inner();
                    if drift > self.config.requote_drift {
                        info!(
                            pair = %pair,
                            side = %side,
                            order_id = %order.id,
                            resting = %order.price,
                            fresh = %fresh,
                            "replacing: selector price drifted"
                        );
                        self.cancel_resting(&key, &order).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// One pass over tracked orders, dropping confirmed full fills.
    /// A pure read: skipped when the weight budget is exhausted.
    pub async fn sweep_tick(&self) -> Result<()> {
        let tracked: Vec<(SlotKey, RestingOrder)> = self
            .orders
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (key, order) in tracked {
            if self.budget.remaining() < weight::STATUS {
                debug!("weight budget exhausted, deferring fill sweep");
                return Ok(());
            }
            match self.venue.order_status(order.id).await {
                Ok(details) if details.is_filled() => {
                    info!(
                        pair = %key.0,
                        side = %key.1,
                        order_id = %order.id,
                        "order fully filled"
                    );
                    self.orders.remove(&key);
                    self.states.insert(key.clone(), SlotState::Idle);
                    self.refresh_balances(Some(&key.0)).await?;
                }
                Ok(details) => {
                    debug!(
                        order_id = %order.id,
                        value_remaining = %details.value_remaining,
                        "order still resting"
                    );
                }
                Err(e) => self.absorb(e, &key.0, "order_status")?,
            }
        }
        Ok(())
    }

    /// `Resting → Cancelling → Idle`. A refund-ineligible rejection means
    /// the order already resolved on the venue: success-equivalent.
    async fn cancel_resting(&self, key: &SlotKey, order: &RestingOrder) -> Result<()> {
        self.states.insert(key.clone(), SlotState::Cancelling);
        match self.venue.cancel_order(order.id).await {
            Ok(()) => {}
            Err(ExchangeError::Domain(code)) if code.is_refund_ineligible() => {
                info!(order_id = %order.id, "cancel unnecessary, order already resolved");
            }
            Err(e) => {
                // left Resting: the next check tick retries
                self.states.insert(key.clone(), SlotState::Resting);
                return self.absorb(e, &key.0, "cancel_order");
            }
        }
        self.orders.remove(key);
        self.states.insert(key.clone(), SlotState::Idle);
        let asset = spending_asset(&key.0, key.1);
        self.cache.release_hold(
            asset,
            required_balance(order.side, order.price, order.amount),
        );
        self.refresh_balances(Some(&key.0)).await
    }

    /// Wholesale balance reload from the venue. Transport failures are
    /// tolerated - the cache stays stale until the next order event.
    async fn refresh_balances(&self, pair: Option<&Pair>) -> Result<()> {
        match self.venue.fetch_balances().await {
            Ok(balances) => {
                self.cache.replace_balances(balances);
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(self.fatal(e, pair)),
            Err(e) => {
                warn!(error = %e, "balance refresh failed, keeping cached values");
                Ok(())
            }
        }
    }

    /// Absorb a venue error at tick level: transport and venue rate limits
    /// retry on the next tick, everything else is fatal.
    fn absorb(&self, e: ExchangeError, pair: &Pair, op: &str) -> Result<()> {
        if e.is_fatal() {
            error!(pair = %pair, op, error = %e, "fatal venue error");
            return Err(self.fatal(e, Some(pair)));
        }
        warn!(pair = %pair, op, error = %e, "venue call failed, retrying next tick");
        Ok(())
    }

    fn fatal(&self, source: ExchangeError, pair: Option<&Pair>) -> StrategyError {
        match pair {
            Some(pair) => StrategyError::Venue {
                pair: pair.clone(),
                source,
            },
            None => StrategyError::Startup(source),
        }
    }
}

/// Asset a placement on `side` spends: quote for buys, base for sells.
fn spending_asset(pair: &Pair, side: OrderSide) -> &str {
    match side {
        OrderSide::Buy => pair.quote(),
        OrderSide::Sell => pair.base(),
    }
}
