//! Background collectors feeding the market cache.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::MarketCache;
use xmaker_core::Pair;
use xmaker_exchange::ReferenceFeed;

/// Spawn the reference-price collector for one pair.
///
/// Subscribes `symbol` on the reference feed and copies every tick into the
/// cache. Exits when the feed channel closes (the feed honors the same
/// cancellation token) or when `cancel` fires at the receive point.
pub fn spawn_reference_collector(
    feed: Arc<dyn ReferenceFeed>,
    cache: Arc<MarketCache>,
    pair: Pair,
    symbol: String,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = feed.subscribe(pair.clone(), &symbol, cancel.clone());
    tokio::spawn(async move {
        info!(pair = %pair, symbol = %symbol, "reference collector started");
        loop {
            let tick = tokio::select! {
                _ = cancel.cancelled() => break,
                tick = rx.recv() => match tick {
                    Some(tick) => tick,
                    None => break,
                },
            };
            debug!(pair = %pair, bid = %tick.bid, ask = %tick.ask, "reference update");
            cache.update_reference(tick);
        }
        info!(pair = %pair, "reference collector stopped");
    })
}
