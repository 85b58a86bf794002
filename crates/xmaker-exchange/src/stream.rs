//! Reference-exchange book-ticker stream.
//!
//! Subscribes to the reference exchange's per-symbol best bid/ask WebSocket
//! stream and forwards updates as [`ReferencePrice`] values. The read loop
//! reconnects forever on transport errors; it exits only on cancellation.

use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ReferenceFeed;
use xmaker_core::{Pair, Price, ReferencePrice};

/// Delay before reconnecting a dropped stream.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Channel capacity per subscription. The consumer only ever wants the
/// latest tick, so a small buffer with drop-on-full send is enough.
const CHANNEL_CAPACITY: usize = 64;

/// Book-ticker frame from the reference exchange.
#[derive(Debug, Deserialize)]
struct BookTickerFrame {
    #[serde(rename = "b", with = "rust_decimal::serde::str")]
    bid_price: Decimal,
    #[serde(rename = "a", with = "rust_decimal::serde::str")]
    ask_price: Decimal,
}

/// Reference feed over the exchange's combined-stream WebSocket endpoint.
pub struct ReferenceStream {
    /// Stream base URL, e.g. `wss://stream.example:9443`.
    ws_base: String,
}

impl ReferenceStream {
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
        }
    }

    fn stream_url(&self, symbol: &str) -> String {
        format!("{}/ws/{}@bookTicker", self.ws_base, symbol.to_lowercase())
    }

    async fn run_subscription(
        url: String,
        pair: Pair,
        tx: mpsc::Sender<ReferencePrice>,
        cancel: CancellationToken,
    ) {
        loop {
            if cancel.is_cancelled() {
                return;
            }

            let (mut ws, _) = match connect_async(url.as_str()).await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(url = %url, error = %e, "reference stream connect failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                    }
                }
            };
            info!(url = %url, pair = %pair, "reference stream connected");

            loop {
                let frame = tokio::select! {
                    _ = cancel.cancelled() => return,
                    frame = ws.next() => frame,
                };

                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(pair = %pair, error = %e, "reference stream read error, reconnecting");
                        break;
                    }
                    None => {
                        warn!(pair = %pair, "reference stream closed, reconnecting");
                        break;
                    }
                };

                let text = match msg {
                    Message::Text(text) => text,
                    Message::Ping(_) | Message::Pong(_) => continue,
                    Message::Close(_) => {
                        warn!(pair = %pair, "reference stream close frame, reconnecting");
                        break;
                    }
                    _ => continue,
                };

                let frame: BookTickerFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        // One malformed frame is not worth a reconnect
                        warn!(pair = %pair, error = %e, "unparseable ticker frame, skipping");
                        continue;
                    }
                };

                let tick = ReferencePrice::new(
                    pair.clone(),
                    Price::new(frame.bid_price),
                    Price::new(frame.ask_price),
                );
                debug!(pair = %pair, bid = %tick.bid, ask = %tick.ask, "reference tick");

                // try_send: last-write-wins downstream, a slow consumer
                // should never stall the socket read
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(tick) {
                    return;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }
}

impl ReferenceFeed for ReferenceStream {
    fn subscribe(
        &self,
        pair: Pair,
        symbol: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ReferencePrice> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let url = self.stream_url(symbol);
        tokio::spawn(Self::run_subscription(url, pair, tx, cancel));
        rx
    }
}
