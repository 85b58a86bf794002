//! Main application orchestration.
//!
//! Startup order matters: trading rules first, then the reference
//! collectors, then the startup reset (cancel survivors, load balances),
//! and only then the reconciler loops. Shutdown is a shared cancellation
//! token honored by every task at its sleep/receive points.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use xmaker_core::{OrderSide, Pair, PairRules};
use xmaker_exchange::{RateBudget, ReferenceStream, RestClient, RestConfig, VenueApi};
use xmaker_feed::{spawn_reference_collector, MarketCache};
use xmaker_strategy::{Reconciler, StrategyError};

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run until ctrl-c or a fatal venue error.
    pub async fn run(self) -> AppResult<()> {
        let budget = Arc::new(RateBudget::new(self.config.venue.weight_capacity));
        let venue = Arc::new(RestClient::new(
            RestConfig {
                base_url: self.config.venue.base_url.clone(),
                api_id: self.config.venue.api_id.clone(),
                secret: self.config.venue.secret.clone(),
            },
            budget.clone(),
        )?);
        let cache = Arc::new(MarketCache::new());
        let cancel = CancellationToken::new();

        let pairs: Vec<(Pair, String)> = self
            .config
            .pairs
            .iter()
            .map(|pc| Ok((pc.parsed_pair()?, pc.reference_symbol.clone())))
            .collect::<AppResult<_>>()?;

        // Trading rules are fetched once and cached for the process lifetime
        info!("fetching venue trading rules");
        let all_rules = loop {
            match venue.fetch_rules().await {
                Ok(rules) => break rules,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "rules fetch failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        };
        let mut rules: HashMap<Pair, PairRules> = HashMap::new();
        for (pair, _) in &pairs {
            let pair_rules = all_rules
                .get(pair)
                .cloned()
                .ok_or_else(|| StrategyError::MissingRules(pair.clone()))?;
            info!(
                pair = %pair,
                min_amount = %pair_rules.min_amount,
                amount_precision = pair_rules.amount_precision,
                "venue rules loaded"
            );
            rules.insert(pair.clone(), pair_rules);
        }

        let feed = Arc::new(ReferenceStream::new(self.config.reference.ws_url.clone()));
        let mut collectors = Vec::new();
        for (pair, symbol) in &pairs {
            collectors.push(spawn_reference_collector(
                feed.clone(),
                cache.clone(),
                pair.clone(),
                symbol.clone(),
                cancel.clone(),
            ));
        }

        let reconciler = Arc::new(Reconciler::new(
            venue,
            cache,
            budget,
            rules,
            self.config.selector.clone(),
            self.config.reconciler.clone(),
        ));
        reconciler.startup_reset(&cancel).await?;

        let mut tasks: JoinSet<Result<(), StrategyError>> = JoinSet::new();
        for (pair, _) in &pairs {
            if self.config.reconciler.buy_enabled {
                let rc = reconciler.clone();
                let pair = pair.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move { rc.run_place_loop(pair, OrderSide::Buy, cancel).await });
            }
            if self.config.reconciler.sell_enabled {
                let rc = reconciler.clone();
                let pair = pair.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move { rc.run_place_loop(pair, OrderSide::Sell, cancel).await });
            }
            let rc = reconciler.clone();
            let pair = pair.clone();
            let check_cancel = cancel.clone();
            tasks.spawn(async move { rc.run_check_loop(pair, check_cancel).await });
        }
        {
            let rc = reconciler.clone();
            let sweep_cancel = cancel.clone();
            tasks.spawn(async move { rc.run_sweep_loop(sweep_cancel).await });
        }

        info!(pairs = pairs.len(), "entering steady state");
        let mut outcome: AppResult<()> = Ok(());
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    cancel.cancel();
                    break;
                }
                joined = tasks.join_next() => {
                    match joined {
                        Some(Ok(Ok(()))) => continue,
                        Some(Ok(Err(e))) => {
                            error!(error = %e, "reconciler task failed, shutting down");
                            cancel.cancel();
                            outcome = Err(AppError::Strategy(e));
                            break;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "reconciler task panicked, shutting down");
                            cancel.cancel();
                            outcome = Err(AppError::Task(e.to_string()));
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        // Drain remaining tasks; they exit at their next cancellation point
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Err(e)) = joined {
                warn!(error = %e, "task error during shutdown");
            }
        }
        for collector in collectors {
            let _ = collector.await;
        }

        info!("shutdown complete");
        outcome
    }
}
