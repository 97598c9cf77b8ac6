use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{info, warn};

use common::{DataSource, EngineState, Error, Result, Side, SignalRecord, Sink};
use signal::config::{StrategyConfig, StrategyKind};
use signal::wallet::{aggregate_flows, HoldingsLedger};
use signal::SignalEngine;

use crate::dune::DuneClient;

/// Bound on one DataSource round trip inside a tick. A fetch that
/// exceeds it skips the cycle instead of stalling the cadence.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared dependencies handed to every poller task.
#[derive(Clone)]
pub struct PollContext {
    pub engine: Arc<SignalEngine>,
    pub source: Arc<dyn DataSource>,
    pub sink: Arc<dyn Sink>,
    pub state: Arc<RwLock<EngineState>>,
}

impl PollContext {
    /// Publish unless the engine is paused. Observations keep flowing
    /// while paused; only publication is suppressed.
    async fn publish(&self, record: SignalRecord) {
        if *self.state.read().await != EngineState::Running {
            return;
        }
        if let Err(e) = self.sink.publish(record).await {
            warn!(error = %e, "failed to publish signal");
        }
    }
}

async fn bounded<T>(fut: impl Future<Output = Result<T>>, what: &str) -> Result<T> {
    match timeout(FETCH_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Source(format!("{what} timed out"))),
    }
}

fn cadence(cfg: &StrategyConfig) -> tokio::time::Interval {
    let mut ticker = interval(Duration::from_secs(cfg.cadence_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// All cycle errors are recoverable by design: log and move on.
fn skip_cycle(strategy: &str, symbol: &str, err: &Error) {
    warn!(strategy, symbol, error = %err, "cycle skipped");
}

/// Poll open interest for each configured symbol on a fixed cadence.
pub async fn run_open_interest(ctx: PollContext, cfg: StrategyConfig) {
    info!(name = %cfg.name, cadence_secs = cfg.cadence_secs, "open-interest poller running");
    let mut ticker = cadence(&cfg);
    loop {
        ticker.tick().await;
        for symbol in &cfg.symbols {
            if let Err(e) = open_interest_cycle(&ctx, symbol).await {
                skip_cycle(&cfg.name, symbol, &e);
            }
        }
    }
}

async fn open_interest_cycle(ctx: &PollContext, symbol: &str) -> Result<()> {
    let oi = bounded(ctx.source.fetch_open_interest(symbol), "open interest fetch").await?;
    let record = ctx
        .engine
        .evaluate_open_interest(symbol, oi, Utc::now().timestamp_millis())
        .await?;
    ctx.publish(record).await;
    Ok(())
}

/// Poll the latest trade price plus order book depth and feed the
/// hot-zone accumulator.
pub async fn run_hot_zone(ctx: PollContext, cfg: StrategyConfig) {
    info!(name = %cfg.name, cadence_secs = cfg.cadence_secs, "hot-zone poller running");
    let mut ticker = cadence(&cfg);
    loop {
        ticker.tick().await;
        for symbol in &cfg.symbols {
            if let Err(e) = hot_zone_cycle(&ctx, symbol).await {
                skip_cycle(&cfg.name, symbol, &e);
            }
        }
    }
}

async fn hot_zone_cycle(ctx: &PollContext, symbol: &str) -> Result<()> {
    let observation = bounded(ctx.source.fetch_observation(symbol), "price fetch").await?;
    let depth = bounded(ctx.source.fetch_order_book(symbol), "order book fetch").await?;
    let record = ctx
        .engine
        .evaluate_hot_zone(symbol, observation.value, &depth, observation.timestamp_ms)
        .await?;
    ctx.publish(record).await;
    Ok(())
}

/// Poll prices and run the lunar-cycle comparison.
pub async fn run_lunar(ctx: PollContext, cfg: StrategyConfig) {
    info!(name = %cfg.name, cadence_secs = cfg.cadence_secs, "lunar poller running");
    let mut ticker = cadence(&cfg);
    loop {
        ticker.tick().await;
        for symbol in &cfg.symbols {
            if let Err(e) = lunar_cycle(&ctx, symbol).await {
                skip_cycle(&cfg.name, symbol, &e);
            }
        }
    }
}

async fn lunar_cycle(ctx: &PollContext, symbol: &str) -> Result<()> {
    let observation = bounded(ctx.source.fetch_observation(symbol), "price fetch").await?;
    let record = ctx
        .engine
        .evaluate_lunar(symbol, observation.value, observation.timestamp_ms)
        .await?;
    ctx.publish(record).await;
    Ok(())
}

/// Poll the wallet analytics queries: aggregate buy/sell flows for the
/// tracked wallet and walk the profitable-wallet leaderboard for
/// position transitions.
pub async fn run_smart_money(ctx: PollContext, cfg: StrategyConfig, dune: Arc<DuneClient>) {
    info!(name = %cfg.name, cadence_secs = cfg.cadence_secs, "smart-money poller running");
    let flows_query = cfg.param_i64("flows_query", 4_143_247) as u64;
    let wallets_query = cfg.param_i64("profitable_wallets_query", 4_216_808) as u64;
    let analysis_query = cfg.param_i64("wallet_analysis_query", 4_228_640) as u64;
    let symbol = cfg.param_str("symbol", "SOL");

    // Ledger state lives with the poller for the process lifetime
    let mut ledger = HoldingsLedger::new();

    let mut ticker = cadence(&cfg);
    loop {
        ticker.tick().await;
        if let Err(e) = smart_money_cycle(
            &ctx,
            &dune,
            &mut ledger,
            flows_query,
            wallets_query,
            analysis_query,
            &symbol,
        )
        .await
        {
            skip_cycle(&cfg.name, &symbol, &e);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn smart_money_cycle(
    ctx: &PollContext,
    dune: &DuneClient,
    ledger: &mut HoldingsLedger,
    flows_query: u64,
    wallets_query: u64,
    analysis_query: u64,
    symbol: &str,
) -> Result<()> {
    let flow_rows = bounded(dune.wallet_flows(flows_query, 1_000), "wallet flows fetch").await?;
    let flows = aggregate_flows(&flow_rows);

    let wallets = bounded(
        dune.profitable_wallets(wallets_query, 10),
        "profitable wallets fetch",
    )
    .await?;

    let mut events = Vec::new();
    for wallet in &wallets {
        let rows = bounded(
            dune.wallet_analysis(analysis_query, 1_000, wallet),
            "wallet analysis fetch",
        )
        .await?;
        for row in &rows {
            if let Some(event) = ledger.apply(wallet, row) {
                events.push(event);
            }
        }
    }

    let record = SignalRecord::new(
        symbol,
        StrategyKind::SmartMoney.as_str(),
        Side::None,
        json!({ "flows": flows, "events": events }),
        Utc::now().timestamp_millis(),
    );
    ctx.publish(record).await;
    Ok(())
}
