use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use common::{BookLevel, DataSource, Error, Observation, OrderBookDepth, Result};

/// Scripted market-data source for dry runs and tests.
///
/// Prices and open-interest readings cycle through fixed per-symbol
/// sequences; the order book is synthesized around the latest served
/// price. No network traffic is ever made.
pub struct ReplaySource {
    scripts: Arc<RwLock<HashMap<String, SymbolScript>>>,
}

#[derive(Debug, Clone)]
struct SymbolScript {
    prices: Vec<f64>,
    open_interest: Vec<f64>,
    price_idx: usize,
    oi_idx: usize,
    last_price: f64,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a scripted sequence for one symbol. Sequences wrap
    /// around when exhausted.
    pub async fn load_script(&self, symbol: &str, prices: Vec<f64>, open_interest: Vec<f64>) {
        let last_price = prices.first().copied().unwrap_or(0.0);
        self.scripts.write().await.insert(
            symbol.to_string(),
            SymbolScript {
                prices,
                open_interest,
                price_idx: 0,
                oi_idx: 0,
                last_price,
            },
        );
    }

    /// Build a source with a deterministic demo script per symbol: a
    /// triangle wave around a per-symbol base price and a slowly
    /// rising open-interest series.
    pub async fn demo(symbols: &[String]) -> Self {
        let source = Self::new();
        for symbol in symbols {
            let base = 100.0 + (symbol.bytes().map(u64::from).sum::<u64>() % 900) as f64;
            let prices: Vec<f64> = (0..40)
                .map(|i| {
                    let tri = (i % 20) as f64;
                    let wave = if tri < 10.0 { tri } else { 20.0 - tri };
                    base * (1.0 + 0.002 * wave)
                })
                .collect();
            let open_interest: Vec<f64> = (0..40).map(|i| 1_000.0 + 25.0 * i as f64).collect();
            source.load_script(symbol, prices, open_interest).await;
        }
        info!(symbols = symbols.len(), "ReplaySource seeded with demo scripts");
        source
    }
}

impl Default for ReplaySource {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(symbol: &str) -> Error {
    Error::Source(format!("no scripted data for symbol '{symbol}'"))
}

#[async_trait]
impl DataSource for ReplaySource {
    async fn fetch_observation(&self, symbol: &str) -> Result<Observation> {
        let mut scripts = self.scripts.write().await;
        let script = scripts.get_mut(symbol).ok_or_else(|| missing(symbol))?;
        if script.prices.is_empty() {
            return Err(missing(symbol));
        }

        let price = script.prices[script.price_idx % script.prices.len()];
        script.price_idx += 1;
        script.last_price = price;

        Ok(Observation::new(symbol, price, Utc::now().timestamp_millis()))
    }

    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBookDepth> {
        let scripts = self.scripts.read().await;
        let script = scripts.get(symbol).ok_or_else(|| missing(symbol))?;
        let mid = script.last_price;

        // Three synthetic levels per side, 10bps apart
        let level = |offset_bps: f64, quantity: f64| BookLevel {
            price: mid * (1.0 + offset_bps / 10_000.0),
            quantity,
        };
        Ok(OrderBookDepth {
            bids: vec![level(-10.0, 5.0), level(-20.0, 3.0), level(-30.0, 2.0)],
            asks: vec![level(10.0, 4.0), level(20.0, 3.0), level(30.0, 2.0)],
        })
    }

    async fn fetch_open_interest(&self, symbol: &str) -> Result<f64> {
        let mut scripts = self.scripts.write().await;
        let script = scripts.get_mut(symbol).ok_or_else(|| missing(symbol))?;
        if script.open_interest.is_empty() {
            return Err(missing(symbol));
        }

        let oi = script.open_interest[script.oi_idx % script.open_interest.len()];
        script.oi_idx += 1;
        Ok(oi)
    }
}
