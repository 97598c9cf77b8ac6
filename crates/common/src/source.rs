use async_trait::async_trait;

use crate::{Observation, OrderBookDepth, Result, SignalRecord};

/// Abstraction over the upstream market-data APIs.
///
/// `BinanceSource` implements this for live polling.
/// `ReplaySource` implements this for dry runs and tests.
///
/// Every method fails with a typed error on network or parse trouble.
/// Callers treat a failure as "no update this cycle" — a failed fetch
/// is never collapsed into a zero value.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Latest traded price for a symbol, as a timestamped observation.
    async fn fetch_observation(&self, symbol: &str) -> Result<Observation>;

    /// Current order book depth snapshot for a symbol.
    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBookDepth>;

    /// Current open interest for a futures symbol.
    async fn fetch_open_interest(&self, symbol: &str) -> Result<f64>;
}

/// Destination for emitted signal records.
///
/// Fire-and-forget from the caller's perspective, at-least-once
/// delivery. The production sink persists to the database and pushes to
/// live WebSocket subscribers.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn publish(&self, record: SignalRecord) -> Result<()>;
}
