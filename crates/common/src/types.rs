use serde::{Deserialize, Serialize};

/// A single timestamped scalar observation for a symbol: a traded
/// price, an open-interest reading, or a liquidation intensity.
/// Immutable once recorded — created by a `DataSource` adapter and
/// owned by the observation store from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: String,
    pub value: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl Observation {
    pub fn new(symbol: impl Into<String>, value: f64, timestamp_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            value,
            timestamp_ms,
        }
    }
}

/// One price level on an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Order book depth snapshot returned by a `DataSource`.
/// Levels are ordered best-first on both sides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBookDepth {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// A price level with the liquidation intensity derived for it.
/// One zone is produced per hot-zone observation event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidationZone {
    pub price: f64,
    pub intensity: f64,
}

/// Directional side of an emitted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
    /// Evaluation ran but no trade rule fired.
    None,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
            Side::None => write!(f, "none"),
        }
    }
}

/// A classified signal produced by one strategy evaluation.
/// Write-once: created by the signal engine, consumed by the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub symbol: String,
    /// Strategy instance name, e.g. "open-interest".
    pub strategy: String,
    pub side: Side,
    /// Strategy-specific key/value details (thresholds hit, sums,
    /// target prices). Stored verbatim.
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub produced_at_ms: i64,
}

impl SignalRecord {
    pub fn new(
        symbol: impl Into<String>,
        strategy: impl Into<String>,
        side: Side,
        payload: serde_json::Value,
        produced_at_ms: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            strategy: strategy.into(),
            side,
            payload,
            produced_at_ms,
        }
    }
}

/// Whether the bot polls the real exchange or a scripted replay source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Live,
    Replay,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Live => write!(f, "live"),
            RunMode::Replay => write!(f, "replay"),
        }
    }
}

/// Current state of the polling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
    /// Pollers keep recording observations, signal publication is
    /// suppressed.
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
            EngineState::Paused => write!(f, "paused"),
        }
    }
}

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Start,
    Stop,
    Pause,
    Resume,
}
