use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level signal config file (TOML).
///
/// Example `config/signals.toml`:
/// ```toml
/// [[strategy]]
/// type = "open-interest"
/// name = "BTC open interest"
/// symbols = ["BTCUSDT"]
/// cadence_secs = 3600
///
/// [strategy.params]
/// peak_window_hours = 24
/// trough_window_days = 90
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalFileConfig {
    #[serde(rename = "strategy")]
    pub strategies: Vec<StrategyConfig>,
}

/// The built-in strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    OpenInterest,
    HotZone,
    Lunar,
    SmartMoney,
}

impl StrategyKind {
    /// Name persisted in signal records and shown in the dashboard.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::OpenInterest => "open-interest",
            StrategyKind::HotZone => "hot-zone",
            StrategyKind::Lunar => "lunar",
            StrategyKind::SmartMoney => "smart-money",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StrategyConfig {
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    /// Human-readable name shown in logs and the dashboard.
    pub name: String,
    /// Symbols this instance evaluates each cycle.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Polling cadence in seconds (the original ran cadences between
    /// 2s and 24h across strategies).
    pub cadence_secs: u64,
    /// Strategy-specific parameters.
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

impl StrategyConfig {
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(key)
            .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
            .unwrap_or(default)
    }

    pub fn param_i64(&self, key: &str, default: i64) -> i64 {
        self.params
            .get(key)
            .and_then(|v| v.as_integer())
            .unwrap_or(default)
    }

    pub fn param_str(&self, key: &str, default: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }
}

impl SignalFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read signal config at '{path}': {e}"));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse signal config at '{path}': {e}"))
    }
}
