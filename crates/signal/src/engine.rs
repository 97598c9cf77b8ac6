use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use common::{
    LiquidationZone, Observation, OrderBookDepth, Result, Side, SignalRecord,
};

use crate::classify::{self, LunarSignal, LunarTracker, OiThresholds};
use crate::config::StrategyKind;
use crate::cycle::CycleClock;
use crate::extrema::{pct_change, ExtremaTracker};
use crate::hotzone::{book_intensity, HotZoneAccumulator, HotZoneState};
use crate::store::{ObservationStore, RetentionPolicy};

/// Engine-wide tuning, shared across symbols.
#[derive(Debug, Clone, Copy)]
pub struct SignalEngineConfig {
    pub retention: RetentionPolicy,
    pub oi_thresholds: OiThresholds,
    /// Lookback for the open-interest peak (1 day).
    pub oi_peak_window_ms: i64,
    /// Lookback for the open-interest trough (90 days).
    pub oi_trough_window_ms: i64,
    pub clock: CycleClock,
}

impl Default for SignalEngineConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::default(),
            oi_thresholds: OiThresholds::default(),
            oi_peak_window_ms: 24 * 60 * 60 * 1000,
            oi_trough_window_ms: 90 * 24 * 60 * 60 * 1000,
            clock: CycleClock::lunar(),
        }
    }
}

/// Everything tracked for one symbol. Price and open-interest
/// observations live in separate stores so their windows never mix.
struct SymbolState {
    prices: ObservationStore,
    open_interest: ObservationStore,
    hot_zones: HotZoneAccumulator,
    lunar: LunarTracker,
}

impl SymbolState {
    fn new(retention: RetentionPolicy) -> Self {
        Self {
            prices: ObservationStore::new(retention),
            open_interest: ObservationStore::new(retention),
            hot_zones: HotZoneAccumulator::new(),
            lunar: LunarTracker::new(),
        }
    }
}

/// The signal aggregation engine: one state slice per symbol, no
/// ambient globals. Instantiated once at startup and threaded through
/// every pipeline call.
///
/// The outer map supports concurrent insert-if-absent; each slice is
/// behind its own mutex, so evaluations for different symbols run
/// concurrently while two overlapping evaluations for the same symbol
/// serialize. Given the same observation history the evaluations
/// produce identical results regardless of invocation cadence.
pub struct SignalEngine {
    config: SignalEngineConfig,
    symbols: RwLock<HashMap<String, Arc<Mutex<SymbolState>>>>,
}

impl SignalEngine {
    pub fn new(config: SignalEngineConfig) -> Self {
        Self {
            config,
            symbols: RwLock::new(HashMap::new()),
        }
    }

    async fn slice(&self, symbol: &str) -> Arc<Mutex<SymbolState>> {
        if let Some(slot) = self.symbols.read().await.get(symbol) {
            return slot.clone();
        }
        let mut map = self.symbols.write().await;
        map.entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SymbolState::new(self.config.retention))))
            .clone()
    }

    /// Ingest one open-interest reading and classify it against the
    /// rolling peak and trough.
    ///
    /// Always returns a record (the feed is broadcast every cycle);
    /// `side` is `None` and the payload's `signal` is null when no rule
    /// in the cascade matched.
    pub async fn evaluate_open_interest(
        &self,
        symbol: &str,
        current_oi: f64,
        now_ms: i64,
    ) -> Result<SignalRecord> {
        let slot = self.slice(symbol).await;
        let mut state = slot.lock().await;

        let previous = state.open_interest.latest(symbol).map(|o| o.value);
        state
            .open_interest
            .record(Observation::new(symbol, current_oi, now_ms))?;

        let oi_change_pct = match previous {
            Some(prev) => Some(pct_change(prev, current_oi)?),
            None => None,
        };

        let tracker = ExtremaTracker::new(&state.open_interest);
        let peak = tracker.peak(symbol, self.config.oi_peak_window_ms, now_ms)?;
        let bottom = tracker.trough(symbol, self.config.oi_trough_window_ms, now_ms)?;

        let signal =
            classify::classify_open_interest(current_oi, peak, bottom, &self.config.oi_thresholds);
        debug!(symbol, current_oi, peak, bottom, ?signal, "open interest evaluated");

        let side = signal.map(|s| s.side).unwrap_or(Side::None);
        let payload = json!({
            "current_oi": current_oi,
            "oi_change_pct": oi_change_pct,
            "peak_oi": peak,
            "bottom_oi": bottom,
            "signal": signal.map(|s| s.label),
        });

        Ok(SignalRecord::new(
            symbol,
            StrategyKind::OpenInterest.as_str(),
            side,
            payload,
            now_ms,
        ))
    }

    /// Ingest one trade price plus the order book depth behind it,
    /// fold the derived liquidation zone into the accumulator, and
    /// classify the resulting direction bias.
    pub async fn evaluate_hot_zone(
        &self,
        symbol: &str,
        price: f64,
        depth: &OrderBookDepth,
        now_ms: i64,
    ) -> Result<SignalRecord> {
        let intensity = book_intensity(depth, price)?;

        let slot = self.slice(symbol).await;
        let mut state = slot.lock().await;

        state
            .prices
            .record(Observation::new(symbol, price, now_ms))?;
        state
            .hot_zones
            .ingest(symbol, LiquidationZone { price, intensity });

        let bias = state.hot_zones.direction_bias(symbol, price);
        let target_price = state
            .hot_zones
            .hot_zone_for(symbol)
            .map(|z| z.price)
            .unwrap_or(0.0);
        let action = classify::trade_action(bias, target_price);

        // State exists: the ingest above created it at the latest
        let hz = state.hot_zones.state_for(symbol).copied().unwrap_or_default();
        debug!(symbol, price, intensity, bias, "hot zone evaluated");

        let payload = json!({
            "high_sum": hz.high_sum,
            "low_sum": hz.low_sum,
            "direction_bias": bias,
            "target_price": action.target_price,
            "alt_action": action.alt_action,
            "intensity": intensity,
        });

        Ok(SignalRecord::new(
            symbol,
            StrategyKind::HotZone.as_str(),
            action.side,
            payload,
            now_ms,
        ))
    }

    /// Evaluate the lunar-cycle comparison for one symbol at `now_ms`.
    ///
    /// Always returns a record; `side` is `None` outside a firing
    /// window (and on the bootstrap evaluation that seeds the
    /// reference prices).
    pub async fn evaluate_lunar(
        &self,
        symbol: &str,
        price: f64,
        now_ms: i64,
    ) -> Result<SignalRecord> {
        let phase = self.config.clock.phase(now_ms)?;

        let slot = self.slice(symbol).await;
        let mut state = slot.lock().await;
        let outcome = state.lunar.observe(symbol, phase, price);
        debug!(symbol, phase, signal = ?outcome.signal, "lunar cycle evaluated");

        let side = match outcome.signal {
            Some(LunarSignal::Buy) => Side::Long,
            Some(LunarSignal::Sell) => Side::Short,
            None => Side::None,
        };
        let payload = json!({
            "phase": outcome.phase,
            "new_moon": outcome.new_moon,
            "full_moon": outcome.full_moon,
            "signal": outcome.signal,
        });

        Ok(SignalRecord::new(
            symbol,
            StrategyKind::Lunar.as_str(),
            side,
            payload,
            now_ms,
        ))
    }

    /// Snapshot of every symbol's hot-zone state, ordered by symbol.
    pub async fn hot_zone_snapshot(&self) -> Vec<(String, HotZoneState)> {
        let map = self.symbols.read().await;
        let mut out = Vec::with_capacity(map.len());
        for (symbol, slot) in map.iter() {
            let state = slot.lock().await;
            if let Some(hz) = state.hot_zones.state_for(symbol) {
                out.push((symbol.clone(), *hz));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Recent price observations for a symbol. Read-only: querying an
    /// unknown symbol does not create a state slice for it.
    pub async fn recent_observations(&self, symbol: &str, since_ms: i64) -> Vec<Observation> {
        let slot = { self.symbols.read().await.get(symbol).cloned() };
        match slot {
            Some(slot) => slot.lock().await.prices.range_since(symbol, since_ms),
            None => Vec::new(),
        }
    }

    /// Operator action: clear the accumulated hot-zone state for a
    /// symbol. Returns false if the symbol had none.
    pub async fn reset_hot_zone(&self, symbol: &str) -> bool {
        let slot = { self.symbols.read().await.get(symbol).cloned() };
        match slot {
            Some(slot) => slot.lock().await.hot_zones.reset(symbol),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BookLevel;

    fn depth() -> OrderBookDepth {
        OrderBookDepth {
            bids: vec![BookLevel { price: 99.0, quantity: 6.0 }],
            asks: vec![BookLevel { price: 101.0, quantity: 5.0 }],
        }
    }

    #[tokio::test]
    async fn first_oi_cycle_classifies_against_itself() {
        let engine = SignalEngine::new(SignalEngineConfig::default());
        // With a single reading, peak == trough == current, so the
        // near-peak rule fires immediately (matching the original
        // collector's first-cycle behavior)
        let record = engine
            .evaluate_open_interest("BTCUSDT", 1_000.0, 1_000)
            .await
            .unwrap();
        assert_eq!(record.side, Side::Short);
        assert_eq!(record.payload["signal"], "close-longs");
        assert!(record.payload["oi_change_pct"].is_null());
    }

    #[tokio::test]
    async fn midrange_oi_produces_a_sideless_record() {
        let engine = SignalEngine::new(SignalEngineConfig::default());
        engine
            .evaluate_open_interest("BTCUSDT", 100.0, 1_000)
            .await
            .unwrap();
        engine
            .evaluate_open_interest("BTCUSDT", 1_000.0, 2_000)
            .await
            .unwrap();

        // 500 sits between 5% of the trough and 95% of the peak
        let record = engine
            .evaluate_open_interest("BTCUSDT", 500.0, 3_000)
            .await
            .unwrap();
        assert_eq!(record.side, Side::None);
        assert!(record.payload["signal"].is_null());
        assert_eq!(record.payload["peak_oi"], 1_000.0);
        assert_eq!(record.payload["bottom_oi"], 100.0);
    }

    #[tokio::test]
    async fn oi_change_is_computed_against_previous_reading() {
        let engine = SignalEngine::new(SignalEngineConfig::default());
        engine
            .evaluate_open_interest("BTCUSDT", 200.0, 1_000)
            .await
            .unwrap();
        let record = engine
            .evaluate_open_interest("BTCUSDT", 220.0, 2_000)
            .await
            .unwrap();
        assert_eq!(record.payload["oi_change_pct"], 10.0);
    }

    #[tokio::test]
    async fn stale_oi_reading_is_rejected_and_skips_the_cycle() {
        let engine = SignalEngine::new(SignalEngineConfig::default());
        engine
            .evaluate_open_interest("BTCUSDT", 100.0, 2_000)
            .await
            .unwrap();

        let err = engine
            .evaluate_open_interest("BTCUSDT", 110.0, 1_000)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn hot_zone_pipeline_accumulates_and_classifies() {
        let engine = SignalEngine::new(SignalEngineConfig::default());

        // Level sits 5 below the trade price: intensity 11 * 5 = 55
        let wide = OrderBookDepth {
            bids: vec![BookLevel { price: 95.0, quantity: 6.0 }],
            asks: vec![BookLevel { price: 101.0, quantity: 5.0 }],
        };
        let first = engine
            .evaluate_hot_zone("BTCUSDT", 100.0, &wide, 1_000)
            .await
            .unwrap();
        // Initialization cycle: zero bias classifies short
        assert_eq!(first.side, Side::Short);

        // Level 0.5 below the trade price: intensity 11 * 0.5 = 5.5,
        // so the first zone stays the hottest
        let tight = OrderBookDepth {
            bids: vec![BookLevel { price: 89.5, quantity: 6.0 }],
            asks: vec![BookLevel { price: 101.0, quantity: 5.0 }],
        };
        let record = engine
            .evaluate_hot_zone("BTCUSDT", 90.0, &tight, 2_000)
            .await
            .unwrap();

        // bias = 100 - 90 = +10 → long → BUY at the hottest zone
        assert_eq!(record.side, Side::Long);
        assert_eq!(record.payload["alt_action"], "BUY");
        assert_eq!(record.payload["direction_bias"], 10.0);
        assert_eq!(record.payload["target_price"], 100.0);
        // The 90-priced zone fell below the 100 anchor
        assert_eq!(record.payload["high_sum"], 0.0);
        assert_eq!(record.payload["low_sum"], 5.5);
    }

    #[tokio::test]
    async fn malformed_depth_aborts_the_hot_zone_cycle() {
        let engine = SignalEngine::new(SignalEngineConfig::default());
        let err = engine
            .evaluate_hot_zone("BTCUSDT", 100.0, &OrderBookDepth::default(), 1_000)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        // Nothing was recorded for the failed cycle
        assert!(engine.recent_observations("BTCUSDT", 0).await.is_empty());
    }

    #[tokio::test]
    async fn lunar_bootstrap_then_signal() {
        let config = SignalEngineConfig {
            // 1000ms cycle anchored at 0 keeps phases easy to pick
            clock: CycleClock::new(0, 1_000.0),
            ..Default::default()
        };
        let engine = SignalEngine::new(config);

        let record = engine.evaluate_lunar("BTCUSDT", 50_000.0, 200).await.unwrap();
        assert_eq!(record.side, Side::None);

        // Still in the new-moon half, price dropped → sell
        let record = engine.evaluate_lunar("BTCUSDT", 48_000.0, 1_300).await.unwrap();
        assert_eq!(record.side, Side::Short);
        assert_eq!(record.payload["signal"], "sell");
        assert_eq!(record.payload["new_moon"], true);
    }

    #[tokio::test]
    async fn symbols_evaluate_concurrently() {
        let engine = Arc::new(SignalEngine::new(SignalEngineConfig::default()));

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.evaluate_open_interest("BTCUSDT", 100.0, 1_000).await
            })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.evaluate_open_interest("ETHUSDT", 200.0, 1_000).await
            })
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());

        let snapshot = engine.hot_zone_snapshot().await;
        assert!(snapshot.is_empty()); // no hot-zone evaluations ran
    }

    #[tokio::test]
    async fn reset_hot_zone_is_explicit() {
        let engine = SignalEngine::new(SignalEngineConfig::default());
        engine
            .evaluate_hot_zone("BTCUSDT", 100.0, &depth(), 1_000)
            .await
            .unwrap();
        assert_eq!(engine.hot_zone_snapshot().await.len(), 1);

        assert!(engine.reset_hot_zone("BTCUSDT").await);
        assert!(engine.hot_zone_snapshot().await.is_empty());
    }
}
