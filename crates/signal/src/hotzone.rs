use std::collections::HashMap;

use serde::Serialize;

use common::{Error, LiquidationZone, OrderBookDepth, Result};

/// Accumulated liquidation state for one symbol.
///
/// `anchor` is the first zone ever seen for the symbol and is the fixed
/// comparison baseline for the high/low intensity sums. `hottest` is
/// the maximum-intensity zone seen so far and is the authoritative
/// target price for direction bias. The original collector conflated
/// the two; they are kept separate here and both are pinned by tests.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HotZoneState {
    pub anchor: Option<LiquidationZone>,
    pub hottest: Option<LiquidationZone>,
    pub high_sum: f64,
    pub low_sum: f64,
}

/// Per-symbol accumulator of liquidation zones.
///
/// State persists for the process lifetime; only `reset` (an explicit
/// operator action) clears a symbol.
#[derive(Debug, Default)]
pub struct HotZoneAccumulator {
    states: HashMap<String, HotZoneState>,
}

impl HotZoneAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one liquidation zone into the symbol's state.
    ///
    /// The first zone for a symbol only initializes `anchor` and
    /// `hottest` — it is not counted toward either sum. Afterwards a
    /// zone priced at or above the anchor adds to `high_sum` (ties
    /// count high, `>=` exactly), anything below adds to `low_sum`.
    /// Non-finite sums are clamped to 0 after accumulation.
    pub fn ingest(&mut self, symbol: &str, zone: LiquidationZone) {
        let state = self.states.entry(symbol.to_string()).or_default();

        let Some(anchor) = state.anchor else {
            state.anchor = Some(zone);
            state.hottest = Some(zone);
            return;
        };

        if zone.price >= anchor.price {
            state.high_sum += zone.intensity;
        } else {
            state.low_sum += zone.intensity;
        }
        if !state.high_sum.is_finite() {
            state.high_sum = 0.0;
        }
        if !state.low_sum.is_finite() {
            state.low_sum = 0.0;
        }

        match state.hottest {
            Some(h) if zone.intensity > h.intensity => state.hottest = Some(zone),
            None => state.hottest = Some(zone),
            _ => {}
        }
    }

    /// Signed distance from the hottest zone to the current price.
    /// Positive means the hot zone sits above the market. 0 when the
    /// symbol has no state yet.
    pub fn direction_bias(&self, symbol: &str, current_price: f64) -> f64 {
        self.hot_zone_for(symbol)
            .map(|z| z.price - current_price)
            .unwrap_or(0.0)
    }

    /// The maximum-intensity zone ingested so far for `symbol`.
    pub fn hot_zone_for(&self, symbol: &str) -> Option<LiquidationZone> {
        self.states.get(symbol).and_then(|s| s.hottest)
    }

    pub fn state_for(&self, symbol: &str) -> Option<&HotZoneState> {
        self.states.get(symbol)
    }

    /// Operator action: drop all accumulated state for a symbol.
    pub fn reset(&mut self, symbol: &str) -> bool {
        self.states.remove(symbol).is_some()
    }
}

/// Liquidation intensity of a trade given the current order book depth.
///
/// Volume is summed over both sides (non-finite quantities skipped);
/// the reference level is the best bid when bids outweigh asks, the
/// best ask otherwise, falling back to the trade price when that side
/// is empty. Intensity is total volume times the distance from the
/// trade price to the reference level.
pub fn book_intensity(depth: &OrderBookDepth, trade_price: f64) -> Result<f64> {
    if depth.bids.is_empty() && depth.asks.is_empty() {
        return Err(Error::InvalidArgument(
            "order book depth has no bids or asks".to_string(),
        ));
    }

    let side_volume = |levels: &[common::BookLevel]| {
        levels
            .iter()
            .map(|l| l.quantity)
            .filter(|q| q.is_finite())
            .sum::<f64>()
    };
    let bid_volume = side_volume(&depth.bids);
    let ask_volume = side_volume(&depth.asks);
    let total_volume = bid_volume + ask_volume;

    let level = if bid_volume > ask_volume {
        depth.bids.first().map(|l| l.price).unwrap_or(trade_price)
    } else {
        depth.asks.first().map(|l| l.price).unwrap_or(trade_price)
    };

    Ok(total_volume * (trade_price - level).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BookLevel;

    fn zone(price: f64, intensity: f64) -> LiquidationZone {
        LiquidationZone { price, intensity }
    }

    #[test]
    fn first_zone_initializes_without_accumulating() {
        let mut acc = HotZoneAccumulator::new();
        acc.ingest("BTCUSDT", zone(100.0, 5.0));

        let state = acc.state_for("BTCUSDT").unwrap();
        assert_eq!(state.anchor.unwrap().price, 100.0);
        assert_eq!(state.hottest.unwrap().price, 100.0);
        assert_eq!(state.high_sum, 0.0);
        assert_eq!(state.low_sum, 0.0);
    }

    #[test]
    fn sums_split_against_the_anchor() {
        let mut acc = HotZoneAccumulator::new();
        acc.ingest("BTCUSDT", zone(100.0, 5.0));
        acc.ingest("BTCUSDT", zone(110.0, 3.0));
        acc.ingest("BTCUSDT", zone(90.0, 7.0));

        let state = acc.state_for("BTCUSDT").unwrap();
        assert_eq!(state.high_sum, 3.0);
        assert_eq!(state.low_sum, 7.0);
        // The anchor stays the first-seen zone throughout
        assert_eq!(state.anchor.unwrap().price, 100.0);
    }

    #[test]
    fn equal_price_counts_as_high() {
        let mut acc = HotZoneAccumulator::new();
        acc.ingest("BTCUSDT", zone(100.0, 5.0));
        acc.ingest("BTCUSDT", zone(100.0, 2.0));

        let state = acc.state_for("BTCUSDT").unwrap();
        assert_eq!(state.high_sum, 2.0);
        assert_eq!(state.low_sum, 0.0);
    }

    #[test]
    fn hottest_tracks_max_intensity_zone() {
        let mut acc = HotZoneAccumulator::new();
        acc.ingest("BTCUSDT", zone(100.0, 5.0));
        acc.ingest("BTCUSDT", zone(110.0, 3.0));
        acc.ingest("BTCUSDT", zone(90.0, 7.0));

        assert_eq!(acc.hot_zone_for("BTCUSDT").unwrap().price, 90.0);
        assert_eq!(acc.hot_zone_for("BTCUSDT").unwrap().intensity, 7.0);
    }

    #[test]
    fn direction_bias_uses_hottest_zone() {
        let mut acc = HotZoneAccumulator::new();
        assert_eq!(acc.direction_bias("BTCUSDT", 95.0), 0.0);

        acc.ingest("BTCUSDT", zone(100.0, 5.0));
        acc.ingest("BTCUSDT", zone(90.0, 7.0));
        assert_eq!(acc.direction_bias("BTCUSDT", 95.0), -5.0);
        assert_eq!(acc.direction_bias("BTCUSDT", 80.0), 10.0);
    }

    #[test]
    fn nan_intensity_clamps_sum_to_zero() {
        let mut acc = HotZoneAccumulator::new();
        acc.ingest("BTCUSDT", zone(100.0, 5.0));
        acc.ingest("BTCUSDT", zone(110.0, 3.0));
        acc.ingest("BTCUSDT", zone(120.0, f64::NAN));

        let state = acc.state_for("BTCUSDT").unwrap();
        assert_eq!(state.high_sum, 0.0);
        // The NaN zone never becomes the hottest
        assert_eq!(acc.hot_zone_for("BTCUSDT").unwrap().intensity, 5.0);
    }

    #[test]
    fn reset_clears_a_symbol() {
        let mut acc = HotZoneAccumulator::new();
        acc.ingest("BTCUSDT", zone(100.0, 5.0));
        assert!(acc.reset("BTCUSDT"));
        assert!(acc.state_for("BTCUSDT").is_none());
        assert!(!acc.reset("BTCUSDT"));
    }

    #[test]
    fn intensity_from_depth_uses_dominant_side_level() {
        let depth = OrderBookDepth {
            bids: vec![
                BookLevel { price: 99.0, quantity: 6.0 },
                BookLevel { price: 98.0, quantity: 4.0 },
            ],
            asks: vec![BookLevel { price: 101.0, quantity: 5.0 }],
        };
        // Bid volume 10 > ask volume 5 → level = best bid 99
        let intensity = book_intensity(&depth, 100.0).unwrap();
        assert_eq!(intensity, 15.0 * 1.0);
    }

    #[test]
    fn intensity_falls_back_to_trade_price_on_empty_side() {
        let depth = OrderBookDepth {
            bids: vec![BookLevel { price: 99.0, quantity: 3.0 }],
            asks: vec![],
        };
        // Ask side empty but bid volume dominates → best bid is used
        assert_eq!(book_intensity(&depth, 100.0).unwrap(), 3.0);

        let depth = OrderBookDepth {
            bids: vec![],
            asks: vec![BookLevel { price: 101.0, quantity: 2.0 }],
        };
        // Bid volume 0 does not outweigh asks → best ask is used
        assert_eq!(book_intensity(&depth, 100.0).unwrap(), 2.0);
    }

    #[test]
    fn empty_depth_is_invalid() {
        let depth = OrderBookDepth::default();
        assert!(matches!(
            book_intensity(&depth, 100.0).unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }
}
