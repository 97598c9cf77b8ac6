use std::collections::HashMap;

use serde::Serialize;

use common::Side;

/// Threshold fractions for the open-interest rule cascade.
#[derive(Debug, Clone, Copy)]
pub struct OiThresholds {
    /// Fraction of the window peak that counts as "near the peak".
    pub peak_frac: f64,
    /// Fraction of the window trough that counts as "near the bottom".
    pub bottom_frac: f64,
    /// Fraction of the window peak that triggers the blow-off warning.
    pub super_high_frac: f64,
}

impl Default for OiThresholds {
    fn default() -> Self {
        Self {
            peak_frac: 0.95,
            bottom_frac: 0.05,
            super_high_frac: 1.10,
        }
    }
}

/// Outcome of the open-interest cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OiSignal {
    pub label: &'static str,
    pub side: Side,
}

/// Classify current open interest against the rolling peak and trough.
///
/// The rules form an ordered list evaluated top to bottom where the
/// LAST matching rule wins — not mutually exclusive branches. The
/// ordering is load-bearing: a reading at 110%+ of the peak matches
/// rule 1 and rule 3, and must come out as the rekt warning.
pub fn classify_open_interest(
    current: f64,
    peak: f64,
    bottom: f64,
    thresholds: &OiThresholds,
) -> Option<OiSignal> {
    let rules = [
        (
            current >= thresholds.peak_frac * peak,
            OiSignal { label: "close-longs", side: Side::Short },
        ),
        (
            current <= thresholds.bottom_frac * bottom,
            OiSignal { label: "open-longs", side: Side::Long },
        ),
        (
            current >= thresholds.super_high_frac * peak,
            OiSignal { label: "rekt-warning", side: Side::Short },
        ),
    ];

    let mut outcome = None;
    for (matched, signal) in rules {
        if matched {
            outcome = Some(signal);
        }
    }
    outcome
}

/// A positive bias (hot zone above the market) reads long; everything
/// else, including exactly zero, reads short.
pub fn classify_direction_bias(bias: f64) -> Side {
    if bias > 0.0 {
        Side::Long
    } else {
        Side::Short
    }
}

/// Recommended action derived from a direction bias.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeAction {
    pub side: Side,
    /// Order-style rendering of the side: long is "BUY", short "SELL".
    pub alt_action: &'static str,
    pub target_price: f64,
}

/// Map a direction bias to a trade recommendation.
///
/// The alt action always derives from the classified side, never from
/// a separate comparison; the mapping is pinned by a test below.
pub fn trade_action(bias: f64, target_price: f64) -> TradeAction {
    let side = classify_direction_bias(bias);
    let alt_action = match side {
        Side::Long => "BUY",
        _ => "SELL",
    };
    TradeAction {
        side,
        alt_action,
        target_price,
    }
}

// ─── Lunar cycle signal ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LunarSignal {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Default)]
struct LunarRefs {
    last_new_moon_price: Option<f64>,
    last_full_moon_price: Option<f64>,
}

/// One lunar evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LunarOutcome {
    pub phase: f64,
    pub new_moon: bool,
    pub full_moon: bool,
    pub signal: Option<LunarSignal>,
}

/// Tracks per-symbol reference prices across lunar windows.
///
/// A phase below 0.5 is the new-moon window, above 0.5 the full-moon
/// window; exactly 0.5 is neither (a deliberate dead zone). The first
/// sighting of a symbol seeds both references with the current price
/// and emits nothing.
#[derive(Debug, Default)]
pub struct LunarTracker {
    refs: HashMap<String, LunarRefs>,
}

impl LunarTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, symbol: &str, phase: f64, current_price: f64) -> LunarOutcome {
        let new_moon = phase < 0.5;
        let full_moon = phase > 0.5;

        let refs = self.refs.entry(symbol.to_string()).or_default();
        if refs.last_new_moon_price.is_none() && refs.last_full_moon_price.is_none() {
            refs.last_new_moon_price = Some(current_price);
            refs.last_full_moon_price = Some(current_price);
            return LunarOutcome {
                phase,
                new_moon,
                full_moon,
                signal: None,
            };
        }

        // Both branches are evaluated independently; the windows are
        // disjoint so at most one fires per call.
        let mut signal = None;
        if new_moon {
            if let Some(reference) = refs.last_new_moon_price {
                if current_price < reference {
                    signal = Some(LunarSignal::Sell);
                    refs.last_new_moon_price = Some(current_price);
                }
            }
        }
        if full_moon {
            if let Some(reference) = refs.last_full_moon_price {
                if current_price > reference {
                    signal = Some(LunarSignal::Buy);
                    refs.last_full_moon_price = Some(current_price);
                }
            }
        }

        LunarOutcome {
            phase,
            new_moon,
            full_moon,
            signal,
        }
    }
}
