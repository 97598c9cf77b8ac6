use common::{Error, Result};

use crate::store::ObservationStore;

/// Rolling extrema over a time-bounded window of an observation store.
///
/// Pure read-side computation: no state of its own, recomputed on
/// demand. The open-interest strategy uses this twice, a 1-day peak
/// window and a 90-day trough window; both are just different
/// `window_ms` arguments.
pub struct ExtremaTracker<'a> {
    store: &'a ObservationStore,
}

impl<'a> ExtremaTracker<'a> {
    pub fn new(store: &'a ObservationStore) -> Self {
        Self { store }
    }

    /// Maximum observed value within the last `window_ms` before `now_ms`.
    /// An empty window is `Error::InsufficientData`, never -inf or NaN.
    pub fn peak(&self, symbol: &str, window_ms: i64, now_ms: i64) -> Result<f64> {
        self.fold(symbol, window_ms, now_ms, f64::max)
    }

    /// Minimum observed value within the last `window_ms` before `now_ms`.
    pub fn trough(&self, symbol: &str, window_ms: i64, now_ms: i64) -> Result<f64> {
        self.fold(symbol, window_ms, now_ms, f64::min)
    }

    fn fold(
        &self,
        symbol: &str,
        window_ms: i64,
        now_ms: i64,
        pick: fn(f64, f64) -> f64,
    ) -> Result<f64> {
        let since = now_ms.saturating_sub(window_ms);
        let window = self.store.range_since(symbol, since);

        window
            .iter()
            .map(|o| o.value)
            .reduce(pick)
            .ok_or(Error::InsufficientData {
                symbol: symbol.to_string(),
                window_ms,
            })
    }
}

/// Percentage change from `old` to `new`: `(new - old) / old * 100`.
/// A zero base is `Error::DivisionByZero` rather than an infinity.
pub fn pct_change(old: f64, new: f64) -> Result<f64> {
    if old == 0.0 {
        return Err(Error::DivisionByZero);
    }
    Ok((new - old) / old * 100.0)
}
