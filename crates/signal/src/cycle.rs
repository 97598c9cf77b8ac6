use common::{Error, Result};

/// Reference new-moon instant: 2021-01-13T05:00:00Z.
pub const LUNAR_REFERENCE_EPOCH_MS: i64 = 1_610_514_000_000;

/// Mean synodic month in milliseconds.
pub const LUNAR_CYCLE_MS: f64 = 2_551_442_876.8992;

/// Phase of a fixed-length cycle in `[0, 1)`, measured from a reference
/// epoch. Total and deterministic for any `now_ms`, including instants
/// before the reference epoch.
pub fn phase(now_ms: i64, reference_epoch_ms: i64, cycle_duration_ms: f64) -> Result<f64> {
    if !(cycle_duration_ms > 0.0) || !cycle_duration_ms.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "cycle duration must be positive and finite, got {cycle_duration_ms}"
        )));
    }
    let elapsed = (now_ms - reference_epoch_ms) as f64;
    let phase = elapsed.rem_euclid(cycle_duration_ms) / cycle_duration_ms;
    // rem_euclid can round a just-below-zero remainder up to a full
    // cycle; keep the interval half-open
    Ok(if phase >= 1.0 { 0.0 } else { phase })
}

/// A fixed-period clock used to gate periodic comparisons.
#[derive(Debug, Clone, Copy)]
pub struct CycleClock {
    pub reference_epoch_ms: i64,
    pub cycle_duration_ms: f64,
}

impl CycleClock {
    pub fn new(reference_epoch_ms: i64, cycle_duration_ms: f64) -> Self {
        Self {
            reference_epoch_ms,
            cycle_duration_ms,
        }
    }

    /// The lunar clock used by the moon-phase strategy.
    pub fn lunar() -> Self {
        Self::new(LUNAR_REFERENCE_EPOCH_MS, LUNAR_CYCLE_MS)
    }

    pub fn phase(&self, now_ms: i64) -> Result<f64> {
        phase(now_ms, self.reference_epoch_ms, self.cycle_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_at_one_and_a_half_cycles_is_half() {
        let reference = 1_000_000;
        let cycle = 2_000.0;
        let now = reference + (cycle * 1.5) as i64;
        assert_eq!(phase(now, reference, cycle).unwrap(), 0.5);
    }

    #[test]
    fn phase_at_reference_is_zero() {
        assert_eq!(phase(1_000, 1_000, 500.0).unwrap(), 0.0);
    }

    #[test]
    fn phase_stays_in_unit_interval_before_the_reference() {
        let p = phase(0, 1_000_000, 3_000.0).unwrap();
        assert!((0.0..1.0).contains(&p));
    }

    #[test]
    fn non_positive_cycle_is_invalid() {
        assert!(matches!(
            phase(0, 0, 0.0).unwrap_err(),
            Error::InvalidArgument(_)
        ));
        assert!(matches!(
            phase(0, 0, -5.0).unwrap_err(),
            Error::InvalidArgument(_)
        ));
    }

    #[test]
    fn lunar_clock_wraps_a_full_cycle() {
        let clock = CycleClock::lunar();
        let p0 = clock.phase(LUNAR_REFERENCE_EPOCH_MS).unwrap();
        let p1 = clock
            .phase(LUNAR_REFERENCE_EPOCH_MS + LUNAR_CYCLE_MS as i64 + 1)
            .unwrap();
        assert!(p0 < 1e-9);
        assert!(p1 < 0.01);
    }
}
