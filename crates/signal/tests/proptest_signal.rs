use proptest::prelude::*;

use common::{LiquidationZone, Observation};
use signal::classify::{classify_direction_bias, classify_open_interest, OiThresholds};
use signal::cycle;
use signal::hotzone::HotZoneAccumulator;
use signal::store::{ObservationStore, RetentionPolicy};

proptest! {
    /// Phase is total for any instant and cycle length, and always
    /// lands in [0, 1).
    #[test]
    fn phase_stays_in_unit_interval(
        now_ms in i64::MIN / 4..i64::MAX / 4,
        reference_ms in i64::MIN / 4..i64::MAX / 4,
        cycle_ms in 1.0f64..1e15,
    ) {
        let p = cycle::phase(now_ms, reference_ms, cycle_ms).unwrap();
        prop_assert!((0.0..1.0).contains(&p));
    }

    /// Non-decreasing timestamp sequences are always accepted and read
    /// back in insertion order.
    #[test]
    fn store_preserves_insertion_order(
        deltas in proptest::collection::vec(0i64..10_000, 1..50),
        values in proptest::collection::vec(-1e9f64..1e9, 50),
    ) {
        let mut store = ObservationStore::new(RetentionPolicy {
            max_age_ms: i64::MAX / 2,
            max_count: 1_000,
        });

        let mut ts = 0i64;
        let mut expected = Vec::new();
        for (delta, value) in deltas.iter().zip(values.iter()) {
            ts += delta;
            store.record(Observation::new("SYM", *value, ts)).unwrap();
            expected.push((*value, ts));
        }

        let got: Vec<(f64, i64)> = store
            .range_since("SYM", 0)
            .iter()
            .map(|o| (o.value, o.timestamp_ms))
            .collect();
        prop_assert_eq!(got, expected);
    }

    /// A timestamp strictly before the last recorded one is always
    /// rejected and leaves the series untouched.
    #[test]
    fn store_rejects_regressions(last in 1i64..1_000_000, regression in 1i64..1_000) {
        let mut store = ObservationStore::new(RetentionPolicy::default());
        store.record(Observation::new("SYM", 1.0, last)).unwrap();

        let result = store.record(Observation::new("SYM", 2.0, last - regression));
        prop_assert!(result.is_err());
        prop_assert_eq!(store.len("SYM"), 1);
    }

    /// The OI cascade never panics and always lands on one of its four
    /// outcomes, for arbitrary (including degenerate) float inputs.
    #[test]
    fn oi_cascade_is_total(
        current in proptest::num::f64::ANY,
        peak in proptest::num::f64::ANY,
        bottom in proptest::num::f64::ANY,
    ) {
        let outcome = classify_open_interest(current, peak, bottom, &OiThresholds::default());
        if let Some(signal) = outcome {
            prop_assert!(
                ["close-longs", "open-longs", "rekt-warning"].contains(&signal.label)
            );
        }
    }

    /// Pure classifiers are idempotent.
    #[test]
    fn classifiers_are_idempotent(bias in -1e12f64..1e12, current in 0.0f64..1e12) {
        prop_assert_eq!(classify_direction_bias(bias), classify_direction_bias(bias));
        let th = OiThresholds::default();
        prop_assert_eq!(
            classify_open_interest(current, 100.0, 10.0, &th),
            classify_open_interest(current, 100.0, 10.0, &th)
        );
    }

    /// Every finite intensity after the initialization zone lands in
    /// exactly one of the two sums: the accumulator conserves the total.
    #[test]
    fn hot_zone_sums_conserve_intensity(
        zones in proptest::collection::vec((1.0f64..1e6, 0.0f64..1e6), 2..40),
    ) {
        let mut acc = HotZoneAccumulator::new();
        for (price, intensity) in &zones {
            acc.ingest("SYM", LiquidationZone { price: *price, intensity: *intensity });
        }

        let state = acc.state_for("SYM").unwrap();
        let expected: f64 = zones[1..].iter().map(|(_, i)| i).sum();
        let total = state.high_sum + state.low_sum;
        prop_assert!((total - expected).abs() <= expected.abs() * 1e-9 + 1e-9);

        // The hottest zone is the max-intensity zone of the whole run
        let max_intensity = zones
            .iter()
            .map(|(_, i)| *i)
            .fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(acc.hot_zone_for("SYM").unwrap().intensity, max_intensity);
    }
}
