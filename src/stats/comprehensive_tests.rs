//! Comprehensive tests for online statistics
//!
//! Property-based tests comparing the streaming aggregates against direct
//! computation over the retained samples.

use super::{Benchmark, Statistics};
use proptest::collection::vec;
use proptest::prelude::*;
use std::time::Duration;

/// Property-based test generators
mod generators {
    use super::*;

    pub fn samples() -> impl Strategy<Value = Vec<f64>> {
        vec(-1000.0f64..1000.0, 1..500)
    }

    pub fn durations() -> impl Strategy<Value = Vec<Duration>> {
        vec((0u64..5_000_000).prop_map(Duration::from_nanos), 1..300)
    }
}

fn direct_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0)
}

fn close(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= 1e-6 * scale
}

/// Test mathematical properties of the streaming aggregates
mod property_tests {
    use super::*;

    proptest! {
        /// Mean should always be between min and max
        #[test]
        fn mean_between_min_max(values in generators::samples()) {
            let s = Statistics::new();
            s.update(&values);
            prop_assert!(s.mean() >= s.minimum() - 1e-9);
            prop_assert!(s.mean() <= s.maximum() + 1e-9);
        }

        /// Streaming variance matches the two-pass computation
        #[test]
        fn variance_matches_direct(values in generators::samples()) {
            let s = Statistics::new();
            s.update(&values);
            prop_assert!(close(s.variance(), direct_variance(&values)));
        }

        /// Splitting the samples and appending gives the same aggregate
        #[test]
        fn append_equals_single_pass(values in generators::samples(), split in 0usize..500) {
            let split = split.min(values.len());
            let whole = Statistics::new();
            whole.update(&values);

            let left = Statistics::new();
            let right = Statistics::new();
            left.update(&values[..split]);
            right.update(&values[split..]);
            left.append(&right);

            prop_assert_eq!(left.n(), whole.n());
            prop_assert_eq!(left.maximum(), whole.maximum());
            prop_assert_eq!(left.minimum(), whole.minimum());
            prop_assert!(close(left.mean(), whole.mean()));
            prop_assert!(close(left.variance(), whole.variance()));
        }

        /// Timeouts and samples partition the updates
        #[test]
        fn benchmark_counts_partition(durations in generators::durations()) {
            let b = Benchmark::new();
            b.update(&durations);

            let zeros = durations.iter().filter(|d| d.is_zero()).count() as u64;
            prop_assert_eq!(b.timeouts(), zeros);
            prop_assert_eq!(b.n() + b.timeouts(), durations.len() as u64);
            prop_assert!(b.fastest() <= b.slowest());
            if b.n() > 0 {
                prop_assert!(b.mean() >= b.fastest());
                prop_assert!(b.mean() <= b.slowest());
            }
        }

        /// Range is never negative
        #[test]
        fn range_non_negative(values in generators::samples()) {
            let s = Statistics::new();
            s.update(&values);
            prop_assert!(s.range() >= 0.0);
            prop_assert!(s.stddev() >= 0.0);
        }
    }
}

/// Edge cases for extreme inputs
mod edge_case_tests {
    use super::*;

    #[test]
    fn identical_samples_have_zero_spread() {
        let s = Statistics::new();
        s.update(&[7.25; 64]);
        assert!(s.variance().abs() < 1e-9);
        assert_eq!(s.range(), 0.0);
    }

    #[test]
    fn concurrent_updates_are_all_recorded() {
        let s = std::sync::Arc::new(Statistics::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let s = std::sync::Arc::clone(&s);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        s.update(&[(t * 500 + i) as f64]);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(s.n(), 4000);
        assert_eq!(s.minimum(), 0.0);
        assert_eq!(s.maximum(), 3999.0);
        assert_eq!(s.total(), (0..4000).sum::<i32>() as f64);
    }
}
