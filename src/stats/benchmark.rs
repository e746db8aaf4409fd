//! Online statistics over durations
//!
//! [`Benchmark`] works like [`Statistics`](super::Statistics) but on
//! `Duration` samples, and reports fastest/slowest instead of min/max. A zero
//! duration is a timeout: it is counted separately and is not a sample.

use super::{dump_json, load_json};
use crate::error::Result;
use crate::utils::duration::{format_duration, format_nanos};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const NANOS_PER_SEC_SQUARED: f64 = 1e18;

/// Raw aggregates behind [`Benchmark`].
///
/// Sums are kept in nanoseconds as `u128` so that long runs cannot overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkState {
    pub timeouts: u64,
    pub samples: u64,
    pub total: u128,
    pub squares: u128,
    pub slowest: Duration,
    pub fastest: Duration,
}

impl BenchmarkState {
    fn add(&mut self, duration: Duration) {
        if duration.is_zero() {
            self.timeouts += 1;
            return;
        }

        let nanos = duration.as_nanos();
        self.samples += 1;
        self.total = self.total.saturating_add(nanos);
        self.squares = self.squares.saturating_add(nanos.saturating_mul(nanos));

        if self.samples == 1 {
            self.slowest = duration;
            self.fastest = duration;
        } else {
            self.slowest = self.slowest.max(duration);
            self.fastest = self.fastest.min(duration);
        }
    }

    fn mean(&self) -> Duration {
        if self.samples > 0 {
            nanos_to_duration(self.total / self.samples as u128)
        } else {
            Duration::ZERO
        }
    }

    /// Sample variance in seconds squared
    fn variance(&self) -> f64 {
        if self.samples < 2 {
            return 0.0;
        }
        let n = self.samples as u128;
        let den = (n * (n - 1)) as f64;

        let exact = n
            .checked_mul(self.squares)
            .zip(self.total.checked_mul(self.total))
            .map(|(a, b)| a.saturating_sub(b) as f64);

        let num = match exact {
            Some(num) => num,
            None => {
                let (n, sq, t) = (n as f64, self.squares as f64, self.total as f64);
                (n * sq - t * t).max(0.0)
            }
        };
        num / den / NANOS_PER_SEC_SQUARED
    }

    fn stddev(&self) -> Duration {
        if self.samples > 1 {
            Duration::from_secs_f64(self.variance().sqrt())
        } else {
            Duration::ZERO
        }
    }

    fn throughput(&self) -> f64 {
        if self.samples > 0 && self.total > 0 {
            self.samples as f64 / (self.total as f64 / 1e9)
        } else {
            0.0
        }
    }

    fn merge(&mut self, other: &BenchmarkState) {
        if other.samples > 0 {
            if self.samples == 0 || other.slowest > self.slowest {
                self.slowest = other.slowest;
            }
            if self.samples == 0 || other.fastest < self.fastest {
                self.fastest = other.fastest;
            }
        }
        self.timeouts += other.timeouts;
        self.samples += other.samples;
        self.total = self.total.saturating_add(other.total);
        self.squares = self.squares.saturating_add(other.squares);
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = (nanos / 1_000_000_000).min(u64::MAX as u128) as u64;
    Duration::new(secs, (nanos % 1_000_000_000) as u32)
}

/// Thread-safe distribution of timings.
#[derive(Debug, Default)]
pub struct Benchmark {
    state: RwLock<BenchmarkState>,
}

impl Benchmark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: BenchmarkState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> BenchmarkState {
        *self.state.read()
    }

    /// Record one or more durations; zero durations count as timeouts
    pub fn update(&self, durations: &[Duration]) {
        let mut state = self.state.write();
        for &duration in durations {
            state.add(duration);
        }
    }

    /// Number of non-timeout samples
    pub fn n(&self) -> u64 {
        self.state.read().samples
    }

    pub fn timeouts(&self) -> u64 {
        self.state.read().timeouts
    }

    /// Sum of all durations
    pub fn total(&self) -> Duration {
        nanos_to_duration(self.state.read().total)
    }

    /// Samples per second, the inverse of the mean
    pub fn throughput(&self) -> f64 {
        self.state.read().throughput()
    }

    /// Mean duration truncated to the nanosecond
    pub fn mean(&self) -> Duration {
        self.state.read().mean()
    }

    /// Sample variance expressed in seconds squared
    pub fn variance(&self) -> f64 {
        self.state.read().variance()
    }

    pub fn stddev(&self) -> Duration {
        self.state.read().stddev()
    }

    pub fn slowest(&self) -> Duration {
        self.state.read().slowest
    }

    pub fn fastest(&self) -> Duration {
        self.state.read().fastest
    }

    pub fn range(&self) -> Duration {
        let state = self.state.read();
        state.slowest.saturating_sub(state.fastest)
    }

    /// Summary map with durations as readable strings such as `120.993689ms`.
    /// Variance is not a duration and is rendered in seconds squared, e.g. `2s²`.
    pub fn serialize(&self) -> BTreeMap<String, Value> {
        let state = self.state();

        let mut data = BTreeMap::new();
        data.insert("samples".to_string(), json!(state.samples));
        data.insert("timeouts".to_string(), json!(state.timeouts));
        data.insert("total".to_string(), json!(format_nanos(state.total)));
        data.insert("mean".to_string(), json!(format_duration(state.mean())));
        data.insert("stddev".to_string(), json!(format_duration(state.stddev())));
        data.insert("variance".to_string(), json!(format!("{}s²", state.variance())));
        data.insert("fastest".to_string(), json!(format_duration(state.fastest)));
        data.insert("slowest".to_string(), json!(format_duration(state.slowest)));
        data.insert(
            "range".to_string(),
            json!(format_duration(state.slowest.saturating_sub(state.fastest))),
        );
        data.insert("throughput".to_string(), json!(state.throughput()));
        data
    }

    /// Merge another benchmark into this one
    pub fn append(&self, other: &Benchmark) {
        let other = other.state();
        self.state.write().merge(&other);
    }

    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        dump_json(path.as_ref(), &self.state())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_state(load_json(path.as_ref())?))
    }
}

impl Clone for Benchmark {
    fn clone(&self) -> Self {
        Self::from_state(self.state())
    }
}
