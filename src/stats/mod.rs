//! Online computation of summary statistics
//!
//! Samples arrive in real time and the shape of the distribution (mean,
//! variance, range) is computed on demand. Rather than keeping every value,
//! only the aggregates are tracked: the sample count, the sum, the sum of
//! squares, and the extremes.
//!
//! Both [`Statistics`] (floats) and [`Benchmark`] (durations) are guarded by
//! a read/write lock and can be shared between threads. For high rate
//! producers, [`StatisticsWorker`] and [`BenchmarkWorker`] feed a single
//! background aggregator through a bounded channel.

pub mod benchmark;
pub mod worker;

pub use benchmark::{Benchmark, BenchmarkState};
pub use worker::{Aggregator, BenchmarkWorker, StatisticsWorker, Worker};

use crate::error::{ErrorContext, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Raw aggregates behind [`Statistics`]; this is what gets dumped to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsState {
    pub samples: u64,
    pub total: f64,
    pub squares: f64,
    pub maximum: f64,
    pub minimum: f64,
}

impl StatisticsState {
    fn add(&mut self, sample: f64) {
        self.samples += 1;
        self.total += sample;
        self.squares += sample * sample;

        // The first sample is both the maximum and the minimum
        if self.samples == 1 {
            self.maximum = sample;
            self.minimum = sample;
        } else {
            if sample > self.maximum {
                self.maximum = sample;
            }
            if sample < self.minimum {
                self.minimum = sample;
            }
        }
    }

    fn mean(&self) -> f64 {
        if self.samples > 0 {
            self.total / self.samples as f64
        } else {
            0.0
        }
    }

    fn variance(&self) -> f64 {
        if self.samples > 1 {
            let n = self.samples as f64;
            (n * self.squares - self.total * self.total) / (n * (n - 1.0))
        } else {
            0.0
        }
    }

    /// Parallel merge: extremes only come from sides that saw samples
    fn merge(&mut self, other: &StatisticsState) {
        if other.samples > 0 {
            if self.samples == 0 || other.maximum > self.maximum {
                self.maximum = other.maximum;
            }
            if self.samples == 0 || other.minimum < self.minimum {
                self.minimum = other.minimum;
            }
        }
        self.samples += other.samples;
        self.total += other.total;
        self.squares += other.squares;
    }
}

/// Thread-safe online descriptive statistics over `f64` samples.
#[derive(Debug, Default)]
pub struct Statistics {
    state: RwLock<StatisticsState>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StatisticsState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of the current aggregates
    pub fn state(&self) -> StatisticsState {
        *self.state.read()
    }

    /// Record one or more samples
    pub fn update(&self, samples: &[f64]) {
        let mut state = self.state.write();
        for &sample in samples {
            state.add(sample);
        }
    }

    /// Number of samples seen
    pub fn n(&self) -> u64 {
        self.state.read().samples
    }

    pub fn total(&self) -> f64 {
        self.state.read().total
    }

    /// Average of the samples, 0 when nothing was recorded
    pub fn mean(&self) -> f64 {
        self.state.read().mean()
    }

    /// Sample variance, 0 with fewer than two samples
    pub fn variance(&self) -> f64 {
        self.state.read().variance()
    }

    pub fn stddev(&self) -> f64 {
        let state = self.state.read();
        if state.samples > 1 {
            state.variance().sqrt()
        } else {
            0.0
        }
    }

    pub fn maximum(&self) -> f64 {
        self.state.read().maximum
    }

    pub fn minimum(&self) -> f64 {
        self.state.read().minimum
    }

    pub fn range(&self) -> f64 {
        let state = self.state.read();
        state.maximum - state.minimum
    }

    /// Summary map suitable for reporting or JSON output
    pub fn serialize(&self) -> BTreeMap<String, f64> {
        let state = self.state();
        let stddev = if state.samples > 1 { state.variance().sqrt() } else { 0.0 };

        let mut data = BTreeMap::new();
        data.insert("samples".to_string(), state.samples as f64);
        data.insert("total".to_string(), state.total);
        data.insert("mean".to_string(), state.mean());
        data.insert("stddev".to_string(), stddev);
        data.insert("variance".to_string(), state.variance());
        data.insert("minimum".to_string(), state.minimum);
        data.insert("maximum".to_string(), state.maximum);
        data.insert("range".to_string(), state.maximum - state.minimum);
        data
    }

    /// Merge another set of statistics into this one, e.g. from a parallel run
    pub fn append(&self, other: &Statistics) {
        // Snapshot first so appending to itself cannot deadlock
        let other = other.state();
        self.state.write().merge(&other);
    }

    /// Write the aggregates to `path` as JSON
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        dump_json(path.as_ref(), &self.state())
    }

    /// Read aggregates previously written with [`Statistics::dump`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_state(load_json(path.as_ref())?))
    }
}

impl Clone for Statistics {
    fn clone(&self) -> Self {
        Self::from_state(self.state())
    }
}

pub(crate) fn dump_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(value)?;
    fs::write(path, data).with_context(|| format!("could not write {}", path.display()))
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    Ok(serde_json::from_str(&data)?)
}


#[cfg(test)]
mod comprehensive_tests;
