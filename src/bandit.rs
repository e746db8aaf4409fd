//! Multi-armed bandit strategies for random choice
//!
//! A strategy is initialized with `n` arms. [`Strategy::select`] picks an
//! arm according to the strategy and [`Strategy::update`] feeds back the
//! reward observed for that arm, so the strategy learns which arm pays best.

use crate::error::{AppError, Result};
use crate::utils::argmax;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

/// Reinforcement learning strategy over a fixed number of arms.
pub trait Strategy {
    /// Reset the strategy with `n_arms` choices
    fn init(&mut self, n_arms: usize);

    /// Index of the selected arm, `None` when there are no arms
    fn select(&mut self) -> Option<usize>;

    /// Record `reward` for `arm`
    fn update(&mut self, arm: usize, reward: f64) -> Result<()>;

    /// Number of times each arm was updated
    fn counts(&self) -> &[u64];

    /// Mean reward of each arm
    fn values(&self) -> &[f64];

    /// JSON representation for reporting
    fn serialize(&self) -> Value;
}

/// Frequencies and mean rewards shared by every strategy
#[derive(Debug, Clone, Default)]
struct Arms {
    counts: Vec<u64>,
    values: Vec<f64>,
}

impl Arms {
    fn new(n_arms: usize) -> Self {
        Self {
            counts: vec![0; n_arms],
            values: vec![0.0; n_arms],
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<()> {
        if arm >= self.len() {
            return Err(AppError::validation(format!(
                "arm {} out of range for bandit with {} arms",
                arm,
                self.len()
            )));
        }

        self.counts[arm] += 1;
        let n = self.counts[arm] as f64;
        let value = self.values[arm];
        self.values[arm] = ((n - 1.0) / n) * value + reward / n;
        Ok(())
    }

    fn trials(&self) -> u64 {
        1 + self.counts.iter().sum::<u64>()
    }

    /// Exploit the best arm unless a draw falls under `epsilon`
    fn choose(&self, rng: &mut StdRng, epsilon: f64) -> Option<usize> {
        if self.len() == 0 {
            return None;
        }
        if rng.gen::<f64>() > epsilon {
            return argmax(&self.values);
        }
        Some(rng.gen_range(0..self.len()))
    }
}

fn entropy() -> StdRng {
    StdRng::from_entropy()
}

//===========================================================================
// Epsilon greedy
//===========================================================================

/// Selects a uniformly random arm with probability `epsilon` and the arm
/// with the best mean reward otherwise.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    /// Probability of exploring instead of exploiting
    pub epsilon: f64,
    arms: Arms,
    rng: StdRng,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            arms: Arms::default(),
            rng: entropy(),
        }
    }

    /// Deterministic selections for reproducible runs
    pub fn with_seed(epsilon: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(epsilon)
        }
    }
}

impl Strategy for EpsilonGreedy {
    fn init(&mut self, n_arms: usize) {
        self.arms = Arms::new(n_arms);
    }

    fn select(&mut self) -> Option<usize> {
        self.arms.choose(&mut self.rng, self.epsilon)
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<()> {
        self.arms.update(arm, reward)
    }

    fn counts(&self) -> &[u64] {
        &self.arms.counts
    }

    fn values(&self) -> &[f64] {
        &self.arms.values
    }

    fn serialize(&self) -> Value {
        json!({
            "strategy": "epsilon greedy",
            "epsilon": self.epsilon,
            "counts": self.arms.counts,
            "values": self.arms.values,
        })
    }
}

//===========================================================================
// Annealing epsilon greedy
//===========================================================================

/// Epsilon greedy where epsilon shrinks on a log scale as trials accumulate,
/// exploring early and exploiting later.
#[derive(Debug, Clone)]
pub struct AnnealingEpsilonGreedy {
    arms: Arms,
    rng: StdRng,
}

impl Default for AnnealingEpsilonGreedy {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnealingEpsilonGreedy {
    pub fn new() -> Self {
        Self {
            arms: Arms::default(),
            rng: entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            arms: Arms::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `1 / ln(t + 1e-7)` where `t` is one plus the total number of trials
    pub fn epsilon(&self) -> f64 {
        1.0 / (self.arms.trials() as f64 + 0.000_000_1).ln()
    }
}

impl Strategy for AnnealingEpsilonGreedy {
    fn init(&mut self, n_arms: usize) {
        self.arms = Arms::new(n_arms);
    }

    fn select(&mut self) -> Option<usize> {
        let epsilon = self.epsilon();
        self.arms.choose(&mut self.rng, epsilon)
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<()> {
        self.arms.update(arm, reward)
    }

    fn counts(&self) -> &[u64] {
        &self.arms.counts
    }

    fn values(&self) -> &[f64] {
        &self.arms.values
    }

    fn serialize(&self) -> Value {
        json!({
            "strategy": "annealing epsilon greedy",
            "epsilon": self.epsilon(),
            "counts": self.arms.counts,
            "values": self.arms.values,
        })
    }
}

//===========================================================================
// Uniform
//===========================================================================

/// Every arm is equally likely on each selection; rewards are tracked but
/// never consulted.
#[derive(Debug, Clone)]
pub struct Uniform {
    arms: Arms,
    rng: StdRng,
}

impl Default for Uniform {
    fn default() -> Self {
        Self::new()
    }
}

impl Uniform {
    pub fn new() -> Self {
        Self {
            arms: Arms::default(),
            rng: entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            arms: Arms::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Strategy for Uniform {
    fn init(&mut self, n_arms: usize) {
        self.arms = Arms::new(n_arms);
    }

    fn select(&mut self) -> Option<usize> {
        // Always explore
        self.arms.choose(&mut self.rng, f64::INFINITY)
    }

    fn update(&mut self, arm: usize, reward: f64) -> Result<()> {
        self.arms.update(arm, reward)
    }

    fn counts(&self) -> &[u64] {
        &self.arms.counts
    }

    fn values(&self) -> &[f64] {
        &self.arms.values
    }

    fn serialize(&self) -> Value {
        json!({
            "strategy": "uniform selection",
            "counts": self.arms.counts,
            "values": self.arms.values,
        })
    }
}
