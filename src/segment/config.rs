use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for tier segmentation.
///
/// Missing fields fall back to [`SegmentationConfig::default`] when loaded
/// from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Largest cluster count tried by the elbow search.
    pub max_k: usize,
    /// Maximum number of iterations per k-medians run.
    pub max_iterations: usize,
    /// Seed for medoid initialization. Every run is reseeded with it.
    pub seed: u64,
    /// Users whose mean weekly theo falls below this are left out.
    pub min_avg_theo_win: f64,
    /// Fraction of the cluster mean paid out as reward.
    pub reward_rate: f64,
    /// Rewards are rounded up to a multiple of this.
    pub reward_unit: u64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_k: 15,
            max_iterations: 100,
            seed: 100,
            min_avg_theo_win: 10.0,
            reward_rate: 0.10,
            reward_unit: 10,
        }
    }
}

impl SegmentationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Customize the largest candidate cluster count.
    pub fn with_max_k(mut self, max_k: usize) -> Self {
        self.max_k = max_k;
        self
    }

    /// Customize the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Customize the initialization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Customize the minimum mean weekly theo a user needs to be kept.
    pub fn with_min_avg_theo_win(mut self, min_avg_theo_win: f64) -> Self {
        self.min_avg_theo_win = min_avg_theo_win;
        self
    }

    /// Customize the reward rule: `unit * ceil(mean * rate / unit)`.
    pub fn with_reward(mut self, rate: f64, unit: u64) -> Self {
        self.reward_rate = rate;
        self.reward_unit = unit;
        self
    }

    /// Checks every field before any clustering is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.max_k == 0 {
            return Err(Error::InvalidParameter {
                name: "max_k",
                message: "must be at least 1",
            });
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }
        if !self.min_avg_theo_win.is_finite() {
            return Err(Error::InvalidParameter {
                name: "min_avg_theo_win",
                message: "must be finite",
            });
        }
        if !self.reward_rate.is_finite() || self.reward_rate < 0.0 {
            return Err(Error::InvalidParameter {
                name: "reward_rate",
                message: "must be finite and non-negative",
            });
        }
        if self.reward_unit == 0 {
            return Err(Error::InvalidParameter {
                name: "reward_unit",
                message: "must be at least 1",
            });
        }
        Ok(())
    }
}
