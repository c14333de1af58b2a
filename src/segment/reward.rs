use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Percentage-and-round-up reward rule: `unit * ceil(mean * rate / unit)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardRule {
    /// Fraction of the mean paid out.
    pub rate: f64,
    /// Rounding unit; every amount is a multiple of it.
    pub unit: u64,
}

impl Default for RewardRule {
    fn default() -> Self {
        Self {
            rate: 0.10,
            unit: 10,
        }
    }
}

impl RewardRule {
    pub fn new(rate: f64, unit: u64) -> Self {
        Self { rate, unit }
    }

    /// Reward for a cluster with the given mean. Never negative; a zero (or
    /// negative) mean pays nothing. Saturates at the largest multiple of
    /// `unit` that fits in a `u64`.
    pub fn amount(&self, mean: f64) -> u64 {
        if self.unit == 0 {
            return 0;
        }
        let unit = self.unit as f64;
        let multiples = (mean * self.rate / unit).ceil();
        if multiples > 0.0 {
            // `as` saturates for huge and infinite values
            (multiples as u64).min(u64::MAX / self.unit) * self.unit
        } else {
            0
        }
    }
}

/// Reward per 1-based tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardMap(BTreeMap<usize, u64>);

impl RewardMap {
    /// Applies `rule` to each `(tier, mean)` pair.
    pub fn from_means<I>(rule: &RewardRule, tier_means: I) -> Self
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        Self(
            tier_means
                .into_iter()
                .map(|(tier, mean)| (tier, rule.amount(mean)))
                .collect(),
        )
    }

    pub fn get(&self, tier: usize) -> Option<u64> {
        self.0.get(&tier).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.0.iter().map(|(&tier, &amount)| (tier, amount))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
