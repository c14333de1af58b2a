use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::segment::stats;

/// Mapping from raw cluster index to a 1-based tier, ordered by the mean of
/// a metric: tier 1 has the lowest mean.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRanking {
    /// `(raw_index, mean)` in tier order.
    order: Vec<(usize, f64)>,
    tiers: BTreeMap<usize, usize>,
}

impl ClusterRanking {
    /// Ranks every cluster that has at least one member. Equal means keep
    /// the raw index order.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `labels` and `metric` differ in length.
    pub fn new(labels: &[usize], metric: &[f64]) -> Result<Self> {
        if labels.len() != metric.len() {
            return Err(Error::DimensionMismatch {
                expected: labels.len(),
                found: metric.len(),
            });
        }

        let mut groups: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        for (&label, &value) in labels.iter().zip(metric.iter()) {
            groups.entry(label).or_default().push(value);
        }

        // BTreeMap iteration is ascending by raw index, and the sort is stable.
        let mut order: Vec<(usize, f64)> = groups
            .iter()
            .map(|(&label, values)| (label, stats::mean(values)))
            .collect();
        // -0.0 and 0.0 compare equal and keep raw index order
        order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let tiers = order
            .iter()
            .enumerate()
            .map(|(rank, &(label, _))| (label, rank + 1))
            .collect();

        Ok(Self { order, tiers })
    }

    /// Tier of a raw cluster index, `None` if the cluster has no members.
    pub fn tier(&self, raw: usize) -> Option<usize> {
        self.tiers.get(&raw).copied()
    }

    /// Relabels raw indices into tiers. Membership is unchanged.
    pub fn relabel(&self, labels: &[usize]) -> Vec<usize> {
        labels
            .iter()
            .map(|&raw| self.tiers.get(&raw).copied().unwrap_or(0))
            .collect()
    }

    /// `(tier, mean)` pairs in ascending tier order.
    pub fn tier_means(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.order
            .iter()
            .enumerate()
            .map(|(rank, &(_, mean))| (rank + 1, mean))
    }

    /// Number of ranked (non-empty) clusters.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
