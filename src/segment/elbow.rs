//! Cluster-count selection with the elbow heuristic.
//!
//! k-medians is run for every k in `1..=max_k` and the converged costs form a
//! curve. The chosen k is the point farthest (perpendicular distance) from the
//! straight line through the curve's first and last points.

use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::segment::k_medians::{kmedians, KMediansConfig};

/// `(k, total_cost)` pairs for k = 1..=max_k, in ascending k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    points: Vec<(usize, f64)>,
}

impl CostCurve {
    /// Builds a curve from costs listed for k = 1, 2, ...
    pub fn from_costs(costs: Vec<f64>) -> Self {
        Self {
            points: costs
                .into_iter()
                .enumerate()
                .map(|(i, cost)| (i + 1, cost))
                .collect(),
        }
    }

    /// Runs k-medians for every candidate k. Each run starts fresh from the
    /// configured seed; nothing is shared between different k.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `max_k` is 0, `EmptyInput` when `data` is empty.
    pub fn compute(
        data: &[Vec<f64>],
        max_k: usize,
        max_iterations: usize,
        seed: u64,
    ) -> Result<Self> {
        if max_k == 0 {
            return Err(Error::InvalidParameter {
                name: "max_k",
                message: "must be at least 1",
            });
        }
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }

        let run = |k: usize| -> Result<(usize, f64)> {
            let config = KMediansConfig::new(k)
                .with_max_iterations(max_iterations)
                .with_seed(seed);
            let fit = kmedians(data, &config)?;
            debug!("cost curve: k={} cost={:.6}", k, fit.cost);
            Ok((k, fit.cost))
        };

        // Both paths yield points in ascending k.
        #[cfg(feature = "parallel")]
        let points = (1..=max_k)
            .into_par_iter()
            .map(run)
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let points = (1..=max_k).map(run).collect::<Result<Vec<_>>>()?;

        Ok(Self { points })
    }

    pub fn points(&self) -> &[(usize, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Perpendicular distance of every point to the line through the first
    /// and last points. All zeros when the endpoints coincide.
    pub fn distances(&self) -> Vec<f64> {
        let (Some(&(k1, c1)), Some(&(k2, c2))) = (self.points.first(), self.points.last()) else {
            return Vec::new();
        };
        let (x1, y1) = (k1 as f64, c1);
        let (x2, y2) = (k2 as f64, c2);
        let denominator = ((y2 - y1).powi(2) + (x2 - x1).powi(2)).sqrt();
        if denominator == 0.0 {
            return vec![0.0; self.points.len()];
        }

        self.points
            .iter()
            .map(|&(k, cost)| {
                let (x0, y0) = (k as f64, cost);
                ((y2 - y1) * x0 - (x2 - x1) * y0 + x2 * y1 - y2 * x1).abs() / denominator
            })
            .collect()
    }

    /// The k at maximum distance from the endpoint line. The first k wins on
    /// ties, and a curve with no point off the line selects its first k.
    pub fn elbow(&self) -> Option<usize> {
        let first_k = self.points.first()?.0;
        let mut best_k = first_k;
        let mut max_distance = 0.0;
        for (&(k, _), distance) in self.points.iter().zip(self.distances()) {
            if distance > max_distance {
                max_distance = distance;
                best_k = k;
            }
        }
        Some(best_k)
    }
}

/// Chooses the number of clusters for `data` by the elbow of its cost curve.
///
/// Returns the chosen k (in `1..=max_k`) together with the curve it was read
/// from.
pub fn find_optimal_k(
    data: &[Vec<f64>],
    max_k: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<(usize, CostCurve)> {
    info!("Calculating optimal k (testing 1 to {} clusters)", max_k);
    let curve = CostCurve::compute(data, max_k, max_iterations, seed)?;
    // compute() guarantees max_k >= 1 points
    let best_k = curve.elbow().ok_or(Error::EmptyInput)?;
    info!("Elbow found at k={}", best_k);
    Ok((best_k, curve))
}
