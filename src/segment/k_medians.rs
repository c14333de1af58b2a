use log::debug;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::error::{Error, Result};
use crate::segment::stats;

/// Relative tolerance when comparing medoids between iterations.
const MEDOID_RTOL: f64 = 1e-5;
/// Absolute tolerance when comparing medoids between iterations.
const MEDOID_ATOL: f64 = 1e-8;

/// Configuration options for k-medians clustering.
#[derive(Debug, Clone)]
pub struct KMediansConfig {
    /// Number of clusters to find.
    pub k: usize,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Seed for the medoid initialization.
    pub seed: u64,
}

impl KMediansConfig {
    /// Create a new config with default values for max_iterations (100) and seed (100).
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 100,
            seed: 100,
        }
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
}

/// Result of a single k-medians run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMediansFit {
    /// Cluster index in `[0, k)` for every input point.
    pub labels: Vec<usize>,
    /// One medoid per cluster. Empty for the degenerate `n < k` case.
    pub medoids: Vec<Vec<f64>>,
    /// Sum of L1 distances from each point to its assigned medoid.
    pub cost: f64,
    /// Number of completed assignment/update rounds.
    pub iterations: usize,
    /// Whether the medoids stopped moving before `max_iterations`.
    pub converged: bool,
}

impl KMediansFit {
    fn degenerate(n: usize) -> Self {
        Self {
            labels: vec![0; n],
            medoids: Vec::new(),
            cost: 0.0,
            iterations: 0,
            converged: false,
        }
    }
}

/// Partitions `data` into `config.k` groups minimizing the total L1 distance
/// to each group's component-wise median.
///
/// The generator is reseeded from `config.seed` on every call, so identical
/// input and configuration always produce the identical fit. When the dataset
/// holds fewer than `k` points, all labels are 0, no medoids are returned and
/// the cost is 0.
///
/// # Errors
///
/// - `InvalidParameter` if `k` or `max_iterations` is 0.
/// - `DimensionMismatch` if the points do not all share one dimensionality.
///
/// # Example
///
/// ```
/// use reward_tiers::segment::{kmedians, KMediansConfig};
///
/// let data = vec![
///     vec![1.0, 2.0],
///     vec![1.5, 1.8],
///     vec![5.0, 8.0],
///     vec![8.0, 8.0],
/// ];
///
/// let fit = kmedians(&data, &KMediansConfig::new(2)).unwrap();
/// assert_eq!(fit.labels.len(), 4);
/// assert_eq!(fit.medoids.len(), 2);
/// ```
pub fn kmedians(data: &[Vec<f64>], config: &KMediansConfig) -> Result<KMediansFit> {
    let k = config.k;
    if k == 0 {
        return Err(Error::InvalidParameter {
            name: "k",
            message: "must be at least 1",
        });
    }
    if config.max_iterations == 0 {
        return Err(Error::InvalidParameter {
            name: "max_iterations",
            message: "must be at least 1",
        });
    }

    let n = data.len();
    if n < k {
        debug!("k-medians: {} points < k = {}, returning trivial fit", n, k);
        return Ok(KMediansFit::degenerate(n));
    }

    let dim = data[0].len();
    if let Some(bad) = data.iter().find(|p| p.len() != dim) {
        return Err(Error::DimensionMismatch {
            expected: dim,
            found: bad.len(),
        });
    }

    // Initialize medoids by sampling k distinct points
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    let mut medoids: Vec<Vec<f64>> = index::sample(&mut rng, n, k)
        .into_iter()
        .map(|i| data[i].clone())
        .collect();

    let mut labels = vec![0_usize; n];
    let mut cost = 0.0;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        // 1. Assignment step. Strict `<` keeps the lowest index on ties.
        cost = 0.0;
        for (i, point) in data.iter().enumerate() {
            let mut best_cluster = 0;
            let mut best_dist = l1_distance(point, &medoids[0]);
            for (cluster_idx, medoid) in medoids.iter().enumerate().skip(1) {
                let dist = l1_distance(point, medoid);
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = cluster_idx;
                }
            }
            labels[i] = best_cluster;
            cost += best_dist;
        }

        // 2. Update step: component-wise median of each cluster's members
        let mut members: Vec<Vec<&[f64]>> = vec![Vec::new(); k];
        for (point, &label) in data.iter().zip(labels.iter()) {
            members[label].push(point.as_slice());
        }

        let new_medoids: Vec<Vec<f64>> = members
            .iter()
            .zip(medoids.iter())
            .map(|(points, previous)| {
                if points.is_empty() {
                    // an empty cluster keeps its medoid
                    previous.clone()
                } else {
                    componentwise_median(points, dim)
                }
            })
            .collect();

        if medoids_close(&new_medoids, &medoids) {
            converged = true;
            break;
        }
        medoids = new_medoids;
    }

    debug!(
        "k-medians k={} finished after {} iterations (converged: {}), cost={:.6}",
        k, iterations, converged, cost
    );

    Ok(KMediansFit {
        labels,
        medoids,
        cost,
        iterations,
        converged,
    })
}

/// Manhattan distance between two points of the same dimension.
pub fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&x, &y)| acc + (x - y).abs())
}

fn componentwise_median(points: &[&[f64]], dim: usize) -> Vec<f64> {
    let mut column = Vec::with_capacity(points.len());
    (0..dim)
        .map(|d| {
            column.clear();
            column.extend(points.iter().map(|p| p[d]));
            stats::median(&column)
        })
        .collect()
}

fn medoids_close(new: &[Vec<f64>], old: &[Vec<f64>]) -> bool {
    new.iter().zip(old.iter()).all(|(a, b)| {
        a.iter()
            .zip(b.iter())
            .all(|(&x, &y)| (x - y).abs() <= MEDOID_ATOL + MEDOID_RTOL * y.abs())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 1.0],
            vec![1.2, 1.0],
            vec![0.9, 1.1],
            vec![9.0, 1.0],
            vec![9.1, 1.2],
            vec![8.7, 0.9],
        ]
    }

    #[test]
    fn test_zero_k_rejected() {
        let data = two_blobs();
        let result = kmedians(&data, &KMediansConfig::new(0));
        assert!(matches!(result, Err(Error::InvalidParameter { name: "k", .. })));
    }

    #[test]
    fn test_empty_data_is_trivial() {
        let data: Vec<Vec<f64>> = vec![];
        for k in 1..4 {
            let fit = kmedians(&data, &KMediansConfig::new(k)).unwrap();
            assert!(fit.labels.is_empty());
            assert!(fit.medoids.is_empty());
            assert_eq!(fit.cost, 0.0);
        }
    }

    #[test]
    fn test_fewer_points_than_k() {
        let data = vec![vec![1.0, 2.0], vec![2.0, 3.0]];
        let fit = kmedians(&data, &KMediansConfig::new(5)).unwrap();
        assert_eq!(fit.labels, vec![0, 0]);
        assert!(fit.medoids.is_empty());
        assert_eq!(fit.cost, 0.0);
    }

    #[test]
    fn test_ragged_input_rejected() {
        let data = vec![vec![1.0, 2.0], vec![2.0]];
        let result = kmedians(&data, &KMediansConfig::new(1));
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_single_cluster_is_median() {
        let data = vec![vec![1.0, 10.0], vec![2.0, 30.0], vec![7.0, 20.0]];
        let fit = kmedians(&data, &KMediansConfig::new(1)).unwrap();
        assert_eq!(fit.labels, vec![0, 0, 0]);
        assert_eq!(fit.medoids, vec![vec![2.0, 20.0]]);
        // |1-2|+|10-20| + |2-2|+|30-20| + |7-2|+|20-20|
        assert_relative_eq!(fit.cost, 26.0);
        assert!(fit.converged);
    }

    #[test]
    fn test_separates_two_blobs() {
        let data = two_blobs();
        let fit = kmedians(&data, &KMediansConfig::new(2)).unwrap();
        assert_eq!(fit.labels.len(), data.len());
        assert_eq!(fit.medoids.len(), 2);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[1], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_eq!(fit.labels[4], fit.labels[5]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.converged);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let data = two_blobs();
        let config = KMediansConfig::new(3).with_seed(7);
        let first = kmedians(&data, &config).unwrap();
        let second = kmedians(&data, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cost_matches_labels_and_medoids() {
        let data = two_blobs();
        let fit = kmedians(&data, &KMediansConfig::new(2)).unwrap();
        // On convergence the returned medoids are the ones the labels were assigned to.
        let recomputed: f64 = data
            .iter()
            .zip(fit.labels.iter())
            .map(|(p, &l)| l1_distance(p, &fit.medoids[l]))
            .sum();
        assert_relative_eq!(fit.cost, recomputed, epsilon = 1e-9);
    }

    #[test]
    fn test_identical_points_tie_to_lowest_index() {
        // Every medoid coincides, so every point must land in cluster 0.
        let data = vec![vec![3.0, 3.0]; 4];
        let fit = kmedians(&data, &KMediansConfig::new(3)).unwrap();
        assert!(fit.labels.iter().all(|&l| l == 0));
        assert_eq!(fit.medoids.len(), 3);
        assert_eq!(fit.cost, 0.0);
    }

    #[test]
    fn test_iteration_cap_respected() {
        let data = two_blobs();
        let fit = kmedians(&data, &KMediansConfig::new(2).with_max_iterations(1)).unwrap();
        assert_eq!(fit.iterations, 1);
        assert!(fit.labels.iter().all(|&l| l < 2));
    }

    #[test]
    fn test_l1_distance() {
        assert_relative_eq!(l1_distance(&[1.0, -2.0], &[4.0, 2.0]), 7.0);
    }
}
