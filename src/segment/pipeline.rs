use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::segment::config::SegmentationConfig;
use crate::segment::elbow::{find_optimal_k, CostCurve};
use crate::segment::features::{Metadata, UserProfile};
use crate::segment::k_medians::{kmedians, KMediansConfig};
use crate::segment::ranking::ClusterRanking;
use crate::segment::reward::{RewardMap, RewardRule};
use crate::segment::stats;

/// One user's final tier and reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSegment {
    pub user_id: String,
    /// 1-based tier, 1 being the lowest value tier.
    pub cluster: usize,
    pub reward: u64,
    pub avg_weekly_theo_win: f64,
    pub avg_weekly_days_played: f64,
    pub avg_weekly_adt: f64,
    pub overall_theo_win: f64,
    pub overall_adt: f64,
    pub overall_days_played: f64,
    pub metadata: Metadata,
}

/// Statistics of one final tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub user_count: usize,
    pub theo_win_mean: f64,
    pub theo_win_median: f64,
    pub theo_win_min: f64,
    pub theo_win_max: f64,
    pub days_played_mean: f64,
    pub days_played_median: f64,
    pub reward: u64,
}

/// Output of a full segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Cluster count used for the final run.
    pub k: usize,
    /// Present when k was chosen by the elbow search.
    pub cost_curve: Option<CostCurve>,
    pub users: Vec<UserSegment>,
    /// One entry per tier, ascending.
    pub summaries: Vec<ClusterSummary>,
    pub rewards: RewardMap,
}

/// Runs cluster-count selection, the final clustering, tier ranking and
/// reward assignment over a set of user profiles.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Segments `profiles`, picking k with the elbow heuristic.
    ///
    /// # Errors
    ///
    /// Invalid configuration or empty `profiles`, both before any clustering.
    pub fn run(&self, profiles: &[UserProfile]) -> Result<Segmentation> {
        self.config.validate()?;
        if profiles.is_empty() {
            return Err(Error::EmptyInput);
        }
        let features = feature_matrix(profiles);
        let (k, curve) = find_optimal_k(
            &features,
            self.config.max_k,
            self.config.max_iterations,
            self.config.seed,
        )?;
        let mut segmentation = self.segment(profiles, &features, k)?;
        segmentation.cost_curve = Some(curve);
        Ok(segmentation)
    }

    /// Segments `profiles` into exactly `k` raw clusters.
    pub fn run_with_k(&self, profiles: &[UserProfile], k: usize) -> Result<Segmentation> {
        self.config.validate()?;
        if profiles.is_empty() {
            return Err(Error::EmptyInput);
        }
        let features = feature_matrix(profiles);
        self.segment(profiles, &features, k)
    }

    fn segment(
        &self,
        profiles: &[UserProfile],
        features: &[Vec<f64>],
        k: usize,
    ) -> Result<Segmentation> {
        info!("Running final clustering with {} clusters", k);
        let kconfig = KMediansConfig::new(k)
            .with_max_iterations(self.config.max_iterations)
            .with_seed(self.config.seed);
        let fit = kmedians(features, &kconfig)?;

        let theo: Vec<f64> = profiles.iter().map(|p| p.avg_weekly_theo_win).collect();
        let ranking = ClusterRanking::new(&fit.labels, &theo)?;
        let tiers = ranking.relabel(&fit.labels);

        let rule = RewardRule::new(self.config.reward_rate, self.config.reward_unit);
        let rewards = RewardMap::from_means(&rule, ranking.tier_means());
        info!("Reward amounts per cluster: {:?}", rewards);

        let users = profiles
            .iter()
            .zip(tiers.iter())
            .map(|(profile, &tier)| UserSegment {
                user_id: profile.user_id.clone(),
                cluster: tier,
                reward: rewards.get(tier).unwrap_or(0),
                avg_weekly_theo_win: profile.avg_weekly_theo_win,
                avg_weekly_days_played: profile.avg_weekly_days_played,
                avg_weekly_adt: profile.avg_weekly_adt,
                overall_theo_win: profile.overall_theo_win,
                overall_adt: profile.overall_adt,
                overall_days_played: profile.overall_days_played,
                metadata: profile.metadata.clone(),
            })
            .collect::<Vec<_>>();

        let summaries = summarize(&users, ranking.len(), &rewards);

        Ok(Segmentation {
            k,
            cost_curve: None,
            users,
            summaries,
            rewards,
        })
    }
}

/// Feature vectors for `profiles`, in the same order.
pub fn feature_matrix(profiles: &[UserProfile]) -> Vec<Vec<f64>> {
    profiles.iter().map(UserProfile::features).collect()
}

fn summarize(users: &[UserSegment], tiers: usize, rewards: &RewardMap) -> Vec<ClusterSummary> {
    (1..=tiers)
        .map(|tier| {
            let (theo, days): (Vec<f64>, Vec<f64>) = users
                .iter()
                .filter(|u| u.cluster == tier)
                .map(|u| (u.avg_weekly_theo_win, u.avg_weekly_days_played))
                .unzip();
            ClusterSummary {
                cluster: tier,
                user_count: theo.len(),
                theo_win_mean: stats::mean(&theo),
                theo_win_median: stats::median(&theo),
                theo_win_min: stats::min(&theo),
                theo_win_max: stats::max(&theo),
                days_played_mean: stats::mean(&days),
                days_played_median: stats::median(&days),
                reward: rewards.get(tier).unwrap_or(0),
            }
        })
        .collect()
}
