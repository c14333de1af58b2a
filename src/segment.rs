pub mod config;
pub mod elbow;
pub mod features;
pub mod k_medians;
pub mod pipeline;
pub mod ranking;
pub mod reward;
pub mod stats;

// Re-export public types and functions
pub use config::SegmentationConfig;
pub use elbow::{find_optimal_k, CostCurve};
pub use features::{
    aggregate, parse_amount, parse_days, FeatureBuilder, Metadata, RawValue, UserProfile,
    WeeklyRecord,
};
pub use k_medians::{kmedians, l1_distance, KMediansConfig, KMediansFit};
pub use pipeline::{feature_matrix, ClusterSummary, Segmentation, Segmenter, UserSegment};
pub use ranking::ClusterRanking;
pub use reward::{RewardMap, RewardRule};
