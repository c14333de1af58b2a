//! Behavioral tier segmentation.
//!
//! Weekly activity records are aggregated into one feature vector per user,
//! partitioned with k-medians at a cluster count chosen by the elbow of the
//! cost curve, ranked into tiers by mean value and given a tier reward.

pub mod error;
pub mod segment;

pub use error::{Error, Result};
pub use segment::{
    FeatureBuilder, SegmentationConfig, Segmentation, Segmenter, UserProfile, WeeklyRecord,
};
