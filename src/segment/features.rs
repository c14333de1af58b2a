//! Per-user feature construction from weekly activity records.
//!
//! Raw cells are coerced to numbers, records are grouped by user, low-value
//! users are filtered out and each remaining user gets the feature vector
//! `[log10(avg_weekly_theo_win + 1), avg_weekly_days_played]`.

use std::collections::BTreeMap;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Opaque per-user fields carried through to the output unchanged.
pub type Metadata = BTreeMap<String, Value>;

/// A loosely typed numeric cell: a number or text such as `"1,234.50"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

/// One user's activity for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub user_id: String,
    #[serde(default)]
    pub theo_win: Option<RawValue>,
    #[serde(default)]
    pub days_played: Option<RawValue>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Aggregated activity of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub avg_weekly_theo_win: f64,
    pub avg_weekly_days_played: f64,
    pub avg_weekly_adt: f64,
    pub overall_theo_win: f64,
    pub overall_days_played: f64,
    pub overall_adt: f64,
    pub metadata: Metadata,
}

impl UserProfile {
    /// Log-scaled primary metric followed by the secondary metric.
    pub fn features(&self) -> Vec<f64> {
        vec![
            (self.avg_weekly_theo_win + 1.0).log10(),
            self.avg_weekly_days_played,
        ]
    }
}

/// Parses a theo cell. Thousands separators are stripped; missing, blank and
/// non-finite values become 0.
///
/// # Errors
///
/// `InvalidNumber` if the text is not a number.
pub fn parse_amount(cell: Option<&RawValue>) -> Result<f64> {
    match cell {
        None => Ok(0.0),
        Some(RawValue::Number(value)) => Ok(finite_or_zero(*value)),
        Some(RawValue::Text(text)) => {
            let cleaned: String = text.trim().chars().filter(|&c| c != ',').collect();
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            cleaned
                .parse::<f64>()
                .map(finite_or_zero)
                .map_err(|_| Error::InvalidNumber {
                    field: "theo_win",
                    value: text.clone(),
                })
        }
    }
}

/// Parses a days-played cell, coercing anything unparseable to 0.
pub fn parse_days(cell: Option<&RawValue>) -> f64 {
    match cell {
        None => 0.0,
        Some(RawValue::Number(value)) => finite_or_zero(*value),
        Some(RawValue::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(finite_or_zero)
            .unwrap_or(0.0),
    }
}

/// `numerator / denominator`, or 0 when the result is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    finite_or_zero(numerator / denominator)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[derive(Default)]
struct Accumulator {
    weeks: usize,
    theo_sum: f64,
    days_sum: f64,
    adt_sum: f64,
    metadata: Metadata,
}

/// Groups weekly records into user profiles and drops low-value users.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    min_avg_theo_win: f64,
}

impl FeatureBuilder {
    pub fn new(min_avg_theo_win: f64) -> Self {
        Self { min_avg_theo_win }
    }

    /// Aggregates `records` per user, ordered by user id, keeping users whose
    /// mean weekly theo is at least the configured minimum.
    pub fn build(&self, records: &[WeeklyRecord]) -> Result<Vec<UserProfile>> {
        let profiles = aggregate(records)?;
        let total = profiles.len();
        let kept: Vec<UserProfile> = profiles
            .into_iter()
            .filter(|p| p.avg_weekly_theo_win >= self.min_avg_theo_win)
            .collect();
        info!(
            "Users remaining (theo >= {}): {} of {}",
            self.min_avg_theo_win,
            kept.len(),
            total
        );
        Ok(kept)
    }
}

/// Aggregates weekly records per user without filtering.
pub fn aggregate(records: &[WeeklyRecord]) -> Result<Vec<UserProfile>> {
    let mut users: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for record in records {
        let theo = parse_amount(record.theo_win.as_ref())?;
        let days = parse_days(record.days_played.as_ref());

        let acc = users.entry(record.user_id.as_str()).or_default();
        acc.weeks += 1;
        acc.theo_sum += theo;
        acc.days_sum += days;
        acc.adt_sum += safe_ratio(theo, days);
        for (key, value) in &record.metadata {
            if value.is_null() {
                continue;
            }
            acc.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    Ok(users
        .into_iter()
        .map(|(user_id, acc)| {
            let weeks = acc.weeks as f64;
            UserProfile {
                user_id: user_id.to_string(),
                avg_weekly_theo_win: acc.theo_sum / weeks,
                avg_weekly_days_played: acc.days_sum / weeks,
                avg_weekly_adt: acc.adt_sum / weeks,
                overall_theo_win: acc.theo_sum,
                overall_days_played: acc.days_sum,
                overall_adt: safe_ratio(acc.theo_sum, acc.days_sum),
                metadata: acc.metadata,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn record(user: &str, theo: Option<RawValue>, days: Option<RawValue>) -> WeeklyRecord {
        WeeklyRecord {
            user_id: user.to_string(),
            theo_win: theo,
            days_played: days,
            metadata: Metadata::new(),
        }
    }

    fn num(value: f64) -> Option<RawValue> {
        Some(RawValue::Number(value))
    }

    fn text(value: &str) -> Option<RawValue> {
        Some(RawValue::Text(value.to_string()))
    }

    #[test]
    fn test_parse_amount() {
        assert_relative_eq!(parse_amount(text("1,234.5").as_ref()).unwrap(), 1234.5);
        assert_relative_eq!(parse_amount(num(12.0).as_ref()).unwrap(), 12.0);
        assert_relative_eq!(parse_amount(None).unwrap(), 0.0);
        assert_relative_eq!(parse_amount(text("  ").as_ref()).unwrap(), 0.0);
        assert_relative_eq!(parse_amount(text("NaN").as_ref()).unwrap(), 0.0);
        assert!(matches!(
            parse_amount(text("abc").as_ref()),
            Err(Error::InvalidNumber { field: "theo_win", .. })
        ));
    }

    #[test]
    fn test_parse_days_coerces() {
        assert_relative_eq!(parse_days(text("3").as_ref()), 3.0);
        assert_relative_eq!(parse_days(text("n/a").as_ref()), 0.0);
        assert_relative_eq!(parse_days(None), 0.0);
    }

    #[test]
    fn test_safe_ratio() {
        assert_relative_eq!(safe_ratio(10.0, 4.0), 2.5);
        assert_relative_eq!(safe_ratio(10.0, 0.0), 0.0);
        assert_relative_eq!(safe_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_aggregate_per_user() {
        let records = vec![
            record("b", num(100.0), num(4.0)),
            record("a", text("1,000"), num(2.0)),
            record("b", num(50.0), num(0.0)),
        ];
        let profiles = aggregate(&records).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].user_id, "a");
        assert_eq!(profiles[1].user_id, "b");

        let b = &profiles[1];
        assert_relative_eq!(b.avg_weekly_theo_win, 75.0);
        assert_relative_eq!(b.avg_weekly_days_played, 2.0);
        // weekly ADT: 100/4 = 25 and 50/0 -> 0
        assert_relative_eq!(b.avg_weekly_adt, 12.5);
        assert_relative_eq!(b.overall_theo_win, 150.0);
        assert_relative_eq!(b.overall_days_played, 4.0);
        assert_relative_eq!(b.overall_adt, 37.5);
    }

    #[test]
    fn test_metadata_first_non_null_wins() {
        let mut first = record("u", num(20.0), num(1.0));
        first.metadata.insert("nickname".into(), Value::Null);
        first.metadata.insert("brand_id".into(), json!(7));
        let mut second = record("u", num(20.0), num(1.0));
        second.metadata.insert("nickname".into(), json!("ace"));
        second.metadata.insert("brand_id".into(), json!(8));

        let profiles = aggregate(&[first, second]).unwrap();
        assert_eq!(profiles[0].metadata["nickname"], json!("ace"));
        assert_eq!(profiles[0].metadata["brand_id"], json!(7));
    }

    #[test]
    fn test_builder_filters_low_value_users() {
        let records = vec![
            record("low", num(9.0), num(1.0)),
            record("edge", num(10.0), num(1.0)),
            record("high", num(500.0), num(5.0)),
        ];
        let profiles = FeatureBuilder::new(10.0).build(&records).unwrap();
        let ids: Vec<&str> = profiles.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "high"]);
    }

    #[test]
    fn test_features_are_log_scaled() {
        let profiles = aggregate(&[record("u", num(99.0), num(3.0))]).unwrap();
        let features = profiles[0].features();
        assert_relative_eq!(features[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(features[1], 3.0);
    }

    #[test]
    fn test_record_from_json() {
        let raw = r#"{"user_id": "42", "theo_win": "2,500", "days_played": 3,
                      "metadata": {"site_id": 1}}"#;
        let record: WeeklyRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.theo_win, text("2,500"));
        assert_eq!(record.days_played, num(3.0));
        assert_eq!(record.metadata["site_id"], json!(1));

        let bare: WeeklyRecord = serde_json::from_str(r#"{"user_id": "7"}"#).unwrap();
        assert_eq!(bare.theo_win, None);
        assert!(bare.metadata.is_empty());
    }
}
