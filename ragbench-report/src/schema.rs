//! Aggregated-Results Schema

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ragbench_stats::{compute_statistics, SampleStatistics};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One corpus's aggregated replicate results, as persisted to
/// `aggregated_results.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Number of replicate runs that contributed
    pub n_runs: usize,
    /// The raw run records, untouched, in run order
    pub individual_runs: Vec<Value>,
    /// Per-metric summary statistics with the contributing values
    pub statistics: BTreeMap<String, MetricStatistics>,
    /// A result-shaped record with key scalars replaced by their means,
    /// so downstream consumers of single-run files keep working
    pub mean_result: Value,
    /// Cleaning-pass audit trail, keyed by pass name. Passes append;
    /// a prior pass's record is never overwritten.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outlier_cleaning: BTreeMap<String, CleaningPassRecord>,
}

impl AggregatedResult {
    /// Serialize to prettified JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Summary statistics for one metric across replicate runs.
///
/// Carries the raw values so later cleaning passes can re-detect and
/// recompute without the original run files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Smallest contributing value
    pub min: f64,
    /// Largest contributing value
    pub max: f64,
    /// Coefficient of variation in percent
    pub cv_percent: f64,
    /// Number of runs that reported this metric
    pub n: usize,
    /// Contributing values in run order
    pub values: Vec<f64>,
}

impl MetricStatistics {
    /// Compute statistics over a set of contributing values.
    pub fn from_values(values: Vec<f64>) -> Self {
        let stats = compute_statistics(&values);
        Self::from_stats(&stats, values)
    }

    /// Pair precomputed statistics with their values.
    pub fn from_stats(stats: &SampleStatistics, values: Vec<f64>) -> Self {
        Self {
            mean: stats.mean,
            std: stats.std,
            min: stats.min,
            max: stats.max,
            cv_percent: stats.cv_percent,
            n: stats.n,
            values,
        }
    }
}

/// Audit record for one completed cleaning pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleaningPassRecord {
    /// When the pass ran
    pub cleaned_at: DateTime<Utc>,
    /// Detection method label (e.g. `iqr_3x`, `cold_start_detection`)
    pub method: String,
    /// Metrics whose statistics were replaced
    pub metrics_cleaned: Vec<String>,
    /// Total data points removed across those metrics
    pub total_outliers_detected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_aggregated() -> AggregatedResult {
        let mut statistics = BTreeMap::new();
        statistics.insert(
            "ingestion_time".to_string(),
            MetricStatistics::from_values(vec![10.0, 11.0, 12.0]),
        );
        AggregatedResult {
            n_runs: 3,
            individual_runs: vec![json!({"ingestion": {"total_time_sec": 10.0}}); 3],
            statistics,
            mean_result: json!({"ingestion": {"total_time_sec": 11.0}}),
            outlier_cleaning: BTreeMap::new(),
        }
    }

    #[test]
    fn test_metric_statistics_from_values() {
        let stats = MetricStatistics::from_values(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.std - 2.0).abs() < 1e-12);
        assert_eq!(stats.n, 8);
        assert_eq!(stats.values.len(), 8);
    }

    #[test]
    fn test_empty_cleaning_map_is_omitted() {
        let json = sample_aggregated().to_json_pretty().unwrap();
        assert!(!json.contains("outlier_cleaning"));
    }

    #[test]
    fn test_cleaning_records_round_trip() {
        let mut agg = sample_aggregated();
        agg.outlier_cleaning.insert(
            "conservative_pass".to_string(),
            CleaningPassRecord {
                cleaned_at: Utc::now(),
                method: "iqr_3x".to_string(),
                metrics_cleaned: vec!["ingestion_time".to_string()],
                total_outliers_detected: 1,
            },
        );

        let json = agg.to_json_pretty().unwrap();
        assert!(json.contains("conservative_pass"));
        assert!(json.contains("iqr_3x"));

        let back: AggregatedResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_runs, 3);
        assert_eq!(back.outlier_cleaning.len(), 1);
        assert_eq!(back.outlier_cleaning["conservative_pass"].method, "iqr_3x");
    }

    #[test]
    fn test_deserialize_without_cleaning_field() {
        // Files written before any cleaning pass lack the field entirely
        let json = sample_aggregated().to_json_pretty().unwrap();
        let back: AggregatedResult = serde_json::from_str(&json).unwrap();
        assert!(back.outlier_cleaning.is_empty());
    }
}
