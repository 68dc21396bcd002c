//! Outlier-Cleaning Passes
//!
//! A cleaning pass pairs a detector with an acceptance gate and an audit
//! label. Passes run in configured order over the *current* state of an
//! aggregated file: a later pass sees the values a prior pass retained,
//! and its outlier indices are relative to that retained list.
//!
//! Gates are the safety mechanism. A detection that does not clear its
//! pass's gate is a no-op for that metric; the values, statistics, and
//! audit trail are left untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use ragbench_report::{AggregatedResult, CleaningPassRecord, MetricStatistics, AGGREGATED_FILE_NAME};
use ragbench_stats::{
    Detector, OutlierReport, SampleStatistics, AGGRESSIVE_IQR_MULTIPLIER,
    CONSERVATIVE_IQR_MULTIPLIER, MIN_RETAINED_SAMPLES,
};

use crate::config::CleaningConfig;
use crate::loader::load_json;

/// Name of the tree-level cleaning report file
pub const CLEANING_REPORT_FILE_NAME: &str = "outlier_cleaning_report.json";

/// One configured cleaning pass: a detector plus its acceptance gate.
#[derive(Debug, Clone)]
pub struct CleaningPass {
    /// Audit-trail key in `outlier_cleaning` (e.g. `conservative_pass`)
    pub name: String,
    /// Detection method label (e.g. `iqr_3x`)
    pub method: String,
    /// The detection policy
    pub detector: Detector,
    /// Only metrics whose current CV exceeds this are examined
    pub eligibility_min_cv: Option<f64>,
    /// Gate: required CV improvement in percentage points (strict)
    pub min_cv_improvement_pp: Option<f64>,
    /// Gate alternative: accept when the cleaned CV falls below this
    pub max_final_cv: Option<f64>,
}

impl CleaningPass {
    /// The standard conservative first pass: wide IQR fences, meaningful
    /// CV improvement required.
    pub fn conservative(min_cv_improvement_pp: f64) -> Self {
        Self {
            name: "conservative_pass".to_string(),
            method: "iqr_3x".to_string(),
            detector: Detector::Iqr {
                multiplier: CONSERVATIVE_IQR_MULTIPLIER,
            },
            eligibility_min_cv: None,
            min_cv_improvement_pp: Some(min_cv_improvement_pp),
            max_final_cv: None,
        }
    }

    /// Cold-start pass for metrics still noisy after conservative
    /// cleaning. The detector gates itself on ratio and improvement.
    pub fn cold_start(eligibility_min_cv: f64) -> Self {
        Self {
            name: "cold_start_pass".to_string(),
            method: "cold_start_detection".to_string(),
            detector: Detector::ColdStart,
            eligibility_min_cv: Some(eligibility_min_cv),
            min_cv_improvement_pp: None,
            max_final_cv: None,
        }
    }

    /// Aggressive last-resort pass: tight fences, accepted on either a
    /// modest improvement or an acceptable final CV.
    pub fn aggressive(
        eligibility_min_cv: f64,
        min_cv_improvement_pp: f64,
        max_final_cv: f64,
    ) -> Self {
        Self {
            name: "aggressive_pass".to_string(),
            method: "iqr_2x".to_string(),
            detector: Detector::Iqr {
                multiplier: AGGRESSIVE_IQR_MULTIPLIER,
            },
            eligibility_min_cv: Some(eligibility_min_cv),
            min_cv_improvement_pp: Some(min_cv_improvement_pp),
            max_final_cv: Some(max_final_cv),
        }
    }

    /// Modified Z-score pass. The detector self-gates on sample size.
    pub fn mad(threshold: f64) -> Self {
        Self {
            name: "mad_pass".to_string(),
            method: "modified_zscore".to_string(),
            detector: Detector::ModifiedZScore { threshold },
            eligibility_min_cv: None,
            min_cv_improvement_pp: None,
            max_final_cv: None,
        }
    }

    /// Whether a metric's current statistics make it eligible for this
    /// pass at all.
    pub fn is_eligible(&self, current_cv_percent: f64) -> bool {
        self.eligibility_min_cv
            .map_or(true, |min_cv| current_cv_percent > min_cv)
    }

    /// Acceptance gate over a detection's before/after statistics.
    pub fn accepts(&self, report: &OutlierReport) -> bool {
        if report.after.n < MIN_RETAINED_SAMPLES {
            return false;
        }
        let improvement_ok = self
            .min_cv_improvement_pp
            .map_or(true, |min_pp| report.cv_improvement() > min_pp);
        let final_cv_ok = self
            .max_final_cv
            .is_some_and(|max_cv| report.after.cv_percent < max_cv);
        improvement_ok || final_cv_ok
    }
}

/// Build the configured pass pipeline, in order.
pub fn passes_from_config(config: &CleaningConfig) -> anyhow::Result<Vec<CleaningPass>> {
    config
        .passes
        .iter()
        .map(|name| match name.as_str() {
            "conservative" => Ok(CleaningPass::conservative(
                config.conservative_min_cv_improvement,
            )),
            "cold_start" => Ok(CleaningPass::cold_start(config.high_cv_threshold)),
            "aggressive" => Ok(CleaningPass::aggressive(
                config.high_cv_threshold,
                config.aggressive_min_cv_improvement,
                config.aggressive_max_final_cv,
            )),
            "mad" => Ok(CleaningPass::mad(config.mad_threshold)),
            other => Err(anyhow::anyhow!("Unknown cleaning pass: {}", other)),
        })
        .collect()
}

/// Compact statistics snapshot for the cleaning report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatSnapshot {
    /// Arithmetic mean
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Coefficient of variation in percent
    pub cv_percent: f64,
    /// Sample count
    pub n: usize,
}

impl From<&SampleStatistics> for StatSnapshot {
    fn from(stats: &SampleStatistics) -> Self {
        Self {
            mean: stats.mean,
            std: stats.std,
            cv_percent: stats.cv_percent,
            n: stats.n,
        }
    }
}

/// What one pass did to one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricCleaning {
    /// Flagged indices, relative to the values the pass saw
    pub outlier_indices: Vec<usize>,
    /// The removed values
    pub outlier_values: Vec<f64>,
    /// Detection interval, when the method has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(f64, f64)>,
    /// Statistics before removal
    pub before: StatSnapshot,
    /// Statistics after removal
    pub after: StatSnapshot,
    /// CV reduction in percentage points
    pub cv_improvement: f64,
}

/// What one pass did to one aggregated file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassOutcome {
    /// Per-metric cleaning details, for metrics that were cleaned
    pub metrics_cleaned: BTreeMap<String, MetricCleaning>,
    /// Total data points removed by this pass
    pub outliers_removed: usize,
}

impl PassOutcome {
    /// Whether this pass changed anything
    pub fn cleaned_anything(&self) -> bool {
        !self.metrics_cleaned.is_empty()
    }
}

/// Apply one cleaning pass to an aggregated result, in place.
///
/// On acceptance the metric's statistics entry is replaced with the
/// recomputed statistics over the retained values, and the pass stamps
/// its audit record. Rejected detections leave the metric untouched.
pub fn apply_pass(aggregated: &mut AggregatedResult, pass: &CleaningPass) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    let metric_names: Vec<String> = aggregated.statistics.keys().cloned().collect();
    for name in metric_names {
        let current = &aggregated.statistics[&name];
        if current.values.is_empty() {
            continue;
        }
        if !pass.is_eligible(current.cv_percent) {
            continue;
        }

        let report = pass.detector.analyze(&current.values);
        if !report.has_outliers() {
            continue;
        }
        if !pass.accepts(&report) {
            debug!(
                "{}: {} detection rejected by gate ({:.1}pp improvement, {} retained)",
                name,
                pass.name,
                report.cv_improvement(),
                report.after.n
            );
            continue;
        }

        let outlier_values = report.outlier_values(&current.values);
        outcome.outliers_removed += report.outlier_indices.len();
        outcome.metrics_cleaned.insert(
            name.clone(),
            MetricCleaning {
                outlier_indices: report.outlier_indices.iter().copied().collect(),
                outlier_values,
                bounds: report.bounds,
                before: StatSnapshot::from(&report.before),
                after: StatSnapshot::from(&report.after),
                cv_improvement: report.cv_improvement(),
            },
        );

        aggregated.statistics.insert(
            name,
            MetricStatistics::from_stats(&report.after, report.retained),
        );
    }

    if outcome.cleaned_anything() {
        aggregated.outlier_cleaning.insert(
            pass.name.clone(),
            CleaningPassRecord {
                cleaned_at: Utc::now(),
                method: pass.method.clone(),
                metrics_cleaned: outcome.metrics_cleaned.keys().cloned().collect(),
                total_outliers_detected: outcome.outliers_removed,
            },
        );
    }

    outcome
}

/// Apply a pass pipeline in order. Each pass sees the previous pass's
/// output.
pub fn apply_passes(
    aggregated: &mut AggregatedResult,
    passes: &[CleaningPass],
) -> BTreeMap<String, PassOutcome> {
    let mut outcomes = BTreeMap::new();
    for pass in passes {
        let outcome = apply_pass(aggregated, pass);
        if outcome.cleaned_anything() {
            outcomes.insert(pass.name.clone(), outcome);
        }
    }
    outcomes
}

/// Cleaning report for one aggregated file.
#[derive(Debug, Clone, Serialize)]
pub struct FileCleanReport {
    /// The file that was cleaned
    pub file: String,
    /// Per-pass outcomes, for passes that changed something
    pub passes: BTreeMap<String, PassOutcome>,
    /// Total data points removed across all passes
    pub outliers_removed: usize,
}

/// Tree-level cleaning report, written next to the corpus directories.
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    /// When the cleaning run happened
    pub cleaned_at: DateTime<Utc>,
    /// Pass names in application order
    pub passes: Vec<String>,
    /// Per-file reports, for files that changed
    pub files: Vec<FileCleanReport>,
    /// Total data points removed across the tree
    pub total_outliers_removed: usize,
}

fn find_aggregated_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name().and_then(|n| n.to_str()) == Some(AGGREGATED_FILE_NAME) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Clean every `aggregated_results.json` under a results tree, rewriting
/// files in place, and write the tree-level cleaning report.
pub fn clean_tree(results_dir: &Path, passes: &[CleaningPass]) -> anyhow::Result<CleanReport> {
    let mut report = CleanReport {
        cleaned_at: Utc::now(),
        passes: passes.iter().map(|p| p.name.clone()).collect(),
        files: Vec::new(),
        total_outliers_removed: 0,
    };

    for path in find_aggregated_files(results_dir)? {
        let value = match load_json(&path) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let mut aggregated: AggregatedResult = match serde_json::from_value(value) {
            Ok(aggregated) => aggregated,
            Err(e) => {
                warn!("Skipping {}: not an aggregated results file: {}", path.display(), e);
                continue;
            }
        };

        let outcomes = apply_passes(&mut aggregated, passes);
        if outcomes.is_empty() {
            info!("{}: no outliers", path.display());
            continue;
        }

        let removed: usize = outcomes.values().map(|o| o.outliers_removed).sum();
        // Keep disk and report consistent: an unwritable file stays
        // uncleaned and drops out of the report
        if let Err(e) = aggregated
            .to_json_pretty()
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&path, json))
        {
            warn!("Skipping {}: cannot rewrite: {}", path.display(), e);
            continue;
        }
        info!("{}: removed {} outlier point(s)", path.display(), removed);

        report.total_outliers_removed += removed;
        report.files.push(FileCleanReport {
            file: path.display().to_string(),
            passes: outcomes,
            outliers_removed: removed,
        });
    }

    let report_path = results_dir.join(CLEANING_REPORT_FILE_NAME);
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;

    Ok(report)
}
