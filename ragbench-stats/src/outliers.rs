//! Outlier Detection
//!
//! Three interchangeable policies over a replicate sample. Indices are
//! always relative to the input slice as given; when a cleaning pass has
//! already removed points, a later pass sees (and indexes into) the
//! retained list, not the original.
//!
//! Detectors never fail on small samples; below their minimum they
//! degrade to "no outliers found".

use std::collections::BTreeSet;

use crate::quantiles::{median, percentile};
use crate::statistics::{compute_statistics, SampleStatistics};
use crate::{COLD_START_MIN_CV_IMPROVEMENT_PP, COLD_START_RATIO, MIN_RETAINED_SAMPLES};

/// Outlier detection policy for one metric's replicate sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detector {
    /// IQR fences: outliers fall strictly outside
    /// `[q1 - multiplier*iqr, q3 + multiplier*iqr]`.
    /// Needs at least 4 samples.
    Iqr {
        /// Fence width in IQRs (3.0 conservative, 2.0 aggressive)
        multiplier: f64,
    },
    /// Modified Z-score over the median absolute deviation:
    /// `|0.6745 * (x - median) / mad| > threshold`. A zero MAD means no
    /// value can be flagged. Needs more than 3 samples, and discards the
    /// whole detection if it would retain fewer than 3.
    ModifiedZScore {
        /// Z-score cutoff (3.5 by convention)
        threshold: f64,
    },
    /// Leading-run degradation: flags the first 1-3 runs when their mean
    /// is at least 3x the mean of the remaining runs and dropping them
    /// improves CV by more than 15 percentage points. Order-sensitive by
    /// design; only meaningful on raw run-sequence order. Needs at least
    /// 5 samples.
    ColdStart,
}

/// Raw output of a detector: which indices were flagged, and the bounds
/// used when the policy is interval-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Flagged indices into the input sample
    pub indices: BTreeSet<usize>,
    /// Detection interval, when the policy has one (IQR)
    pub bounds: Option<(f64, f64)>,
}

impl Detection {
    fn none() -> Self {
        Self {
            indices: BTreeSet::new(),
            bounds: None,
        }
    }
}

/// A detection together with before/after statistics, ready for a
/// cleaning pass's acceptance gate.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    /// Flagged indices into the input sample
    pub outlier_indices: BTreeSet<usize>,
    /// Detection interval, when the policy has one
    pub bounds: Option<(f64, f64)>,
    /// Statistics over the full input
    pub before: SampleStatistics,
    /// Statistics over the complement of the flagged indices
    pub after: SampleStatistics,
    /// The retained values, in input order
    pub retained: Vec<f64>,
}

impl OutlierReport {
    /// CV reduction in percentage points achieved by removing the
    /// flagged values
    pub fn cv_improvement(&self) -> f64 {
        self.before.cv_percent - self.after.cv_percent
    }

    /// Whether the detector flagged anything at all
    pub fn has_outliers(&self) -> bool {
        !self.outlier_indices.is_empty()
    }

    /// The flagged values, in input order
    pub fn outlier_values(&self, values: &[f64]) -> Vec<f64> {
        self.outlier_indices
            .iter()
            .filter_map(|&i| values.get(i).copied())
            .collect()
    }
}

impl Detector {
    /// Run the detection policy over a sample.
    pub fn detect(&self, values: &[f64]) -> Detection {
        match *self {
            Detector::Iqr { multiplier } => detect_iqr(values, multiplier),
            Detector::ModifiedZScore { threshold } => detect_modified_zscore(values, threshold),
            Detector::ColdStart => detect_cold_start(values),
        }
    }

    /// Run the detection policy and compute before/after statistics.
    pub fn analyze(&self, values: &[f64]) -> OutlierReport {
        let detection = self.detect(values);
        let retained: Vec<f64> = values
            .iter()
            .enumerate()
            .filter(|(i, _)| !detection.indices.contains(i))
            .map(|(_, &v)| v)
            .collect();

        OutlierReport {
            before: compute_statistics(values),
            after: compute_statistics(&retained),
            outlier_indices: detection.indices,
            bounds: detection.bounds,
            retained,
        }
    }
}

fn detect_iqr(values: &[f64], multiplier: f64) -> Detection {
    if values.len() < 4 {
        // Too few points to estimate quartiles; fences are wide open
        return Detection {
            indices: BTreeSet::new(),
            bounds: Some((f64::NEG_INFINITY, f64::INFINITY)),
        };
    }

    let q1 = percentile(values, 25.0);
    let q3 = percentile(values, 75.0);
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    let indices = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < lower || v > upper)
        .map(|(i, _)| i)
        .collect();

    Detection {
        indices,
        bounds: Some((lower, upper)),
    }
}

fn detect_modified_zscore(values: &[f64], threshold: f64) -> Detection {
    if values.len() <= 3 {
        return Detection::none();
    }

    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|x| (x - med).abs()).collect();
    let mad = median(&deviations);

    if mad == 0.0 {
        // All cleaned values identical: every z-score is 0
        return Detection::none();
    }

    let indices: BTreeSet<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| (0.6745 * (v - med) / mad).abs() > threshold)
        .map(|(i, _)| i)
        .collect();

    if values.len() - indices.len() < MIN_RETAINED_SAMPLES {
        // Partial cleaning is worse than none; drop the whole detection
        return Detection::none();
    }

    Detection {
        indices,
        bounds: None,
    }
}

fn detect_cold_start(values: &[f64]) -> Detection {
    if values.len() < 5 {
        return Detection::none();
    }

    let cv_all = compute_statistics(values).cv_percent;

    let mut best_count = 0usize;
    let mut best_improvement = 0.0f64;

    for count in 1..=3usize {
        if values.len() - count < MIN_RETAINED_SAMPLES {
            continue;
        }

        let leading = &values[..count];
        let rest = &values[count..];
        let mean_leading = leading.iter().sum::<f64>() / count as f64;
        let mean_rest = rest.iter().sum::<f64>() / rest.len() as f64;

        if mean_leading >= COLD_START_RATIO * mean_rest {
            let improvement = cv_all - compute_statistics(rest).cv_percent;
            if improvement > best_improvement {
                best_improvement = improvement;
                best_count = count;
            }
        }
    }

    if best_improvement > COLD_START_MIN_CV_IMPROVEMENT_PP {
        Detection {
            indices: (0..best_count).collect(),
            bounds: None,
        }
    } else {
        Detection::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(detection: &Detection) -> Vec<usize> {
        detection.indices.iter().copied().collect()
    }

    #[test]
    fn test_iqr_flags_extreme_value() {
        let values = vec![1.0, 2.0, 2.0, 3.0, 100.0];
        let detection = Detector::Iqr { multiplier: 3.0 }.detect(&values);
        assert_eq!(indices(&detection), vec![4]);
    }

    #[test]
    fn test_iqr_tighter_fence_never_flags_fewer() {
        let values = vec![1.0, 2.0, 2.0, 3.0, 100.0];
        let conservative = Detector::Iqr { multiplier: 3.0 }.detect(&values);
        let aggressive = Detector::Iqr { multiplier: 2.0 }.detect(&values);
        assert!(conservative.indices.is_subset(&aggressive.indices));
        assert_eq!(indices(&aggressive), vec![4]);
    }

    #[test]
    fn test_iqr_small_sample_degrades() {
        let values = vec![50.0, 52.0, 900.0];
        let detection = Detector::Iqr { multiplier: 3.0 }.detect(&values);
        assert!(detection.indices.is_empty());
        assert_eq!(detection.bounds, Some((f64::NEG_INFINITY, f64::INFINITY)));
    }

    #[test]
    fn test_iqr_no_outliers_in_tight_sample() {
        let values = vec![10.0, 10.5, 11.0, 10.2, 10.8];
        let detection = Detector::Iqr { multiplier: 3.0 }.detect(&values);
        assert!(detection.indices.is_empty());
    }

    #[test]
    fn test_mad_constant_sample_flags_nothing() {
        let values = vec![5.0, 5.0, 5.0, 5.0, 5.0];
        let detection = Detector::ModifiedZScore { threshold: 3.5 }.detect(&values);
        assert!(detection.indices.is_empty());

        // Even with an absurdly low threshold: mad = 0 means z = 0 everywhere
        let detection = Detector::ModifiedZScore { threshold: 0.01 }.detect(&values);
        assert!(detection.indices.is_empty());
    }

    #[test]
    fn test_mad_flags_extreme_value() {
        let values = vec![10.0, 11.0, 12.0, 11.5, 1000.0];
        let detection = Detector::ModifiedZScore { threshold: 3.5 }.detect(&values);
        assert_eq!(indices(&detection), vec![4]);
    }

    #[test]
    fn test_mad_small_sample_degrades() {
        let values = vec![1.0, 2.0, 1000.0];
        let detection = Detector::ModifiedZScore { threshold: 3.5 }.detect(&values);
        assert!(detection.indices.is_empty());
    }

    #[test]
    fn test_mad_discards_detection_that_retains_too_few() {
        // With threshold 1.0 both 0 and 1000 exceed the cutoff, which
        // would retain only 2 of 4 values; the whole detection is dropped.
        let values = vec![0.0, 10.0, 10.4, 1000.0];
        let detection = Detector::ModifiedZScore { threshold: 1.0 }.detect(&values);
        assert!(detection.indices.is_empty());
    }

    #[test]
    fn test_cold_start_flags_leading_runs() {
        let values = vec![30.0, 28.0, 9.0, 8.0, 9.0, 10.0];
        let detection = Detector::ColdStart.detect(&values);
        assert_eq!(indices(&detection), vec![0, 1]);
    }

    #[test]
    fn test_cold_start_is_order_sensitive() {
        // Same multiset with the slow runs at the end: no leading-run
        // pattern, nothing flagged.
        let values = vec![9.0, 8.0, 9.0, 10.0, 30.0, 28.0];
        let detection = Detector::ColdStart.detect(&values);
        assert!(detection.indices.is_empty());
    }

    #[test]
    fn test_cold_start_ten_run_scenario() {
        let values = vec![300.0, 280.0, 95.0, 94.0, 96.0, 93.0, 95.0, 97.0, 94.0, 96.0];
        let report = Detector::ColdStart.analyze(&values);
        assert_eq!(
            report.outlier_indices.iter().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(report.after.n, 8);
        assert!((report.after.mean - 95.0).abs() < 1e-9);
        assert!(report.cv_improvement() > 15.0);
    }

    #[test]
    fn test_cold_start_small_sample_degrades() {
        let values = vec![300.0, 95.0, 94.0, 96.0];
        let detection = Detector::ColdStart.detect(&values);
        assert!(detection.indices.is_empty());
    }

    #[test]
    fn test_cold_start_weak_improvement_rejected() {
        // First run is 3x the rest, but the rest are so noisy that the CV
        // barely moves; the 15pp gate rejects the candidate.
        let values = vec![300.0, 40.0, 180.0, 60.0, 120.0, 90.0];
        let report = Detector::ColdStart.analyze(&values);
        if report.has_outliers() {
            assert!(report.cv_improvement() > 15.0);
        }
    }

    #[test]
    fn test_analyze_before_after() {
        let values = vec![1.0, 2.0, 2.0, 3.0, 100.0];
        let report = Detector::Iqr { multiplier: 3.0 }.analyze(&values);
        assert_eq!(report.before.n, 5);
        assert_eq!(report.after.n, 4);
        assert!((report.after.mean - 2.0).abs() < 1e-12);
        assert_eq!(report.retained, vec![1.0, 2.0, 2.0, 3.0]);
        assert_eq!(report.outlier_values(&values), vec![100.0]);
        assert!(report.cv_improvement() > 0.0);
    }
}
