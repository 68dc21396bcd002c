//! Summary Statistics
//!
//! Two variants are deliberately kept distinct because their call sites
//! have different contracts:
//! - [`compute_statistics`] uses the **population** standard deviation
//!   (divide by n). All outlier-detection and cleaning work uses this so
//!   that CV figures stay comparable across cleaning passes.
//! - [`compute_statistics_with_ci`] uses the **sample** standard deviation
//!   (divide by n-1) plus a Student-t 95% confidence interval, and feeds
//!   the scaling report tables.

use crate::quantiles::student_t_quantile;

/// Summary of a replicate sample using population statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStatistics {
    /// Arithmetic mean (0 for an empty sample)
    pub mean: f64,
    /// Population standard deviation (divide by n)
    pub std: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Coefficient of variation in percent: std/mean*100, 0 when mean is 0
    pub cv_percent: f64,
    /// Number of samples
    pub n: usize,
}

impl SampleStatistics {
    /// All-zero statistics for an empty sample
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
            cv_percent: 0.0,
            n: 0,
        }
    }
}

/// Summary of a replicate sample using sample statistics and a 95% CI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceStatistics {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (divide by n-1; 0 when n < 2)
    pub std: f64,
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
    /// Lower bound of the Student-t 95% confidence interval
    pub ci_lower: f64,
    /// Upper bound of the Student-t 95% confidence interval
    pub ci_upper: f64,
    /// Coefficient of variation in percent (0 unless mean > 0)
    pub cv_percent: f64,
    /// Number of samples
    pub n: usize,
}

fn mean_of(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

/// Compute population summary statistics.
///
/// An empty input yields an all-zero result with `n = 0`; it is not an
/// error, because partial per-run data routinely leaves a metric with no
/// contributions.
pub fn compute_statistics(values: &[f64]) -> SampleStatistics {
    if values.is_empty() {
        return SampleStatistics::empty();
    }

    let n = values.len();
    let mean = mean_of(values);
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    let cv_percent = if mean == 0.0 { 0.0 } else { std / mean * 100.0 };
    let (min, max) = min_max(values);

    SampleStatistics {
        mean,
        std,
        min,
        max,
        cv_percent,
        n,
    }
}

/// Compute sample summary statistics with a Student-t 95% confidence
/// interval.
///
/// With fewer than 2 samples the std is 0 and the interval collapses to
/// the mean.
pub fn compute_statistics_with_ci(values: &[f64]) -> ConfidenceStatistics {
    if values.is_empty() {
        return ConfidenceStatistics {
            mean: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
            ci_lower: 0.0,
            ci_upper: 0.0,
            cv_percent: 0.0,
            n: 0,
        };
    }

    let n = values.len();
    let mean = mean_of(values);
    let (min, max) = min_max(values);

    let std = if n < 2 {
        0.0
    } else {
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    };

    let (ci_lower, ci_upper) = if n > 1 {
        let sem = std / (n as f64).sqrt();
        let t = student_t_quantile(0.975, n - 1);
        (mean - t * sem, mean + t * sem)
    } else {
        (mean, mean)
    };

    let cv_percent = if mean > 0.0 { std / mean * 100.0 } else { 0.0 };

    ConfidenceStatistics {
        mean,
        std,
        min,
        max,
        ci_lower,
        ci_upper,
        cv_percent,
        n,
    }
}
