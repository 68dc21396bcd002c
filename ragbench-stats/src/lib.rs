#![warn(missing_docs)]
//! RagBench Statistical Engine
//!
//! Provides the numeric core for replicate benchmark analysis:
//! - Summary statistics over repeated measurements (population and
//!   sample-with-CI variants, matching the two reporting paths)
//! - Pluggable outlier detection (IQR fences, modified Z-score over the
//!   MAD, and a cold-start detector for leading-run degradation)
//! - Power-law scaling fits via log-log regression
//!
//! Everything here is a pure function of its input: no I/O, no clocks,
//! no global state.

mod outliers;
mod quantiles;
mod scaling;
mod statistics;

pub use outliers::{Detection, Detector, OutlierReport};
pub use quantiles::{median, percentile, student_t_quantile};
pub use scaling::{fit_power_law, FitError, ScalingClass, ScalingFit};
pub use statistics::{
    compute_statistics, compute_statistics_with_ci, ConfidenceStatistics, SampleStatistics,
};

/// Default modified Z-score threshold for MAD-based detection
pub const MODIFIED_ZSCORE_THRESHOLD: f64 = 3.5;

/// IQR multiplier for the conservative cleaning tier
pub const CONSERVATIVE_IQR_MULTIPLIER: f64 = 3.0;

/// IQR multiplier for the aggressive cleaning tier
pub const AGGRESSIVE_IQR_MULTIPLIER: f64 = 2.0;

/// A leading run is a cold-start candidate when its mean is at least this
/// many times the mean of the remaining runs
pub const COLD_START_RATIO: f64 = 3.0;

/// Minimum CV improvement (percentage points) for a cold-start detection
/// to be reported at all
pub const COLD_START_MIN_CV_IMPROVEMENT_PP: f64 = 15.0;

/// Cleaning never leaves a metric with fewer than this many samples
pub const MIN_RETAINED_SAMPLES: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!((MODIFIED_ZSCORE_THRESHOLD - 3.5).abs() < f64::EPSILON);
        assert!((CONSERVATIVE_IQR_MULTIPLIER - 3.0).abs() < f64::EPSILON);
        assert!((AGGRESSIVE_IQR_MULTIPLIER - 2.0).abs() < f64::EPSILON);
        assert_eq!(MIN_RETAINED_SAMPLES, 3);
    }
}
