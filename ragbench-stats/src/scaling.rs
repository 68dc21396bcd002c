//! Power-Law Scaling Fits
//!
//! Fits `y = a * x^b` by ordinary least squares on `ln(y)` vs `ln(x)`.
//! The exponent `b` is what matters for capacity planning: it says how a
//! metric grows as the corpus grows.

use thiserror::Error;

/// Why a power-law fit could not be computed.
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    /// Fewer than two (x, y) points were supplied
    #[error("power-law fit needs at least 2 points, got {0}")]
    NotEnoughPoints(usize),
    /// The x and y series have different lengths
    #[error("mismatched series lengths: {x} x-values vs {y} y-values")]
    LengthMismatch {
        /// Number of x values
        x: usize,
        /// Number of y values
        y: usize,
    },
    /// A zero or negative value has no logarithm
    #[error("non-positive value {value} at index {index} cannot be log-transformed")]
    NonPositiveValue {
        /// Position of the offending value
        index: usize,
        /// The offending value
        value: f64,
    },
    /// All x values are equal, so the slope is undefined
    #[error("all x values are equal; slope is undefined")]
    ZeroVariance,
}

/// A fitted power law `y = coefficient * x^exponent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingFit {
    /// Multiplicative constant `a`
    pub coefficient: f64,
    /// Scaling exponent `b`
    pub exponent: f64,
    /// Goodness of fit in log-log space (Pearson r squared)
    pub r_squared: f64,
}

/// Qualitative reading of a scaling exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingClass {
    /// b < 0.6: grows much slower than the corpus
    Sublinear,
    /// 0.6 <= b < 1.0: grows slower than the corpus
    NearLinear,
    /// 1.0 <= b < 1.2: grows roughly with the corpus
    Linear,
    /// b >= 1.2: grows faster than the corpus
    Superlinear,
}

impl std::fmt::Display for ScalingClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScalingClass::Sublinear => "sublinear (excellent)",
            ScalingClass::NearLinear => "near-linear (good)",
            ScalingClass::Linear => "linear (acceptable)",
            ScalingClass::Superlinear => "superlinear (concerning)",
        };
        f.write_str(label)
    }
}

impl ScalingFit {
    /// Classify the exponent into an efficiency band.
    pub fn efficiency(&self) -> ScalingClass {
        if self.exponent < 0.6 {
            ScalingClass::Sublinear
        } else if self.exponent < 1.0 {
            ScalingClass::NearLinear
        } else if self.exponent < 1.2 {
            ScalingClass::Linear
        } else {
            ScalingClass::Superlinear
        }
    }

    /// Predicted y at a given x.
    pub fn predict(&self, x: f64) -> f64 {
        self.coefficient * x.powf(self.exponent)
    }
}

/// Fit `y = a * x^b` by least squares in log-log space.
///
/// Both series must be strictly positive. When the y series is constant
/// the fit is exact by convention: slope 0 and `r_squared = 1.0`. This is
/// deliberate — textbook Pearson r (and most regression libraries) report
/// r = 0 for a zero-variance response, but for scaling curves a flat
/// metric is a perfect `O(N^0)` fit, not an unexplained one.
pub fn fit_power_law(x: &[f64], y: &[f64]) -> Result<ScalingFit, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(FitError::NotEnoughPoints(x.len()));
    }
    for (i, &v) in x.iter().enumerate() {
        if v <= 0.0 {
            return Err(FitError::NonPositiveValue { index: i, value: v });
        }
    }
    for (i, &v) in y.iter().enumerate() {
        if v <= 0.0 {
            return Err(FitError::NonPositiveValue { index: i, value: v });
        }
    }

    let lx: Vec<f64> = x.iter().map(|v| v.ln()).collect();
    let ly: Vec<f64> = y.iter().map(|v| v.ln()).collect();

    let n = lx.len() as f64;
    let mean_x = lx.iter().sum::<f64>() / n;
    let mean_y = ly.iter().sum::<f64>() / n;

    let sxx: f64 = lx.iter().map(|v| (v - mean_x).powi(2)).sum();
    let syy: f64 = ly.iter().map(|v| (v - mean_y).powi(2)).sum();
    let sxy: f64 = lx
        .iter()
        .zip(ly.iter())
        .map(|(a, b)| (a - mean_x) * (b - mean_y))
        .sum();

    if sxx == 0.0 {
        return Err(FitError::ZeroVariance);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    // Constant y fits exactly: no variance left to explain
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };

    Ok(ScalingFit {
        coefficient: intercept.exp(),
        exponent: slope,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_linear_fit() {
        // y = 2x exactly: b = 1, a = 2, r^2 = 1
        let x = vec![100.0, 1000.0, 10_000.0];
        let y = vec![200.0, 2000.0, 20_000.0];
        let fit = fit_power_law(&x, &y).unwrap();
        assert!((fit.exponent - 1.0).abs() < 1e-6);
        assert!((fit.coefficient - 2.0).abs() < 1e-6);
        assert!((fit.r_squared - 1.0).abs() < 1e-6);
        assert_eq!(fit.efficiency(), ScalingClass::Linear);
    }

    #[test]
    fn test_exact_sublinear_fit() {
        // y = 3 * x^0.5
        let x: Vec<f64> = vec![1.0, 4.0, 16.0, 64.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v.sqrt()).collect();
        let fit = fit_power_law(&x, &y).unwrap();
        assert!((fit.exponent - 0.5).abs() < 1e-9);
        assert!((fit.coefficient - 3.0).abs() < 1e-9);
        assert_eq!(fit.efficiency(), ScalingClass::Sublinear);
    }

    #[test]
    fn test_constant_y_convention() {
        let x = vec![100.0, 1000.0, 10_000.0];
        let y = vec![5.0, 5.0, 5.0];
        let fit = fit_power_law(&x, &y).unwrap();
        assert!(fit.exponent.abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_predict() {
        let fit = ScalingFit {
            coefficient: 2.0,
            exponent: 1.0,
            r_squared: 1.0,
        };
        assert!((fit.predict(50.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_points() {
        assert_eq!(
            fit_power_law(&[10.0], &[20.0]),
            Err(FitError::NotEnoughPoints(1))
        );
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            fit_power_law(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(FitError::LengthMismatch { x: 3, y: 2 })
        );
    }

    #[test]
    fn test_non_positive_rejected() {
        assert_eq!(
            fit_power_law(&[1.0, 0.0], &[1.0, 2.0]),
            Err(FitError::NonPositiveValue {
                index: 1,
                value: 0.0
            })
        );
        assert_eq!(
            fit_power_law(&[1.0, 2.0], &[-3.0, 2.0]),
            Err(FitError::NonPositiveValue {
                index: 0,
                value: -3.0
            })
        );
    }

    #[test]
    fn test_zero_x_variance() {
        assert_eq!(
            fit_power_law(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]),
            Err(FitError::ZeroVariance)
        );
    }

    #[test]
    fn test_efficiency_bands() {
        let mk = |b| ScalingFit {
            coefficient: 1.0,
            exponent: b,
            r_squared: 1.0,
        };
        assert_eq!(mk(0.3).efficiency(), ScalingClass::Sublinear);
        assert_eq!(mk(0.6).efficiency(), ScalingClass::NearLinear);
        assert_eq!(mk(1.0).efficiency(), ScalingClass::Linear);
        assert_eq!(mk(1.19).efficiency(), ScalingClass::Linear);
        assert_eq!(mk(1.2).efficiency(), ScalingClass::Superlinear);
    }
}
