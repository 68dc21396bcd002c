//! Quantile helpers
//!
//! Percentiles use linear interpolation between nearest ranks, matching
//! the convention the rest of the pipeline assumes for quartile-based
//! outlier fences. The Student-t quantile is a rational approximation so
//! the crate stays free of special-function dependencies.

/// Compute a percentile (0-100) with linear interpolation between
/// nearest ranks. Empty input yields 0.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.len() == 1 {
        return values[0];
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let rank = (pct / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let fraction = rank - lower as f64;

    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Median of a sample (50th percentile). Empty input yields 0.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Standard normal quantile (inverse CDF).
///
/// Abramowitz and Stegun rational approximation (26.2.23), absolute
/// error below 4.5e-4.
fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let (tail, sign) = if p < 0.5 { (p, -1.0) } else { (1.0 - p, 1.0) };
    let tail = tail.max(1e-10);
    let t = (-2.0 * tail.ln()).sqrt();

    let num = 2.515517 + t * (0.802853 + t * 0.010328);
    let den = 1.0 + t * (1.432788 + t * (0.189269 + t * 0.001308));

    sign * (t - num / den)
}

/// Student-t quantile for `df` degrees of freedom.
///
/// Cornish-Fisher expansion of the t quantile around the normal quantile
/// (Hill 1970). Accurate to well under 1% for df >= 2; df = 1 is a rough
/// estimate but only arises for two-sample intervals.
pub fn student_t_quantile(p: f64, df: usize) -> f64 {
    let z = normal_quantile(p);
    if !z.is_finite() || df == 0 {
        return z;
    }

    let d = df as f64;
    let z3 = z.powi(3);
    let z5 = z.powi(5);
    let z7 = z.powi(7);
    let z9 = z.powi(9);

    let g1 = (z3 + z) / 4.0;
    let g2 = (5.0 * z5 + 16.0 * z3 + 3.0 * z) / 96.0;
    let g3 = (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / 384.0;
    let g4 = (79.0 * z9 + 776.0 * z7 + 1482.0 * z5 - 1920.0 * z3 - 945.0 * z) / 92160.0;

    z + g1 / d + g2 / (d * d) + g3 / (d * d * d) + g4 / (d * d * d * d)
}
