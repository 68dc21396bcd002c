//! Human-Readable Output

use crate::analyze::ScalingAnalysis;
use crate::clean::CleanReport;

/// Format the per-corpus confidence tables for terminal display.
pub fn format_confidence_tables(analysis: &ScalingAnalysis) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Per-Corpus Statistics (mean \u{b1} SD, 95% CI)\n");
    output.push_str(&"=".repeat(72));
    output.push('\n');

    for corpus in &analysis.corpora {
        output.push_str(&format!(
            "\n{} ({:.0} chunks)\n",
            corpus.corpus, corpus.chunks
        ));
        output.push_str(&"-".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "  {:<22} {:>12} {:>8} {:>4} {:>22}\n",
            "metric", "mean \u{b1} SD", "CV%", "n", "95% CI"
        ));

        for (metric, stats) in &corpus.metrics {
            output.push_str(&format!(
                "  {:<22} {:>7.2} \u{b1} {:<6.2} {:>6.1} {:>4} [{:>8.2}, {:>8.2}]\n",
                metric, stats.mean, stats.std, stats.cv_percent, stats.n, stats.ci_lower,
                stats.ci_upper
            ));
        }
    }

    output
}

/// Format the power-law fit table for terminal display.
pub fn format_scaling_table(analysis: &ScalingAnalysis) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Scaling Fits (y = a \u{b7} N^b)\n");
    output.push_str(&"=".repeat(72));
    output.push('\n');

    if analysis.fits.is_empty() {
        output.push_str("No fits: need at least 3 corpora with positive means.\n");
        return output;
    }

    output.push_str(&format!(
        "  {:<22} {:>12} {:>8} {:>6}  {}\n",
        "metric", "complexity", "R\u{b2}", "points", "efficiency"
    ));
    for fit in &analysis.fits {
        output.push_str(&format!(
            "  {:<22} {:>12} {:>8.4} {:>6}  {}\n",
            fit.metric,
            format!("O(N^{:.3})", fit.exponent),
            fit.r_squared,
            fit.points.len(),
            fit.efficiency
        ));
    }

    output
}

/// Format a cleaning run's summary for terminal display.
pub fn format_clean_summary(report: &CleanReport) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Outlier Cleaning Summary\n");
    output.push_str(&"=".repeat(72));
    output.push('\n');
    output.push_str(&format!("Passes: {}\n\n", report.passes.join(" \u{2192} ")));

    if report.files.is_empty() {
        output.push_str("No outliers detected anywhere.\n");
        return output;
    }

    for file in &report.files {
        output.push_str(&format!(
            "{} ({} point(s) removed)\n",
            file.file, file.outliers_removed
        ));
        for (pass, outcome) in &file.passes {
            for (metric, cleaning) in &outcome.metrics_cleaned {
                output.push_str(&format!(
                    "    [{}] {}: removed {:?}, CV {:.1}% \u{2192} {:.1}% ({:+.1}pp)\n",
                    pass,
                    metric,
                    cleaning.outlier_values,
                    cleaning.before.cv_percent,
                    cleaning.after.cv_percent,
                    -cleaning.cv_improvement
                ));
            }
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Total outlier points removed: {}\n",
        report.total_outliers_removed
    ));

    output
}
