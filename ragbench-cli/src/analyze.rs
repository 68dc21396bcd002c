//! Scaling Analysis
//!
//! Turns the per-corpus aggregated files into cross-corpus scaling
//! curves: for each metric, a `(chunk_count, mean)` series over corpora
//! sorted by size, a Student-t 95% confidence table, and a power-law fit
//! when enough corpora exist.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use ragbench_report::{chunk_count, AggregatedResult, AGGREGATED_FILE_NAME};
use ragbench_stats::{compute_statistics_with_ci, fit_power_law, ConfidenceStatistics};

use crate::loader::{corpus_dirs, load_json};

/// Name of the analysis output file
pub const SCALING_FILE_NAME: &str = "scaling_statistics.json";

/// Power-law fits need at least this many corpus points
pub const MIN_FIT_POINTS: usize = 3;

/// Confidence summary for one metric at one corpus size.
#[derive(Debug, Clone, Serialize)]
pub struct MetricConfidence {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n-1)
    pub std: f64,
    /// Coefficient of variation in percent
    pub cv_percent: f64,
    /// Number of replicates
    pub n: usize,
    /// Lower bound of the Student-t 95% CI
    pub ci_lower: f64,
    /// Upper bound of the Student-t 95% CI
    pub ci_upper: f64,
}

impl From<&ConfidenceStatistics> for MetricConfidence {
    fn from(stats: &ConfidenceStatistics) -> Self {
        Self {
            mean: stats.mean,
            std: stats.std,
            cv_percent: stats.cv_percent,
            n: stats.n,
            ci_lower: stats.ci_lower,
            ci_upper: stats.ci_upper,
        }
    }
}

/// One corpus's confidence table.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    /// Corpus directory name (e.g. `corpus_small`)
    pub corpus: String,
    /// Chunk count, the x-axis of every scaling curve
    pub chunks: f64,
    /// Per-metric confidence statistics
    pub metrics: BTreeMap<String, MetricConfidence>,
}

/// Power-law fit for one metric across corpora.
#[derive(Debug, Clone, Serialize)]
pub struct MetricScaling {
    /// Metric name
    pub metric: String,
    /// `(chunks, mean)` points, sorted by chunks
    pub points: Vec<(f64, f64)>,
    /// Scaling exponent `b` in `y = a * N^b`
    pub exponent: f64,
    /// Coefficient `a`
    pub coefficient: f64,
    /// Goodness of fit in log-log space
    pub r_squared: f64,
    /// Qualitative efficiency band
    pub efficiency: String,
}

/// Full analysis output, persisted as `scaling_statistics.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ScalingAnalysis {
    /// Per-corpus confidence tables, sorted by chunk count
    pub corpora: Vec<CorpusSummary>,
    /// Per-metric power-law fits
    pub fits: Vec<MetricScaling>,
}

fn corpus_summary(name: String, aggregated: &AggregatedResult) -> Option<CorpusSummary> {
    let chunks = chunk_count(&aggregated.mean_result)
        .or_else(|| aggregated.statistics.get("num_chunks").map(|s| s.mean))?;

    let metrics = aggregated
        .statistics
        .iter()
        .map(|(metric, stats)| {
            let ci = compute_statistics_with_ci(&stats.values);
            (metric.clone(), MetricConfidence::from(&ci))
        })
        .collect();

    Some(CorpusSummary {
        corpus: name,
        chunks,
        metrics,
    })
}

/// Build the scaling analysis over a set of corpus summaries.
///
/// Chunk counts (the x axis) are never fitted against themselves, and a
/// metric is only fitted when it has enough positive points; a fit
/// failure for one metric is logged and skipped.
pub fn build_analysis(mut corpora: Vec<CorpusSummary>) -> ScalingAnalysis {
    corpora.sort_by(|a, b| a.chunks.partial_cmp(&b.chunks).unwrap_or(std::cmp::Ordering::Equal));

    let metric_names: std::collections::BTreeSet<String> = corpora
        .iter()
        .flat_map(|c| c.metrics.keys().cloned())
        .filter(|name| name != "num_chunks")
        .collect();

    let mut fits = Vec::new();
    for metric in metric_names {
        let points: Vec<(f64, f64)> = corpora
            .iter()
            .filter_map(|c| c.metrics.get(&metric).map(|m| (c.chunks, m.mean)))
            .collect();

        if points.len() < MIN_FIT_POINTS {
            continue;
        }

        let x: Vec<f64> = points.iter().map(|(chunks, _)| *chunks).collect();
        let y: Vec<f64> = points.iter().map(|(_, mean)| *mean).collect();
        match fit_power_law(&x, &y) {
            Ok(fit) => fits.push(MetricScaling {
                metric,
                points,
                exponent: fit.exponent,
                coefficient: fit.coefficient,
                r_squared: fit.r_squared,
                efficiency: fit.efficiency().to_string(),
            }),
            Err(e) => warn!("{}: power-law fit skipped: {}", metric, e),
        }
    }

    ScalingAnalysis { corpora, fits }
}

/// Analyze a results tree and write `scaling_statistics.json`.
pub fn analyze_tree(results_dir: &Path) -> anyhow::Result<ScalingAnalysis> {
    let mut corpora = Vec::new();
    for dir in corpus_dirs(results_dir)? {
        let path = dir.join(AGGREGATED_FILE_NAME);
        if !path.exists() {
            warn!("{}: no {}; run aggregate first", dir.display(), AGGREGATED_FILE_NAME);
            continue;
        }
        let value: Value = match load_json(&path) {
            Ok(value) => value,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let aggregated: AggregatedResult = match serde_json::from_value(value) {
            Ok(aggregated) => aggregated,
            Err(e) => {
                warn!("Skipping {}: not an aggregated results file: {}", path.display(), e);
                continue;
            }
        };
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        match corpus_summary(name, &aggregated) {
            Some(summary) => corpora.push(summary),
            None => warn!("{}: no chunk count, excluded from scaling", dir.display()),
        }
    }

    let analysis = build_analysis(corpora);
    info!(
        "Analyzed {} corpora, fitted {} metrics",
        analysis.corpora.len(),
        analysis.fits.len()
    );

    let out_path = results_dir.join(SCALING_FILE_NAME);
    std::fs::write(&out_path, serde_json::to_string_pretty(&analysis)?)?;

    Ok(analysis)
}
