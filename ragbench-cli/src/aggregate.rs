//! Replicate Aggregation
//!
//! Folds N replicate run records into one `aggregated_results.json` per
//! corpus. Aggregation carries no timestamps and visits metrics in
//! sorted order, so re-running it over the same inputs produces a
//! byte-identical file.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use ragbench_report::{
    build_mean_result, extract_metrics, AggregatedResult, MetricStatistics, AGGREGATED_FILE_NAME,
};

use crate::loader::{corpus_dirs, load_runs};

/// Aggregate N replicate run records. Returns `None` when there are no
/// runs at all.
pub fn aggregate_runs(runs: Vec<Value>) -> Option<AggregatedResult> {
    if runs.is_empty() {
        return None;
    }

    let per_run_metrics: Vec<BTreeMap<String, f64>> = runs.iter().map(extract_metrics).collect();

    let mut statistics = BTreeMap::new();
    let metric_names: std::collections::BTreeSet<&String> =
        per_run_metrics.iter().flat_map(|m| m.keys()).collect();

    for name in metric_names {
        // Only runs that reported the metric contribute, in run order
        let values: Vec<f64> = per_run_metrics
            .iter()
            .filter_map(|m| m.get(name).copied())
            .collect();
        if !values.is_empty() {
            statistics.insert(name.clone(), MetricStatistics::from_values(values));
        }
    }

    let mean_result = build_mean_result(&runs, &statistics);

    Some(AggregatedResult {
        n_runs: runs.len(),
        individual_runs: runs,
        statistics,
        mean_result,
        outlier_cleaning: BTreeMap::new(),
    })
}

/// Aggregate one corpus directory and write its `aggregated_results.json`.
///
/// Returns whether a file was written (false when the corpus has no
/// usable runs).
pub fn aggregate_corpus(corpus_dir: &Path) -> anyhow::Result<bool> {
    let runs = load_runs(corpus_dir);
    let Some(aggregated) = aggregate_runs(runs) else {
        warn!("{}: no usable runs, nothing to aggregate", corpus_dir.display());
        return Ok(false);
    };

    let out_path = corpus_dir.join(AGGREGATED_FILE_NAME);
    std::fs::write(&out_path, aggregated.to_json_pretty()?)?;
    info!(
        "{}: aggregated {} runs, {} metrics",
        corpus_dir.display(),
        aggregated.n_runs,
        aggregated.statistics.len()
    );
    Ok(true)
}

/// Aggregate every `corpus_*` directory under a results tree, in
/// parallel. Returns the number of files written.
pub fn aggregate_tree(results_dir: &Path) -> anyhow::Result<usize> {
    let dirs = corpus_dirs(results_dir)?;
    if dirs.is_empty() {
        warn!("No corpus_* directories under {}", results_dir.display());
        return Ok(0);
    }

    let written: usize = dirs
        .par_iter()
        .map(|dir| match aggregate_corpus(dir) {
            Ok(true) => 1,
            Ok(false) => 0,
            Err(e) => {
                warn!("{}: aggregation failed: {}", dir.display(), e);
                0
            }
        })
        .sum();

    Ok(written)
}
