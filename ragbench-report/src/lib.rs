#![warn(missing_docs)]
//! RagBench Report - Persisted Schema and Metric Extraction
//!
//! The aggregated-results file format (`aggregated_results.json`) and the
//! contract for pulling scalar metrics out of a raw benchmark run record.
//! Raw run records stay schemaless (`serde_json::Value`) because each
//! database backend reports a slightly different shape; the extraction
//! layer is where those shapes converge.

mod extract;
mod schema;

pub use extract::{build_mean_result, chunk_count, extract_metrics, query_entry_for_top_k};
pub use schema::{AggregatedResult, CleaningPassRecord, MetricStatistics};

/// Name of the per-corpus aggregated output file
pub const AGGREGATED_FILE_NAME: &str = "aggregated_results.json";

/// Name of the per-run raw results file
pub const RESULTS_FILE_NAME: &str = "results.json";

/// The query fan-out whose latency figures drive all cross-run analysis
pub const STANDARD_TOP_K: u64 = 3;
