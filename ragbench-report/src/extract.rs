//! Metric Extraction
//!
//! Pulls the scalar metrics used for cross-run analysis out of a raw run
//! record. Backends disagree on shape (notably `query_results` may be a
//! list of per-top-k entries or a map keyed by top-k), so every lookup is
//! tolerant: a missing field omits the metric, it never fails the run.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::MetricStatistics;
use crate::STANDARD_TOP_K;

/// Locate the query sub-record for a given top-k fan-out.
///
/// List form: the first entry whose `top_k` matches, falling back to the
/// first entry. Map form: key `"3"`, then `"top_k_3"`, then the first
/// value in key order.
pub fn query_entry_for_top_k(query_results: &Value, top_k: u64) -> Option<&Value> {
    match query_results {
        Value::Array(entries) => entries
            .iter()
            .find(|e| e.get("top_k").and_then(Value::as_u64) == Some(top_k))
            .or_else(|| entries.first()),
        Value::Object(map) => {
            let plain = top_k.to_string();
            let prefixed = format!("top_k_{top_k}");
            map.get(&plain)
                .or_else(|| map.get(&prefixed))
                .or_else(|| map.values().next())
        }
        _ => None,
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn insert_if_present(metrics: &mut BTreeMap<String, f64>, key: &str, value: Option<f64>) {
    if let Some(v) = value {
        metrics.insert(key.to_string(), v);
    }
}

/// Extract the analysis metrics from one raw run record.
///
/// The top-k=3 query entry is the standard source for latency and
/// throughput figures.
pub fn extract_metrics(results: &Value) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();

    if let Some(ingestion) = results.get("ingestion") {
        insert_if_present(
            &mut metrics,
            "ingestion_time",
            as_number(ingestion.get("total_time_sec")),
        );
        insert_if_present(
            &mut metrics,
            "num_chunks",
            as_number(ingestion.get("num_chunks")),
        );
    }

    let query = results
        .get("query_results")
        .and_then(|qr| query_entry_for_top_k(qr, STANDARD_TOP_K));

    if let Some(q) = query {
        // Older backends only report the average latency
        let p50 = as_number(q.get("p50_latency_ms")).or_else(|| as_number(q.get("avg_latency_ms")));
        insert_if_present(&mut metrics, "p50_latency_ms", p50);
        insert_if_present(
            &mut metrics,
            "p95_latency_ms",
            as_number(q.get("p95_latency_ms")),
        );
        insert_if_present(
            &mut metrics,
            "avg_latency_ms",
            as_number(q.get("avg_latency_ms")),
        );
        insert_if_present(
            &mut metrics,
            "queries_per_second",
            as_number(q.get("queries_per_second")),
        );
        insert_if_present(
            &mut metrics,
            "avg_similarity",
            as_number(q.get("avg_similarity")),
        );

        if let Some(rm) = q.get("resource_metrics") {
            insert_if_present(
                &mut metrics,
                "cpu_avg",
                as_number(rm.get("cpu").and_then(|c| c.get("avg"))),
            );
            insert_if_present(
                &mut metrics,
                "memory_avg_mb",
                as_number(rm.get("memory").and_then(|m| m.get("avg_mb"))),
            );
        }
    }

    metrics
}

/// Number of chunks a corpus produced, read from a result-shaped record.
pub fn chunk_count(result: &Value) -> Option<f64> {
    as_number(result.get("ingestion").and_then(|i| i.get("num_chunks")))
}

fn set_if_mean_exists(
    target: &mut Value,
    field: &str,
    statistics: &BTreeMap<String, MetricStatistics>,
    metric: &str,
) {
    if let (Some(stats), Some(obj)) = (statistics.get(metric), target.as_object_mut()) {
        obj.insert(field.to_string(), Value::from(stats.mean));
    }
}

fn mean_query_entry_mut(query_results: &mut Value, top_k: u64) -> Option<&mut Value> {
    match query_results {
        Value::Array(entries) => entries
            .iter_mut()
            .find(|e| e.get("top_k").and_then(Value::as_u64) == Some(top_k)),
        Value::Object(map) => {
            let plain = top_k.to_string();
            if map.contains_key(&plain) {
                return map.get_mut(&plain);
            }
            map.get_mut(&format!("top_k_{top_k}"))
        }
        _ => None,
    }
}

/// Build the representative result for an aggregated file: a deep copy
/// of the first run with key scalars replaced by their cross-run means.
///
/// Returns `Value::Null` when there are no runs.
pub fn build_mean_result(
    runs: &[Value],
    statistics: &BTreeMap<String, MetricStatistics>,
) -> Value {
    let Some(first) = runs.first() else {
        return Value::Null;
    };
    let mut result = first.clone();

    if let Some(ingestion) = result.get_mut("ingestion") {
        set_if_mean_exists(ingestion, "total_time_sec", statistics, "ingestion_time");
    }

    if let Some(qr) = result.get_mut("query_results") {
        if let Some(entry) = mean_query_entry_mut(qr, STANDARD_TOP_K) {
            for metric in [
                "p50_latency_ms",
                "p95_latency_ms",
                "avg_latency_ms",
                "queries_per_second",
                "avg_similarity",
            ] {
                set_if_mean_exists(entry, metric, statistics, metric);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list_shaped_run() -> Value {
        json!({
            "ingestion": {"total_time_sec": 120.5, "num_chunks": 1500},
            "query_results": [
                {"top_k": 1, "p50_latency_ms": 5.0},
                {
                    "top_k": 3,
                    "p50_latency_ms": 12.5,
                    "p95_latency_ms": 30.0,
                    "avg_latency_ms": 14.0,
                    "queries_per_second": 80.0,
                    "avg_similarity": 0.82,
                    "resource_metrics": {
                        "cpu": {"avg": 45.0},
                        "memory": {"avg_mb": 512.0}
                    }
                }
            ]
        })
    }

    fn map_shaped_run() -> Value {
        json!({
            "ingestion": {"total_time_sec": 99.0, "num_chunks": 1500},
            "query_results": {
                "3": {"avg_latency_ms": 11.0, "queries_per_second": 90.0}
            }
        })
    }

    #[test]
    fn test_extract_from_list_shape() {
        let metrics = extract_metrics(&list_shaped_run());
        assert!((metrics["ingestion_time"] - 120.5).abs() < 1e-12);
        assert!((metrics["num_chunks"] - 1500.0).abs() < 1e-12);
        assert!((metrics["p50_latency_ms"] - 12.5).abs() < 1e-12);
        assert!((metrics["p95_latency_ms"] - 30.0).abs() < 1e-12);
        assert!((metrics["queries_per_second"] - 80.0).abs() < 1e-12);
        assert!((metrics["avg_similarity"] - 0.82).abs() < 1e-12);
        assert!((metrics["cpu_avg"] - 45.0).abs() < 1e-12);
        assert!((metrics["memory_avg_mb"] - 512.0).abs() < 1e-12);
    }

    #[test]
    fn test_extract_from_map_shape_with_p50_fallback() {
        let metrics = extract_metrics(&map_shaped_run());
        // No p50 reported, so the average stands in for it
        assert!((metrics["p50_latency_ms"] - 11.0).abs() < 1e-12);
        assert!((metrics["avg_latency_ms"] - 11.0).abs() < 1e-12);
        assert!((metrics["queries_per_second"] - 90.0).abs() < 1e-12);
        assert!(!metrics.contains_key("p95_latency_ms"));
    }

    #[test]
    fn test_extract_missing_sections() {
        let metrics = extract_metrics(&json!({}));
        assert!(metrics.is_empty());

        let metrics = extract_metrics(&json!({"ingestion": {"num_chunks": 10}}));
        assert_eq!(metrics.len(), 1);
        assert!((metrics["num_chunks"] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_query_entry_fallbacks() {
        // List with no top_k=3 entry: first entry wins
        let qr = json!([{"top_k": 5, "avg_latency_ms": 7.0}]);
        let entry = query_entry_for_top_k(&qr, 3).unwrap();
        assert_eq!(entry.get("top_k").and_then(Value::as_u64), Some(5));

        // Map under the prefixed key
        let qr = json!({"top_k_3": {"avg_latency_ms": 8.0}});
        let entry = query_entry_for_top_k(&qr, 3).unwrap();
        assert!((entry["avg_latency_ms"].as_f64().unwrap() - 8.0).abs() < 1e-12);

        // Map with neither key: first value
        let qr = json!({"10": {"avg_latency_ms": 9.0}});
        assert!(query_entry_for_top_k(&qr, 3).is_some());

        assert!(query_entry_for_top_k(&json!(null), 3).is_none());
        assert!(query_entry_for_top_k(&json!([]), 3).is_none());
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(&list_shaped_run()), Some(1500.0));
        assert_eq!(chunk_count(&json!({})), None);
    }

    #[test]
    fn test_build_mean_result_substitutes_means() {
        let runs = vec![list_shaped_run(), list_shaped_run()];
        let mut statistics = BTreeMap::new();
        statistics.insert(
            "ingestion_time".to_string(),
            MetricStatistics::from_values(vec![100.0, 140.0]),
        );
        statistics.insert(
            "p50_latency_ms".to_string(),
            MetricStatistics::from_values(vec![10.0, 20.0]),
        );

        let mean_result = build_mean_result(&runs, &statistics);
        assert!(
            (mean_result["ingestion"]["total_time_sec"].as_f64().unwrap() - 120.0).abs() < 1e-12
        );

        let entry = query_entry_for_top_k(&mean_result["query_results"], 3).unwrap();
        assert!((entry["p50_latency_ms"].as_f64().unwrap() - 15.0).abs() < 1e-12);
        // Metrics without statistics keep the first run's value
        assert!((entry["p95_latency_ms"].as_f64().unwrap() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_mean_result_empty_runs() {
        assert_eq!(build_mean_result(&[], &BTreeMap::new()), Value::Null);
    }
}
