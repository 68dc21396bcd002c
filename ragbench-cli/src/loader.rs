//! Results-Tree Loading
//!
//! A results tree is `<results_dir>/corpus_<name>/run_<N>/results.json`.
//! Loading is best-effort throughout: an unreadable or malformed run is
//! logged and skipped, never fatal, so one bad run cannot sink a
//! multi-hour experiment's analysis.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use ragbench_report::RESULTS_FILE_NAME;

/// Find `corpus_*` directories under a results directory, sorted by name.
pub fn corpus_dirs(results_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(results_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_corpus = path.is_dir()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("corpus_"));
        if is_corpus {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Find `run_<N>` directories under a corpus directory, sorted by run
/// number (so `run_10` follows `run_9`, not `run_1`).
pub fn run_dirs(corpus_dir: &Path) -> Vec<(usize, PathBuf)> {
    let entries = match std::fs::read_dir(corpus_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read corpus directory {}: {}", corpus_dir.display(), e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if !path.is_dir() {
                return None;
            }
            let number = path
                .file_name()?
                .to_str()?
                .strip_prefix("run_")?
                .parse()
                .ok()?;
            Some((number, path))
        })
        .collect();
    dirs.sort_by_key(|(n, _)| *n);
    dirs
}

/// Load every run's `results.json` from a corpus directory, in run order.
///
/// Runs without a results file (crashed or still executing) and files
/// that fail to parse are skipped with a warning.
pub fn load_runs(corpus_dir: &Path) -> Vec<Value> {
    let mut runs = Vec::new();
    for (number, dir) in run_dirs(corpus_dir) {
        let results_file = dir.join(RESULTS_FILE_NAME);
        if !results_file.exists() {
            warn!("run_{} has no {}; skipping", number, RESULTS_FILE_NAME);
            continue;
        }
        match load_json(&results_file) {
            Ok(value) => runs.push(value),
            Err(e) => warn!("Skipping {}: {}", results_file.display(), e),
        }
    }
    runs
}

/// Read and parse a JSON file.
pub fn load_json(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&content)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_run(corpus: &Path, n: usize, body: &Value) {
        let dir = corpus.join(format!("run_{}", n));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(RESULTS_FILE_NAME), body.to_string()).unwrap();
    }

    #[test]
    fn test_corpus_dirs_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("corpus_small")).unwrap();
        std::fs::create_dir(tmp.path().join("corpus_large")).unwrap();
        std::fs::create_dir(tmp.path().join("plots")).unwrap();
        std::fs::write(tmp.path().join("corpus_stray.txt"), "").unwrap();

        let dirs = corpus_dirs(tmp.path()).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["corpus_large", "corpus_small"]);
    }

    #[test]
    fn test_run_dirs_numeric_order() {
        let tmp = tempfile::tempdir().unwrap();
        for n in [10, 2, 1, 9] {
            std::fs::create_dir(tmp.path().join(format!("run_{}", n))).unwrap();
        }
        std::fs::create_dir(tmp.path().join("run_abc")).unwrap();

        let numbers: Vec<usize> = run_dirs(tmp.path()).into_iter().map(|(n, _)| n).collect();
        assert_eq!(numbers, vec![1, 2, 9, 10]);
    }

    #[test]
    fn test_load_runs_skips_bad_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_run(tmp.path(), 1, &json!({"run": 1}));
        // run_2 exists but has no results file
        std::fs::create_dir(tmp.path().join("run_2")).unwrap();
        // run_3 has malformed JSON
        let dir = tmp.path().join("run_3");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(RESULTS_FILE_NAME), "{not json").unwrap();
        write_run(tmp.path(), 4, &json!({"run": 4}));

        let runs = load_runs(tmp.path());
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0]["run"], 1);
        assert_eq!(runs[1]["run"], 4);
    }
}
