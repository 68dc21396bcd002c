//! Configuration loading from ragbench.toml
//!
//! Pipeline configuration lives in a `ragbench.toml` file and is
//! discovered by walking up from the current directory. Every section is
//! optional; defaults reproduce the standard three-tier cleaning policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// RagBench pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RagbenchConfig {
    /// Outlier-cleaning configuration
    #[serde(default)]
    pub cleaning: CleaningConfig,
    /// Benchmark runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Corpora to benchmark, in ascending size order
    #[serde(default)]
    pub corpus: Vec<CorpusConfig>,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Outlier-cleaning policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Pass names in application order: "conservative", "cold_start",
    /// "aggressive", "mad"
    #[serde(default = "default_passes")]
    pub passes: Vec<String>,
    /// Minimum CV improvement (percentage points) for the conservative
    /// pass to accept a detection
    #[serde(default = "default_conservative_improvement")]
    pub conservative_min_cv_improvement: f64,
    /// Minimum CV improvement for the aggressive pass
    #[serde(default = "default_aggressive_improvement")]
    pub aggressive_min_cv_improvement: f64,
    /// The aggressive pass also accepts when the cleaned CV drops below
    /// this, regardless of improvement
    #[serde(default = "default_aggressive_final_cv")]
    pub aggressive_max_final_cv: f64,
    /// Only metrics with a CV above this are eligible for the cold-start
    /// and aggressive passes
    #[serde(default = "default_high_cv")]
    pub high_cv_threshold: f64,
    /// Modified Z-score cutoff for the MAD pass
    #[serde(default = "default_mad_threshold")]
    pub mad_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            conservative_min_cv_improvement: default_conservative_improvement(),
            aggressive_min_cv_improvement: default_aggressive_improvement(),
            aggressive_max_final_cv: default_aggressive_final_cv(),
            high_cv_threshold: default_high_cv(),
            mad_threshold: default_mad_threshold(),
        }
    }
}

fn default_passes() -> Vec<String> {
    vec![
        "conservative".to_string(),
        "cold_start".to_string(),
        "aggressive".to_string(),
    ]
}
fn default_conservative_improvement() -> f64 {
    10.0
}
fn default_aggressive_improvement() -> f64 {
    5.0
}
fn default_aggressive_final_cv() -> f64 {
    30.0
}
fn default_high_cv() -> f64 {
    40.0
}
fn default_mad_threshold() -> f64 {
    3.5
}

/// Benchmark runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timeout for a single benchmark run (e.g., "30m", "2h")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Number of replicate runs per corpus
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Per-database benchmark command vectors. `{corpus}` and `{output}`
    /// placeholders are substituted per run.
    #[serde(default)]
    pub command: BTreeMap<String, Vec<String>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            runs: default_runs(),
            command: BTreeMap::new(),
        }
    }
}

fn default_timeout() -> String {
    "2h".to_string()
}
fn default_runs() -> usize {
    3
}

/// One corpus entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Corpus name; results land in `corpus_<name>/`
    pub name: String,
    /// Path to the corpus on disk
    pub path: String,
    /// Expected chunk count, if known (informational)
    #[serde(default)]
    pub expected_chunks: Option<u64>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding `corpus_*` result trees
    #[serde(default = "default_results_dir")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_results_dir(),
        }
    }
}

fn default_results_dir() -> String {
    "results".to_string()
}

impl RagbenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join("ragbench.toml");
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# RagBench Configuration

[cleaning]
# Cleaning passes, in application order.
# Available: "conservative", "cold_start", "aggressive", "mad"
passes = ["conservative", "cold_start", "aggressive"]
# Conservative pass: minimum CV improvement in percentage points
conservative_min_cv_improvement = 10.0
# Aggressive pass: minimum CV improvement in percentage points
aggressive_min_cv_improvement = 5.0
# Aggressive pass: accept regardless of improvement when the final CV drops below this
aggressive_max_final_cv = 30.0
# Cold-start and aggressive passes only touch metrics with CV above this
high_cv_threshold = 40.0
# Modified Z-score cutoff for the "mad" pass
mad_threshold = 3.5

[runner]
# Timeout for a single benchmark run
timeout = "2h"
# Replicate runs per corpus
runs = 3

# Per-database benchmark commands; {corpus} and {output} are substituted
[runner.command]
# chroma = ["python", "run_benchmark.py", "--database", "chroma", "--corpus", "{corpus}", "--output", "{output}"]

[output]
# Directory holding corpus_* result trees
directory = "results"

# Corpora in ascending size order
# [[corpus]]
# name = "small"
# path = "corpora/small"
# expected_chunks = 1500
"#
        .to_string()
    }

    /// Parse duration string (e.g., "90s", "30m", "2h") to seconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "s" | "" => 1,
            "m" | "min" => 60,
            "h" => 3600,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RagbenchConfig::default();
        assert_eq!(
            config.cleaning.passes,
            vec!["conservative", "cold_start", "aggressive"]
        );
        assert_eq!(config.runner.timeout, "2h");
        assert_eq!(config.runner.runs, 3);
        assert_eq!(config.output.directory, "results");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(RagbenchConfig::parse_duration("90").unwrap(), 90);
        assert_eq!(RagbenchConfig::parse_duration("90s").unwrap(), 90);
        assert_eq!(RagbenchConfig::parse_duration("30m").unwrap(), 1800);
        assert_eq!(RagbenchConfig::parse_duration("2h").unwrap(), 7200);
        assert_eq!(RagbenchConfig::parse_duration("1.5h").unwrap(), 5400);
        assert!(RagbenchConfig::parse_duration("").is_err());
        assert!(RagbenchConfig::parse_duration("5x").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [cleaning]
            passes = ["cold_start"]
            high_cv_threshold = 50.0

            [runner]
            runs = 10

            [[corpus]]
            name = "small"
            path = "corpora/small"
        "#;

        let config: RagbenchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cleaning.passes, vec!["cold_start"]);
        assert!((config.cleaning.high_cv_threshold - 50.0).abs() < f64::EPSILON);
        assert_eq!(config.runner.runs, 10);
        assert_eq!(config.corpus.len(), 1);
        assert_eq!(config.corpus[0].name, "small");
        // Defaults should still apply
        assert!((config.cleaning.mad_threshold - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.runner.timeout, "2h");
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = RagbenchConfig::default_toml();
        let config: RagbenchConfig = toml::from_str(&default_toml).unwrap();
        assert_eq!(config.runner.runs, 3);
        assert!((config.cleaning.conservative_min_cv_improvement - 10.0).abs() < f64::EPSILON);
    }
}
