//! Benchmark Run Orchestration
//!
//! Executes the configured external benchmark command N replicate times
//! per corpus. The external process owns the database under test; this
//! side only provides the working directory, a log file, and a deadline.
//!
//! Failure policy is best-effort: a failed or timed-out run is logged
//! and the remaining runs and corpora continue. Runs that already have a
//! `results.json` are skipped, so an interrupted experiment resumes
//! where it stopped.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use ragbench_report::RESULTS_FILE_NAME;

use crate::aggregate::aggregate_corpus;
use crate::config::{CorpusConfig, RagbenchConfig};

/// Name of the per-run log file capturing the benchmark's output
pub const RUN_LOG_FILE_NAME: &str = "benchmark.log";

/// Poll interval while waiting on an external benchmark
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Failures of an external benchmark process.
#[derive(Debug, Error)]
pub enum ExternalProcessError {
    /// The command could not be started at all
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        /// The command that failed to start
        command: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
    /// The process ran but exited with a non-zero status
    #[error("{command} exited with {code:?}; see {log}")]
    NonZeroExit {
        /// The command that failed
        command: String,
        /// Exit code, when the OS reported one
        code: Option<i32>,
        /// Path to the captured log
        log: String,
    },
    /// The process exceeded its deadline and was killed
    #[error("{command} timed out after {timeout_secs}s")]
    TimedOut {
        /// The command that was killed
        command: String,
        /// The deadline that was exceeded
        timeout_secs: u64,
    },
}

/// Run one external command to completion with a wall-clock deadline,
/// its stdout and stderr captured to `benchmark.log` in `run_dir`.
pub fn run_with_timeout(
    argv: &[String],
    run_dir: &Path,
    timeout: Duration,
) -> Result<(), ExternalProcessError> {
    let command_display = argv.join(" ");
    let (program, args) = argv.split_first().ok_or_else(|| ExternalProcessError::Spawn {
        command: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;

    let log_path = run_dir.join(RUN_LOG_FILE_NAME);
    let io_err = |e: std::io::Error, command: &str| ExternalProcessError::Spawn {
        command: command.to_string(),
        source: e,
    };
    let stdout_log =
        std::fs::File::create(&log_path).map_err(|e| io_err(e, &command_display))?;
    // Single file, shared cursor: stdout and stderr interleave in order
    let stderr_log = stdout_log
        .try_clone()
        .map_err(|e| io_err(e, &command_display))?;

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::from(stdout_log))
        .stderr(Stdio::from(stderr_log))
        .spawn()
        .map_err(|e| ExternalProcessError::Spawn {
            command: command_display.clone(),
            source: e,
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    return Ok(());
                }
                return Err(ExternalProcessError::NonZeroExit {
                    command: command_display,
                    code: status.code(),
                    log: log_path.display().to_string(),
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExternalProcessError::TimedOut {
                        command: command_display,
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(ExternalProcessError::Spawn {
                    command: command_display,
                    source: e,
                });
            }
        }
    }
}

fn substitute(template: &[String], corpus_path: &str, output_dir: &Path) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            arg.replace("{corpus}", corpus_path)
                .replace("{output}", &output_dir.display().to_string())
        })
        .collect()
}

/// Execute N replicate runs for one corpus, then aggregate whatever
/// succeeded. Returns the number of runs with usable results.
pub fn run_replicates(
    config: &RagbenchConfig,
    database: &str,
    corpus: &CorpusConfig,
    results_dir: &Path,
) -> anyhow::Result<usize> {
    let template = config.runner.command.get(database).ok_or_else(|| {
        anyhow::anyhow!("No [runner.command] entry for database '{}'", database)
    })?;
    let timeout = Duration::from_secs(RagbenchConfig::parse_duration(&config.runner.timeout)?);

    let corpus_dir = results_dir.join(format!("corpus_{}", corpus.name));
    std::fs::create_dir_all(&corpus_dir)?;

    let mut usable = 0;
    for run in 1..=config.runner.runs {
        let run_dir = corpus_dir.join(format!("run_{}", run));
        std::fs::create_dir_all(&run_dir)?;

        if run_dir.join(RESULTS_FILE_NAME).exists() {
            info!("{}/run_{}: results exist, skipping", corpus.name, run);
            usable += 1;
            continue;
        }

        let argv = substitute(template, &corpus.path, &run_dir);
        info!("{}/run_{}: {}", corpus.name, run, argv.join(" "));

        let started = Instant::now();
        match run_with_timeout(&argv, &run_dir, timeout) {
            Ok(()) => {
                info!(
                    "{}/run_{}: completed in {:.1}m",
                    corpus.name,
                    run,
                    started.elapsed().as_secs_f64() / 60.0
                );
                if run_dir.join(RESULTS_FILE_NAME).exists() {
                    usable += 1;
                } else {
                    warn!(
                        "{}/run_{}: completed but wrote no {}",
                        corpus.name, run, RESULTS_FILE_NAME
                    );
                }
            }
            Err(e) => warn!("{}/run_{}: {}", corpus.name, run, e),
        }
    }

    if usable > 0 {
        aggregate_corpus(&corpus_dir)?;
    }
    Ok(usable)
}

/// Run the whole experiment: every configured corpus, in order.
pub fn run_experiment(
    config: &RagbenchConfig,
    database: &str,
    results_dir: &Path,
) -> anyhow::Result<()> {
    if config.corpus.is_empty() {
        return Err(anyhow::anyhow!("No [[corpus]] entries configured"));
    }

    for corpus in &config.corpus {
        match run_replicates(config, database, corpus, results_dir) {
            Ok(usable) => info!(
                "{}: {}/{} usable runs",
                corpus.name, usable, config.runner.runs
            ),
            Err(e) => warn!("{}: {}", corpus.name, e),
        }
    }
    Ok(())
}
