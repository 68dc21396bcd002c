#![warn(missing_docs)]
//! RagBench CLI Library
//!
//! Pipeline driver for replicate vector-database benchmarks. The
//! lifecycle is four subcommands, each usable on its own:
//!
//! 1. `run` — execute the external benchmark N times per corpus
//! 2. `aggregate` — fold each corpus's runs into `aggregated_results.json`
//! 3. `clean` — apply the configured outlier-cleaning passes in place
//! 4. `analyze` — fit scaling curves and print the confidence tables

pub mod aggregate;
pub mod analyze;
pub mod clean;
pub mod config;
pub mod formatting;
pub mod loader;
pub mod runner;

pub use config::RagbenchConfig;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RagBench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "ragbench")]
#[command(author, version, about = "Replicate benchmark pipeline for RAG vector databases")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to ragbench.toml (discovered by walking up when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Results directory (overrides [output].directory)
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the external benchmark N replicate times per corpus
    Run {
        /// Database under test; selects the [runner.command] entry
        #[arg(long)]
        database: String,
    },
    /// Aggregate each corpus's runs into aggregated_results.json
    Aggregate,
    /// Apply the configured outlier-cleaning passes in place
    Clean,
    /// Fit scaling curves and print confidence tables
    Analyze,
    /// Write a default ragbench.toml to the current directory
    Init,
}

/// Run the RagBench CLI. The main entry point for the `ragbench` binary.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the RagBench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ragbench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("ragbench=info")
            .init();
    }

    let config = match &cli.config {
        Some(path) => RagbenchConfig::load(path)?,
        None => RagbenchConfig::discover().unwrap_or_default(),
    };

    let results_dir = cli
        .results_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.directory));

    match cli.command {
        Commands::Run { ref database } => {
            runner::run_experiment(&config, database, &results_dir)?;
        }
        Commands::Aggregate => {
            let written = aggregate::aggregate_tree(&results_dir)?;
            println!("Aggregated {} corpus directorie(s).", written);
        }
        Commands::Clean => {
            let passes = clean::passes_from_config(&config.cleaning)?;
            let report = clean::clean_tree(&results_dir, &passes)?;
            print!("{}", formatting::format_clean_summary(&report));
        }
        Commands::Analyze => {
            let analysis = analyze::analyze_tree(&results_dir)?;
            print!("{}", formatting::format_confidence_tables(&analysis));
            print!("{}", formatting::format_scaling_table(&analysis));
        }
        Commands::Init => {
            let path = PathBuf::from("ragbench.toml");
            if path.exists() {
                return Err(anyhow::anyhow!("ragbench.toml already exists"));
            }
            std::fs::write(&path, RagbenchConfig::default_toml())?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
