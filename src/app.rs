//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - takes the history lock and runs the pipeline
//! - writes the output tables and the optional JSON summary
//! - prints the terminal report

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{AnalyzeArgs, Command, MergeArgs, OutputArgs, RunArgs, ThresholdArgs};
use crate::domain::AnalysisConfig;
use crate::error::AppError;
use crate::io::ingest::{RawBatch, read_raw_observations};
use crate::io::store::CsvHistoryStore;
use crate::io::summary::{RunSummary, write_summary_json};

pub mod pipeline;

/// Where a run reads from and writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub history: PathBuf,
    pub out_dir: PathBuf,
    pub include_series: bool,
    pub summary: Option<PathBuf>,
    pub top_n: usize,
    pub quiet: bool,
}

/// Entry point for the `ptrend` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Merge(args) => handle_merge(args),
        Command::Analyze(args) => handle_analyze(args),
    }
}

fn init_tracing() {
    // Logs go to stderr; stdout carries the report.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.thresholds)?;
    let run_config = run_config_from_args(args.store.history, &args.output);

    let mut store = CsvHistoryStore::new(&run_config.history);
    let _lock = store.lock()?;

    let raw = read_input(&args.input, args.require_data)?;
    let run = pipeline::run_full(&mut store, raw, &config)?;
    finish(&run, &config, &run_config)
}

fn handle_merge(args: MergeArgs) -> Result<(), AppError> {
    let mut store = CsvHistoryStore::new(&args.store.history);
    let _lock = store.lock()?;

    let raw = read_input(&args.input, args.require_data)?;
    let run = pipeline::run_merge(&mut store, raw)?;

    println!(
        "{}",
        crate::report::format_run_report(&run, &AnalysisConfig::default(), 0)
    );
    Ok(())
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args.thresholds)?;
    let run_config = run_config_from_args(args.store.history, &args.output);

    let store = CsvHistoryStore::new(&run_config.history);
    let _lock = store.lock()?;

    let run = pipeline::run_analysis(&store, &config)?;
    finish(&run, &config, &run_config)
}

fn read_input(path: &Path, require_data: bool) -> Result<RawBatch, AppError> {
    let raw = read_raw_observations(path)?;
    if require_data && raw.records.is_empty() {
        return Err(AppError::data(format!(
            "No records in input '{}' ({} unreadable rows).",
            path.display(),
            raw.row_errors.len()
        )));
    }
    Ok(raw)
}

/// Tables, summary, then the terminal report.
fn finish(run: &pipeline::RunOutput, config: &AnalysisConfig, run_config: &RunConfig) -> Result<(), AppError> {
    if let Some(analysis) = &run.analysis {
        let written = crate::io::export::write_analysis(&run_config.out_dir, analysis, run_config.include_series)?;
        tracing::info!(out_dir = %run_config.out_dir.display(), "wrote {}", written.metrics.display());
    }

    if let Some(path) = &run_config.summary {
        write_summary_json(path, &RunSummary::from_run(run, config))?;
    }

    if !run_config.quiet {
        println!(
            "{}",
            crate::report::format_run_report(run, config, run_config.top_n)
        );
    }

    Ok(())
}

pub fn analysis_config_from_args(args: &ThresholdArgs) -> Result<AnalysisConfig, AppError> {
    let config = AnalysisConfig {
        z_threshold: args.z_threshold,
        spike_threshold_pct: args.spike_pct,
        min_history: args.min_history,
    };
    config.validate().map_err(AppError::usage)?;
    Ok(config)
}

pub fn run_config_from_args(history: PathBuf, output: &OutputArgs) -> RunConfig {
    RunConfig {
        history,
        out_dir: output.out_dir.clone(),
        include_series: output.series,
        summary: output.summary.clone(),
        top_n: output.top,
        quiet: output.quiet,
    }
}
