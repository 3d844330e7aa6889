//! Command-line parsing for the price-series analytics tool.
//!
//! Parsing and dispatch stay separate from the analytics code; every flag ends up
//! in an [`AnalysisConfig`](crate::domain::AnalysisConfig) or a
//! [`RunConfig`](crate::app::RunConfig).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_MIN_HISTORY, DEFAULT_SPIKE_THRESHOLD_PCT, DEFAULT_Z_THRESHOLD};

pub const DEFAULT_HISTORY_FILE: &str = "historical_prices.csv";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ptrend", version, about = "Price history merger and trend/anomaly analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a batch, merge it into the history, analyze, and write the tables.
    Run(RunArgs),
    /// Ingest a batch and merge it into the history without analyzing.
    Merge(MergeArgs),
    /// Analyze the stored history as-is.
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Raw observations (CSV, or JSON array when the extension is `.json`).
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// Fail (exit 3) instead of continuing when the input holds no records.
    #[arg(long)]
    pub require_data: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct MergeArgs {
    /// Raw observations (CSV, or JSON array when the extension is `.json`).
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input: PathBuf,

    /// Fail (exit 3) instead of continuing when the input holds no records.
    #[arg(long)]
    pub require_data: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// Persisted history CSV (created on first run).
    #[arg(long, env = "PTREND_HISTORY", default_value = DEFAULT_HISTORY_FILE)]
    pub history: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ThresholdArgs {
    /// Flag a day when |z| of its return exceeds this.
    #[arg(long, env = "PTREND_Z_THRESHOLD", default_value_t = DEFAULT_Z_THRESHOLD)]
    pub z_threshold: f64,

    /// Flag a day when |daily change| exceeds this many percent.
    #[arg(long = "spike-pct", env = "PTREND_SPIKE_PCT", default_value_t = DEFAULT_SPIKE_THRESHOLD_PCT)]
    pub spike_pct: f64,

    /// Minimum stored records before any analysis runs.
    #[arg(long, env = "PTREND_MIN_HISTORY", default_value_t = DEFAULT_MIN_HISTORY)]
    pub min_history: usize,
}

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Directory for the output tables.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Also write the completed daily series.
    #[arg(long)]
    pub series: bool,

    /// Write a JSON run summary.
    #[arg(long, value_name = "JSON")]
    pub summary: Option<PathBuf>,

    /// Show top-N anomalies and spikes in the terminal report.
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Skip the terminal report.
    #[arg(long)]
    pub quiet: bool,
}
