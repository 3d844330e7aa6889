//! Shared run logic used by every CLI command.
//!
//! One run is:
//! load history -> normalize new observations -> merge -> analyze -> persist
//!
//! The analysis is computed from the merged history *before* anything is
//! persisted, so a store failure aborts the run before any output table exists.
//! Writing the tables is left to the caller.

use crate::analytics::{Analysis, analyze_history};
use crate::domain::{AnalysisConfig, RowError};
use crate::error::AppError;
use crate::io::ingest::RawBatch;
use crate::io::store::HistoryStore;
use crate::series::{History, MergeOutcome, normalize_observations};

/// What happened to the incoming raw records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub raw_rows: usize,
    pub accepted: usize,
    /// Unreadable rows and rejected records, ordered by line.
    pub rejected: Vec<RowError>,
}

/// All outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// `None` when the run had no new input (analysis only).
    pub ingest: Option<IngestReport>,
    pub merge: Option<MergeOutcome>,
    /// The history after this run's merge.
    pub history: History,
    /// `None` for merge-only runs.
    pub analysis: Option<Analysis>,
}

/// Ingest + merge + persist, without analysis.
pub fn run_merge<S: HistoryStore>(store: &mut S, raw: RawBatch) -> Result<RunOutput, AppError> {
    update_history(store, raw, None)
}

/// Ingest + merge + analyze + persist.
pub fn run_full<S: HistoryStore>(store: &mut S, raw: RawBatch, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    update_history(store, raw, Some(config))
}

/// Analyze the stored history as-is.
pub fn run_analysis<S: HistoryStore>(store: &S, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let history = store.load()?;
    tracing::info!(records = history.len(), products = history.product_count(), "history loaded");

    let analysis = analyze_history(&history, config);
    log_analysis(&analysis);

    Ok(RunOutput {
        ingest: None,
        merge: None,
        history,
        analysis: Some(analysis),
    })
}

fn update_history<S: HistoryStore>(
    store: &mut S,
    raw: RawBatch,
    config: Option<&AnalysisConfig>,
) -> Result<RunOutput, AppError> {
    let mut history = store.load()?;
    tracing::info!(records = history.len(), products = history.product_count(), "history loaded");

    let raw_rows = raw.records.len() + raw.row_errors.len();
    let batch = normalize_observations(&raw.records);

    let mut rejected = raw.row_errors;
    rejected.extend(batch.rejected.iter().cloned());
    rejected.sort_by_key(|e| e.line);
    for e in &rejected {
        tracing::warn!(
            line = e.line,
            product_id = e.product_id.as_deref().unwrap_or("-"),
            "dropped observation: {}",
            e.message
        );
    }

    if batch.is_empty() {
        tracing::info!(raw_rows, "no new data in this batch");
    }

    let merge = history.merge(&batch.observations);
    tracing::info!(
        appended = merge.appended.len(),
        skipped_existing = merge.skipped_existing,
        skipped_duplicate = merge.skipped_duplicate,
        "merged observations into history"
    );

    let analysis = config.map(|config| {
        let analysis = analyze_history(&history, config);
        log_analysis(&analysis);
        analysis
    });

    store.append(&merge.appended)?;

    Ok(RunOutput {
        ingest: Some(IngestReport {
            raw_rows,
            accepted: batch.observations.len(),
            rejected,
        }),
        merge: Some(merge),
        history,
        analysis,
    })
}

fn log_analysis(analysis: &Analysis) {
    if analysis.status.is_complete() {
        tracing::info!(
            series = analysis.series.len(),
            metrics = analysis.metrics.len(),
            anomalies = analysis.anomalies.len(),
            spikes = analysis.spikes.len(),
            "analysis complete"
        );
    }
}
