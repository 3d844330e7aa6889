//! Machine-readable run summary (JSON).

use std::fs::File;
use std::path::Path;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisConfig, AnalysisStatus};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated_at: NaiveDateTime,
    pub config: AnalysisConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestSummary>,
    pub history_records: usize,
    pub products: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub raw_rows: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub appended: usize,
    pub skipped_existing: usize,
    pub skipped_duplicate: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    #[serde(flatten)]
    pub status: AnalysisStatus,
    pub completed_series: usize,
    pub interpolated_days: usize,
    pub metrics_rows: usize,
    pub anomaly_rows: usize,
    pub spike_rows: usize,
}

impl RunSummary {
    pub fn from_run(run: &RunOutput, config: &AnalysisConfig) -> Self {
        let ingest = run.ingest.as_ref().map(|ingest| {
            let merge = run.merge.clone().unwrap_or_default();
            IngestSummary {
                raw_rows: ingest.raw_rows,
                accepted: ingest.accepted,
                rejected: ingest.rejected.len(),
                appended: merge.appended.len(),
                skipped_existing: merge.skipped_existing,
                skipped_duplicate: merge.skipped_duplicate,
            }
        });

        let analysis = run.analysis.as_ref().map(|a| AnalysisSummary {
            status: a.status,
            completed_series: a.series.len(),
            interpolated_days: a.series.iter().map(|s| s.interpolated_days()).sum(),
            metrics_rows: a.metrics.len(),
            anomaly_rows: a.anomalies.len(),
            spike_rows: a.spikes.len(),
        });

        Self {
            tool: "ptrend".to_string(),
            generated_at: Local::now().naive_local(),
            config: *config,
            ingest,
            history_records: run.history.len(),
            products: run.history.product_count(),
            analysis,
        }
    }
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::store(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::store(format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::analyze_history;
    use crate::series::History;

    #[test]
    fn summary_reports_insufficient_history() {
        let history = History::new();
        let config = AnalysisConfig::default();
        let run = RunOutput {
            ingest: None,
            merge: None,
            analysis: Some(analyze_history(&history, &config)),
            history,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary_json(&path, &RunSummary::from_run(&run, &config)).unwrap();

        let value: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "ptrend");
        assert_eq!(value["config"]["z_threshold"], 1.5);
        assert_eq!(value["analysis"]["status"], "insufficient_history");
        assert_eq!(value["analysis"]["required"], 3);
        assert!(value.get("ingest").is_none());
    }
}
