//! Export the per-run tables to CSV.
//!
//! Every table always gets its header row, even when it has no rows, so
//! downstream consumers see a stable schema. Files are written to a temporary
//! sibling and renamed into place.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analytics::Analysis;
use crate::error::AppError;

pub const METRICS_FILE: &str = "price_metrics.csv";
pub const ANOMALIES_FILE: &str = "price_anomalies.csv";
pub const SPIKES_FILE: &str = "price_spikes.csv";
pub const SERIES_FILE: &str = "price_series.csv";

pub const METRICS_COLUMNS: [&str; 3] = ["product_id", "inflation_rate", "volatility"];
pub const ANOMALY_COLUMNS: [&str; 4] = ["product_id", "date", "price", "z_score"];
pub const SPIKE_COLUMNS: [&str; 4] = ["product_id", "date", "price", "daily_change_pct"];
pub const SERIES_COLUMNS: [&str; 4] = ["product_id", "date", "price", "interpolated"];

/// Paths of the tables written by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTables {
    pub metrics: PathBuf,
    pub anomalies: PathBuf,
    pub spikes: PathBuf,
    pub series: Option<PathBuf>,
}

/// Write the metrics, anomaly, and spike tables (and optionally the series).
pub fn write_analysis(out_dir: &Path, analysis: &Analysis, include_series: bool) -> Result<WrittenTables, AppError> {
    fs::create_dir_all(out_dir)
        .map_err(|e| AppError::store(format!("Failed to create output dir '{}': {e}", out_dir.display())))?;

    let written = WrittenTables {
        metrics: out_dir.join(METRICS_FILE),
        anomalies: out_dir.join(ANOMALIES_FILE),
        spikes: out_dir.join(SPIKES_FILE),
        series: include_series.then(|| out_dir.join(SERIES_FILE)),
    };

    write_table(&written.metrics, &METRICS_COLUMNS, &analysis.metrics)?;
    write_table(&written.anomalies, &ANOMALY_COLUMNS, &analysis.anomalies)?;
    write_table(&written.spikes, &SPIKE_COLUMNS, &analysis.spikes)?;
    if let Some(path) = &written.series {
        write_table(path, &SERIES_COLUMNS, &analysis.series_rows())?;
    }

    Ok(written)
}

/// Write one table: an explicit header, then one serialized row per item.
pub fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<(), AppError> {
    let tmp = path.with_extension("csv.tmp");
    let file = File::create(&tmp)
        .map_err(|e| AppError::store(format!("Failed to create '{}': {e}", tmp.display())))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(columns)
        .map_err(|e| AppError::store(format!("Failed to write header of '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::store(format!("Failed to write row of '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::store(format!("Failed to flush '{}': {e}", path.display())))?;
    drop(writer);

    fs::rename(&tmp, path)
        .map_err(|e| AppError::store(format!("Failed to move '{}' into place: {e}", path.display())))?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}
