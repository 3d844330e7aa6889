//! Shared domain types.
//!
//! Row types are serializable so the same structs flow from the analytics code
//! straight into the CSV/JSON sinks with a stable column order (field order).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A raw price reading exactly as the data source handed it over.
///
/// Nothing here is validated yet; every field may be missing or malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawObservation {
    /// 1-based position in the source (CSV line or JSON array index + 1).
    pub line: usize,
    pub product_id: Option<String>,
    pub price: Option<String>,
    pub timestamp: Option<String>,
    pub source_url: Option<String>,
}

/// A validated observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub product_id: String,
    pub price: f64,
    pub observed_at: NaiveDateTime,
    /// Calendar date of `observed_at`.
    pub date: NaiveDate,
}

/// One persisted price per product per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub product_id: String,
    pub date: NaiveDate,
    pub price: f64,
    pub observed_at: NaiveDateTime,
}

impl HistoricalRecord {
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.product_id.as_str(), self.date)
    }
}

impl From<Observation> for HistoricalRecord {
    fn from(obs: Observation) -> Self {
        Self {
            product_id: obs.product_id,
            date: obs.date,
            price: obs.price,
            observed_at: obs.observed_at,
        }
    }
}

/// A row-level rejection encountered while normalizing a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub product_id: Option<String>,
    pub message: String,
}

/// A single day of a completed series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub price: f64,
    /// `true` when the day had no historical record and the price was interpolated.
    pub interpolated: bool,
}

/// A product's history resampled onto every calendar day between its first and
/// last observation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSeries {
    pub product_id: String,
    pub points: Vec<SeriesPoint>,
}

impl CompletedSeries {
    pub fn interpolated_days(&self) -> usize {
        self.points.iter().filter(|p| p.interpolated).count()
    }
}

/// Flat row of the optional series export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    pub product_id: String,
    pub date: NaiveDate,
    pub price: f64,
    pub interpolated: bool,
}

/// Per-product summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub product_id: String,
    /// Mean daily return, rounded to 4 decimals.
    pub inflation_rate: f64,
    /// Sample standard deviation of daily returns, rounded to 4 decimals.
    ///
    /// `None` when the series has a single return (an empty CSV cell).
    pub volatility: Option<f64>,
}

/// A day whose return is unusual relative to the product's own returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    pub product_id: String,
    pub date: NaiveDate,
    pub price: f64,
    /// Rounded to 2 decimals.
    pub z_score: f64,
}

/// A day whose single-step percent change exceeds the absolute threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeRow {
    pub product_id: String,
    pub date: NaiveDate,
    pub price: f64,
    /// Percent change from the previous day, rounded to 4 decimals.
    pub daily_change_pct: f64,
}

pub const DEFAULT_Z_THRESHOLD: f64 = 1.5;
pub const DEFAULT_SPIKE_THRESHOLD_PCT: f64 = 10.0;
pub const DEFAULT_MIN_HISTORY: usize = 3;

/// Thresholds for one analysis run.
///
/// This is derived from CLI flags / environment (plus defaults) and passed
/// explicitly into each analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// `|z|` must be strictly greater than this to flag an anomaly.
    pub z_threshold: f64,
    /// `|pct change|` must be strictly greater than this to flag a spike.
    pub spike_threshold_pct: f64,
    /// Minimum number of historical records (all products) before analysing at all.
    pub min_history: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            spike_threshold_pct: DEFAULT_SPIKE_THRESHOLD_PCT,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}

impl AnalysisConfig {
    /// Reject thresholds that would make every comparison meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.z_threshold.is_finite() && self.z_threshold >= 0.0) {
            return Err(format!(
                "Invalid z-score threshold {} (must be finite and >= 0).",
                self.z_threshold
            ));
        }
        if !(self.spike_threshold_pct.is_finite() && self.spike_threshold_pct >= 0.0) {
            return Err(format!(
                "Invalid spike threshold {}% (must be finite and >= 0).",
                self.spike_threshold_pct
            ));
        }
        Ok(())
    }
}

/// Whether the analysis ran or was skipped for lack of history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum AnalysisStatus {
    Complete,
    InsufficientHistory { records: usize, required: usize },
}

impl AnalysisStatus {
    pub fn is_complete(self) -> bool {
        matches!(self, AnalysisStatus::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let config = AnalysisConfig::default();
        assert_eq!(config.z_threshold, 1.5);
        assert_eq!(config.spike_threshold_pct, 10.0);
        assert_eq!(config.min_history, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_or_nan_thresholds() {
        let bad_z = AnalysisConfig {
            z_threshold: -1.0,
            ..AnalysisConfig::default()
        };
        assert!(bad_z.validate().is_err());

        let bad_spike = AnalysisConfig {
            spike_threshold_pct: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(bad_spike.validate().is_err());
    }
}
