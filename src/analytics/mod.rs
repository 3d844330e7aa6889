//! Analytics over completed daily series.
//!
//! Every product is analysed independently (in parallel); the three output tables
//! are sorted by `(product_id, date)` afterwards so results are deterministic.

use crate::domain::{
    AnalysisConfig, AnalysisStatus, AnomalyRow, CompletedSeries, MetricsRow, SeriesRow, SpikeRow,
};
use crate::series::{History, ProductHistory, complete_all};

pub mod anomaly;
pub mod metrics;
pub mod spike;

pub use anomaly::*;
pub use metrics::*;
pub use spike::*;

/// All computed outputs of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub status: AnalysisStatus,
    pub series: Vec<CompletedSeries>,
    pub metrics: Vec<MetricsRow>,
    pub anomalies: Vec<AnomalyRow>,
    pub spikes: Vec<SpikeRow>,
}

impl Analysis {
    fn insufficient(records: usize, required: usize) -> Self {
        Self {
            status: AnalysisStatus::InsufficientHistory { records, required },
            series: Vec::new(),
            metrics: Vec::new(),
            anomalies: Vec::new(),
            spikes: Vec::new(),
        }
    }

    /// Flatten the completed series into export rows.
    pub fn series_rows(&self) -> Vec<SeriesRow> {
        self.series
            .iter()
            .flat_map(|s| {
                s.points.iter().map(|p| SeriesRow {
                    product_id: s.product_id.clone(),
                    date: p.date,
                    price: p.price,
                    interpolated: p.interpolated,
                })
            })
            .collect()
    }
}

/// Rebuild every derived table from the current history.
///
/// Nothing here depends on previous runs; the result is a pure function of the
/// history and the thresholds.
pub fn analyze_history(history: &History, config: &AnalysisConfig) -> Analysis {
    if history.len() < config.min_history {
        tracing::info!(
            records = history.len(),
            required = config.min_history,
            "not enough historical data yet"
        );
        return Analysis::insufficient(history.len(), config.min_history);
    }

    let by_product = ProductHistory::from_records(history.records());
    let series = complete_all(&by_product);
    tracing::debug!(
        products = by_product.len(),
        completed = series.len(),
        "completed daily series"
    );

    let mut metrics = compute_metrics(&series);
    let mut anomalies = detect_anomalies(&series, config.z_threshold);
    let mut spikes = detect_spikes(&series, config.spike_threshold_pct);

    metrics.sort_by(|a, b| a.product_id.cmp(&b.product_id));
    anomalies.sort_by(|a, b| a.product_id.cmp(&b.product_id).then(a.date.cmp(&b.date)));
    spikes.sort_by(|a, b| a.product_id.cmp(&b.product_id).then(a.date.cmp(&b.date)));

    Analysis {
        status: AnalysisStatus::Complete,
        series,
        metrics,
        anomalies,
        spikes,
    }
}
