//! Formatted terminal output.
//!
//! All formatting lives here so the analytics stay free of presentation code and
//! output changes stay localized.

use std::cmp::Ordering;

use crate::analytics::Analysis;
use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisConfig, AnalysisStatus, AnomalyRow, MetricsRow, SpikeRow};

/// Format the full run report: input/merge counts, then the analysis tables.
pub fn format_run_report(run: &RunOutput, config: &AnalysisConfig, top_n: usize) -> String {
    let mut out = String::new();

    out.push_str("=== ptrend - price series analytics ===\n");
    out.push_str(&format!(
        "History: n={} records | products={}\n",
        run.history.len(),
        run.history.product_count()
    ));

    if let (Some(ingest), Some(merge)) = (&run.ingest, &run.merge) {
        out.push_str(&format!(
            "Input: rows={} | accepted={} | rejected={}\n",
            ingest.raw_rows,
            ingest.accepted,
            ingest.rejected.len()
        ));
        out.push_str(&format!(
            "Merge: appended={} | already stored={} | same-day repeats={}\n",
            merge.appended.len(),
            merge.skipped_existing,
            merge.skipped_duplicate
        ));
        if ingest.accepted == 0 {
            out.push_str("No new data in this batch.\n");
        }
    }

    if let Some(analysis) = &run.analysis {
        out.push_str(&format!(
            "Thresholds: |z| > {:.2} | |daily change| > {:.2}% | min history = {}\n",
            config.z_threshold, config.spike_threshold_pct, config.min_history
        ));
        out.push('\n');
        out.push_str(&format_analysis(analysis, top_n));
    }

    out
}

/// Format the metrics table plus the top-N anomalies and spikes.
pub fn format_analysis(analysis: &Analysis, top_n: usize) -> String {
    let mut out = String::new();

    if let AnalysisStatus::InsufficientHistory { records, required } = analysis.status {
        out.push_str(&format!(
            "Not enough historical data yet (n={records}, need {required}).\n"
        ));
        return out;
    }

    let interpolated: usize = analysis.series.iter().map(|s| s.interpolated_days()).sum();
    out.push_str(&format!(
        "Series: {} products completed | {} interpolated days\n\n",
        analysis.series.len(),
        interpolated
    ));

    out.push_str("Metrics:\n");
    out.push_str(&format_metrics(&analysis.metrics));
    out.push('\n');

    out.push_str(&format!(
        "Anomalies ({} total, top {} by |z|):\n",
        analysis.anomalies.len(),
        top_n.min(analysis.anomalies.len())
    ));
    out.push_str(&format_anomalies(&top_anomalies(&analysis.anomalies, top_n)));
    out.push('\n');

    out.push_str(&format!(
        "Spikes ({} total, top {} by |change|):\n",
        analysis.spikes.len(),
        top_n.min(analysis.spikes.len())
    ));
    out.push_str(&format_spikes(&top_spikes(&analysis.spikes, top_n)));

    out
}

/// Largest `|z|` first; ties keep table order.
pub fn top_anomalies(rows: &[AnomalyRow], top_n: usize) -> Vec<AnomalyRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        b.z_score
            .abs()
            .partial_cmp(&a.z_score.abs())
            .unwrap_or(Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

/// Largest `|pct change|` first; ties keep table order.
pub fn top_spikes(rows: &[SpikeRow], top_n: usize) -> Vec<SpikeRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        b.daily_change_pct
            .abs()
            .partial_cmp(&a.daily_change_pct.abs())
            .unwrap_or(Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

fn format_metrics(rows: &[MetricsRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<24} {:>14} {:>10}", "product_id", "inflation_rate", "volatility").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<14} {:-<10}", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        let vol = r.volatility.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:<24} {:>14.4} {:>10}",
                truncate(&r.product_id, 24),
                r.inflation_rate,
                vol
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn format_anomalies(rows: &[AnomalyRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<24} {:<10} {:>12} {:>8}", "product_id", "date", "price", "z_score").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<10} {:-<12} {:-<8}", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<24} {:<10} {:>12.4} {:>8.2}",
                truncate(&r.product_id, 24),
                r.date,
                r.price,
                r.z_score
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn format_spikes(rows: &[SpikeRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<24} {:<10} {:>12} {:>10}", "product_id", "date", "price", "change_%").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<24} {:-<10} {:-<12} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<24} {:<10} {:>12.4} {:>10.2}",
                truncate(&r.product_id, 24),
                r.date,
                r.price,
                r.daily_change_pct
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
