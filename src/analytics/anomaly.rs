//! Return z-score anomalies.
//!
//! A day is anomalous when its return is far from the product's own mean return,
//! measured in units of the product's own return standard deviation.

use rayon::prelude::*;

use crate::domain::{AnomalyRow, CompletedSeries};
use crate::math::{daily_returns, mean, return_values, round_to, sample_std};

/// Deviations at or below this are floating-point noise around a constant return.
const DEGENERATE_STD: f64 = 1e-12;

/// Flag the days of one series whose `|z|` is strictly above `z_threshold`.
pub fn product_anomalies(series: &CompletedSeries, z_threshold: f64) -> Vec<AnomalyRow> {
    let returns = daily_returns(&series.points);
    let values = return_values(&returns);

    let (Some(m), Some(sd)) = (mean(&values), sample_std(&values)) else {
        return Vec::new();
    };
    if !(sd.is_finite() && sd > DEGENERATE_STD) {
        tracing::debug!(product_id = %series.product_id, sd, "degenerate return distribution, no anomalies");
        return Vec::new();
    }

    returns
        .iter()
        .filter_map(|r| {
            let z = (r.value - m) / sd;
            (z.abs() > z_threshold).then(|| AnomalyRow {
                product_id: series.product_id.clone(),
                date: r.date,
                price: r.price,
                z_score: round_to(z, 2),
            })
        })
        .collect()
}

pub fn detect_anomalies(series: &[CompletedSeries], z_threshold: f64) -> Vec<AnomalyRow> {
    series
        .par_iter()
        .flat_map_iter(|s| product_anomalies(s, z_threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesPoint;
    use chrono::NaiveDate;

    fn series(id: &str, prices: &[f64]) -> CompletedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        CompletedSeries {
            product_id: id.to_string(),
            points: prices
                .iter()
                .zip(start.iter_days())
                .map(|(&price, date)| SeriesPoint {
                    date,
                    price,
                    interpolated: false,
                })
                .collect(),
        }
    }

    fn max_abs_z(s: &CompletedSeries) -> f64 {
        product_anomalies(s, 0.0)
            .iter()
            .map(|a| a.z_score.abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn jump_after_flat_run_is_flagged() {
        // Eight flat returns then a doubling: mean 1/9, std 1/3, z = 8/3.
        let mut prices = vec![1.0; 9];
        prices.push(2.0);
        let s = series("milk", &prices);

        let rows = product_anomalies(&s, 1.5);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, s.points[9].date);
        assert_eq!(rows[0].price, 2.0);
        assert!((rows[0].z_score - 2.67).abs() < 1e-9, "z = {}", rows[0].z_score);
    }

    #[test]
    fn z_equal_to_threshold_is_not_flagged() {
        let s = series("bread", &[2.0, 2.2, 2.0, 2.3, 2.3]);

        // Recompute the largest |z| exactly as the detector does.
        let values = return_values(&daily_returns(&s.points));
        let m = mean(&values).unwrap();
        let std = sample_std(&values).unwrap();
        let boundary = values.iter().map(|v| ((v - m) / std).abs()).fold(0.0, f64::max);

        assert!(product_anomalies(&s, boundary).is_empty());
        assert!(!product_anomalies(&s, boundary - 1e-9).is_empty());
    }

    #[test]
    fn degenerate_distributions_produce_nothing() {
        // Zero std.
        assert!(product_anomalies(&series("salt", &[1.0, 1.0, 1.0, 1.0]), 0.0).is_empty());
        // Single return: std undefined.
        assert!(product_anomalies(&series("rice", &[1.0, 5.0]), 0.0).is_empty());
    }

    #[test]
    fn threshold_is_relative_to_own_volatility() {
        // Same shape at two price scales gives identical z-scores.
        let small = series("a", &[1.0, 1.01, 1.0, 1.01, 1.3]);
        let large = series("b", &[100.0, 101.0, 100.0, 101.0, 130.0]);
        assert!((max_abs_z(&small) - max_abs_z(&large)).abs() <= 0.01);
    }

    #[test]
    fn two_returns_never_exceed_one_over_root_two() {
        // milk = [1, 1, 2]: returns [0, 1], both |z| = 0.7071.
        let s = series("milk", &[1.0, 1.0, 2.0]);
        assert!(product_anomalies(&s, 1.5).is_empty());
        assert_eq!(max_abs_z(&s), 0.71);
    }
}
