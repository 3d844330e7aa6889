//! Absolute day-over-day spikes.
//!
//! Unlike the z-score detector this ignores the product's normal behaviour: any
//! single-day move larger than the configured percentage is flagged.

use rayon::prelude::*;

use crate::domain::{CompletedSeries, SpikeRow};
use crate::math::{daily_returns, round_to};

/// Slack on the threshold so a decimal move of exactly the threshold
/// (e.g. `1.00 -> 1.10`) is not flagged due to binary rounding.
const PCT_TOLERANCE: f64 = 1e-9;
/// Output precision of `daily_change_pct`.
const PCT_DECIMALS: i32 = 4;

/// Flag the days of one series whose `|pct change|` is strictly above `threshold_pct`.
pub fn product_spikes(series: &CompletedSeries, threshold_pct: f64) -> Vec<SpikeRow> {
    daily_returns(&series.points)
        .into_iter()
        .filter_map(|r| {
            let pct = r.pct();
            (pct.abs() > threshold_pct + PCT_TOLERANCE).then(|| SpikeRow {
                product_id: series.product_id.clone(),
                date: r.date,
                price: r.price,
                daily_change_pct: round_to(pct, PCT_DECIMALS),
            })
        })
        .collect()
}

pub fn detect_spikes(series: &[CompletedSeries], threshold_pct: f64) -> Vec<SpikeRow> {
    series
        .par_iter()
        .flat_map_iter(|s| product_spikes(s, threshold_pct))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesPoint;
    use chrono::NaiveDate;

    fn series(id: &str, prices: &[f64]) -> CompletedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 8, 1).unwrap();
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

    #[test]
    fn exactly_threshold_is_not_a_spike() {
        assert!(product_spikes(&series("milk", &[1.00, 1.10]), 10.0).is_empty());
        assert!(product_spikes(&series("milk", &[100.0, 110.0]), 10.0).is_empty());
        assert!(product_spikes(&series("milk", &[100.0, 90.0]), 10.0).is_empty());
    }

    #[test]
    fn just_above_threshold_is_a_spike() {
        let rows = product_spikes(&series("milk", &[100.0, 110.01]), 10.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_change_pct, 10.01);
        assert_eq!(rows[0].price, 110.01);
    }

    #[test]
    fn moves_below_output_precision_still_count() {
        let rows = product_spikes(&series("milk", &[100.0, 110.00004]), 10.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_change_pct, 10.0);
    }

    #[test]
    fn drops_are_flagged_by_magnitude() {
        let rows = product_spikes(&series("eggs", &[4.0, 3.0, 3.1]), 10.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_change_pct, -25.0);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 8, 2).unwrap());
    }

    #[test]
    fn spikes_ignore_historical_volatility() {
        // A product that always moves 20% still spikes every day.
        let rows = product_spikes(&series("fx", &[1.0, 1.2, 0.96, 1.152]), 10.0);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn doubling_is_one_hundred_percent() {
        let rows = detect_spikes(&[series("milk", &[1.0, 1.0, 2.0])], 10.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].daily_change_pct, 100.0);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 8, 3).unwrap());
    }
}
