//! Inflation rate and volatility per product.

use rayon::prelude::*;

use crate::domain::{CompletedSeries, MetricsRow};
use crate::math::{daily_returns, mean, return_values, round_to, sample_std};

/// Summary statistics of one completed series.
///
/// Returns `None` when the series yields no returns.
pub fn product_metrics(series: &CompletedSeries) -> Option<MetricsRow> {
    let returns = return_values(&daily_returns(&series.points));
    let inflation = mean(&returns)?;
    let volatility = sample_std(&returns);

    Some(MetricsRow {
        product_id: series.product_id.clone(),
        inflation_rate: round_to(inflation, 4),
        volatility: volatility.map(|v| round_to(v, 4)),
    })
}

pub fn compute_metrics(series: &[CompletedSeries]) -> Vec<MetricsRow> {
    series
        .par_iter()
        .filter_map(|s| {
            let row = product_metrics(s);
            if row.is_none() {
                tracing::debug!(product_id = %s.product_id, "no returns, metrics skipped");
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesPoint;
    use chrono::NaiveDate;

    fn series(id: &str, prices: &[f64]) -> CompletedSeries {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
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
    fn alternating_ten_percent_moves() {
        // Returns: +10%, -10%, +10%.
        let row = product_metrics(&series("coffee", &[100.0, 110.0, 99.0, 108.9])).unwrap();
        assert_eq!(row.inflation_rate, 0.0333);
        assert_eq!(row.volatility, Some(0.1155));
    }

    #[test]
    fn flat_prices_have_zero_inflation_and_volatility() {
        let row = product_metrics(&series("salt", &[0.5, 0.5, 0.5])).unwrap();
        assert_eq!(row.inflation_rate, 0.0);
        assert_eq!(row.volatility, Some(0.0));
    }

    #[test]
    fn single_return_has_no_volatility() {
        let row = product_metrics(&series("rice", &[2.0, 2.2])).unwrap();
        assert_eq!(row.inflation_rate, 0.1);
        assert_eq!(row.volatility, None);
    }

    #[test]
    fn products_without_returns_are_skipped() {
        // Both returns start from a zero price and are undefined.
        let rows = compute_metrics(&[
            series("free", &[0.0, 0.0]),
            series("milk", &[1.0, 1.0, 2.0]),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, "milk");
        assert_eq!(rows[0].inflation_rate, 0.5);
        assert_eq!(rows[0].volatility, Some(0.7071));
    }
}
