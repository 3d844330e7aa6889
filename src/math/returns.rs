//! Day-over-day returns of a completed series.

use chrono::NaiveDate;

use crate::domain::SeriesPoint;

/// The fractional change from the previous day, attached to the day it lands on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyReturn {
    pub date: NaiveDate,
    /// Price on `date` (the "current" side of the return).
    pub price: f64,
    /// `(price[i] - price[i-1]) / price[i-1]`.
    pub value: f64,
}

impl DailyReturn {
    pub fn pct(&self) -> f64 {
        self.value * 100.0
    }
}

/// Compute `(price[i] - price[i-1]) / price[i-1]` for every consecutive pair.
///
/// The first day has no return. A pair whose previous price is zero has no
/// finite return and is left out.
pub fn daily_returns(points: &[SeriesPoint]) -> Vec<DailyReturn> {
    points
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (pair[0], pair[1]);
            let value = (curr.price - prev.price) / prev.price;
            value.is_finite().then_some(DailyReturn {
                date: curr.date,
                price: curr.price,
                value,
            })
        })
        .collect()
}

pub fn return_values(returns: &[DailyReturn]) -> Vec<f64> {
    returns.iter().map(|r| r.value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, price: f64) -> SeriesPoint {
        SeriesPoint {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            price,
            interpolated: false,
        }
    }

    #[test]
    fn returns_land_on_the_later_day() {
        let points = [point(1, 100.0), point(2, 110.0), point(3, 99.0)];
        let r = daily_returns(&points);
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].date, points[1].date);
        assert!((r[0].value - 0.1).abs() < 1e-12);
        assert!((r[1].value + 0.1).abs() < 1e-12);
        assert_eq!(r[1].price, 99.0);
    }

    #[test]
    fn zero_previous_price_is_skipped() {
        let points = [point(1, 0.0), point(2, 5.0), point(3, 10.0)];
        let r = daily_returns(&points);
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].date, points[2].date);
        assert!((r[0].pct() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn single_point_has_no_returns() {
        assert!(daily_returns(&[point(1, 3.0)]).is_empty());
    }
}
