//! Daily series completion.
//!
//! Each product's history is resampled onto every calendar day between its first
//! and last record. Missing days are linearly interpolated between the nearest
//! known neighbours; values are never carried forward or zero-filled.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::domain::{CompletedSeries, HistoricalRecord, SeriesPoint};

/// Minimum number of recorded days for a product to get a completed series.
pub const MIN_POINTS_FOR_SERIES: usize = 2;

/// Per-product view of the history, sorted by date once on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductHistory {
    by_product: BTreeMap<String, Vec<(NaiveDate, f64)>>,
}

impl ProductHistory {
    pub fn from_records(records: &[HistoricalRecord]) -> Self {
        let mut by_product: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for r in records {
            by_product
                .entry(r.product_id.clone())
                .or_default()
                .push((r.date, r.price));
        }
        for points in by_product.values_mut() {
            // Stable sort, then keep the first record of any repeated day.
            points.sort_by_key(|(date, _)| *date);
            points.dedup_by_key(|(date, _)| *date);
        }
        Self { by_product }
    }

    pub fn len(&self) -> usize {
        self.by_product.len()
    }

    pub fn get(&self, product_id: &str) -> Option<&[(NaiveDate, f64)]> {
        self.by_product.get(product_id).map(Vec::as_slice)
    }
}

/// Every calendar day from `start` to `end` inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Complete one product's sorted, day-unique known points.
///
/// Returns `None` with fewer than two points (no slope to interpolate along) or
/// when the dates are not strictly increasing.
pub fn complete_points(known: &[(NaiveDate, f64)]) -> Option<Vec<SeriesPoint>> {
    if known.len() < MIN_POINTS_FOR_SERIES {
        return None;
    }
    if known.windows(2).any(|w| w[0].0 >= w[1].0) {
        return None;
    }
    let (first, _) = known[0];
    let (last, _) = known[known.len() - 1];

    let mut out = Vec::with_capacity((last - first).num_days() as usize + 1);
    let mut left = 0usize;

    for date in date_range(first, last) {
        while left + 1 < known.len() && known[left + 1].0 <= date {
            left += 1;
        }

        let (left_date, left_price) = known[left];
        if left_date == date {
            out.push(SeriesPoint {
                date,
                price: left_price,
                interpolated: false,
            });
            continue;
        }

        // `left_date < date < right_date` holds here because `date <= last`.
        let (right_date, right_price) = known[left + 1];
        let span = (right_date - left_date).num_days() as f64;
        let f = (date - left_date).num_days() as f64 / span;
        out.push(SeriesPoint {
            date,
            price: left_price + f * (right_price - left_price),
            interpolated: true,
        });
    }

    Some(out)
}

/// Complete every product that has enough history, in product order.
pub fn complete_all(history: &ProductHistory) -> Vec<CompletedSeries> {
    history
        .by_product
        .par_iter()
        .filter_map(|(product_id, known)| match complete_points(known) {
            Some(points) => Some(CompletedSeries {
                product_id: product_id.clone(),
                points,
            }),
            None => {
                tracing::debug!(
                    product_id = %product_id,
                    records = known.len(),
                    "skipping product: not enough history for a daily series"
                );
                None
            }
        })
        .collect()
}
