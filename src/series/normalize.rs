//! Observation normalization.
//!
//! Turns raw records into validated `Observation`s. A bad record is rejected on
//! its own and reported as a `RowError`; it never fails the batch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::{Observation, RawObservation, RowError};

/// Normalizer output: the accepted observations plus what was dropped and why.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub observations: Vec<Observation>,
    pub rejected: Vec<RowError>,
}

impl NormalizedBatch {
    /// No usable observations: the caller treats this as "no new data".
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Validate a batch of raw records.
pub fn normalize_observations(raw: &[RawObservation]) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        observations: Vec::with_capacity(raw.len()),
        rejected: Vec::new(),
    };

    for record in raw {
        match normalize_one(record) {
            Ok(obs) => batch.observations.push(obs),
            Err(message) => batch.rejected.push(RowError {
                line: record.line,
                product_id: record
                    .product_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                message,
            }),
        }
    }

    batch
}

/// Validate a single raw record.
pub fn normalize_one(raw: &RawObservation) -> Result<Observation, String> {
    let product_id = raw
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing `product_id`.".to_string())?;

    let price = parse_price(raw.price.as_deref())?;

    let timestamp = raw
        .timestamp
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing timestamp.".to_string())?;
    let observed_at = parse_timestamp(timestamp)?;

    Ok(Observation {
        product_id: product_id.to_string(),
        price,
        observed_at,
        date: observed_at.date(),
    })
}

fn parse_price(raw: Option<&str>) -> Result<f64, String> {
    let s = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing `price`.".to_string())?;

    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Non-numeric price '{s}'."))?;

    if !v.is_finite() {
        return Err(format!("Non-finite price '{s}'."));
    }
    if v < 0.0 {
        return Err(format!("Negative price '{s}'."));
    }
    Ok(v)
}

/// Parse an observation timestamp.
///
/// Offsets are assumed to be normalized upstream, so for offset-carrying inputs
/// the wall-clock value as written is kept (and therefore its calendar date).
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }

    const OFFSET_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];
    for fmt in OFFSET_FMTS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.naive_local());
        }
    }

    const NAIVE_FMTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for fmt in NAIVE_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN));
    }

    Err(format!("Unparseable timestamp '{s}'."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(line: usize, id: &str, price: &str, ts: &str) -> RawObservation {
        RawObservation {
            line,
            product_id: Some(id.to_string()),
            price: Some(price.to_string()),
            timestamp: Some(ts.to_string()),
            source_url: None,
        }
    }

    #[test]
    fn accepts_scraper_timestamps() {
        let ts = parse_timestamp("2024-01-05T10:15:30.123456").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());

        let ts = parse_timestamp("2024-01-05 23:59:59").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());

        let ts = parse_timestamp("2024-01-05").unwrap();
        assert_eq!(ts, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_time(NaiveTime::MIN));
    }

    #[test]
    fn offset_timestamps_keep_their_written_date() {
        // 23:30 at +05:00 is still the 5th as written, even though it is the 5th 18:30 UTC.
        let ts = parse_timestamp("2024-01-05T23:30:00+05:00").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());

        let ts = parse_timestamp("2024-01-06T00:10:00-03:00").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    }

    #[test]
    fn bad_rows_are_dropped_not_fatal() {
        let batch = normalize_observations(&[
            raw(2, "milk", "1.25", "2024-01-05T08:00:00"),
            raw(3, "milk", "N/A", "2024-01-06T08:00:00"),
            raw(4, "bread", "2.10", "yesterday"),
            raw(5, "  ", "2.10", "2024-01-06"),
            raw(6, "eggs", "-1", "2024-01-06"),
            raw(7, "eggs", "inf", "2024-01-06"),
            raw(8, " eggs ", " 3.40 ", "2024-01-06"),
        ]);

        assert_eq!(batch.observations.len(), 2);
        assert_eq!(batch.observations[1].product_id, "eggs");
        assert_eq!(batch.observations[1].price, 3.4);

        let lines: Vec<usize> = batch.rejected.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6, 7]);
        assert_eq!(batch.rejected[0].product_id.as_deref(), Some("milk"));
        assert_eq!(batch.rejected[2].product_id, None);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let record = RawObservation {
            line: 9,
            product_id: Some("tea".to_string()),
            ..RawObservation::default()
        };
        assert_eq!(normalize_one(&record).unwrap_err(), "Missing `price`.");
    }

    #[test]
    fn empty_input_is_empty_output() {
        let batch = normalize_observations(&[]);
        assert!(batch.is_empty());
        assert!(batch.rejected.is_empty());
    }

    #[test]
    fn zero_price_is_valid() {
        let obs = normalize_one(&raw(2, "sample", "0", "2024-02-01")).unwrap();
        assert_eq!(obs.price, 0.0);
    }
}
