//! Raw observation ingest.
//!
//! Reads the data source's export into `RawObservation`s without judging the
//! values: a row with a garbage price is still handed on, and the normalizer
//! decides what to drop. Only the file-level schema is enforced here.
//!
//! Supported inputs:
//! - CSV with headers (`product_id,price,scraped_at,url` as the scraper writes it)
//! - a JSON array of objects with the same keys (`price` may be a number)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Deserialize;

use crate::domain::{RawObservation, RowError};
use crate::error::AppError;

/// Accepted names for the timestamp column, in order of preference.
const TIMESTAMP_COLUMNS: [&str; 3] = ["observed_at", "scraped_at", "timestamp"];
const SOURCE_COLUMNS: [&str; 2] = ["url", "source_url"];

/// Ingest output: raw records plus rows that could not even be read.
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub records: Vec<RawObservation>,
    pub row_errors: Vec<RowError>,
}

/// Load raw observations from a CSV or JSON file (chosen by extension).
pub fn read_raw_observations(path: &Path) -> Result<RawBatch, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::usage(format!("Failed to open input '{}': {e}", path.display())))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json { read_json(file) } else { read_csv(file) }
}

pub fn read_csv<R: Read>(input: R) -> Result<RawBatch, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::usage(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let columns = resolve_columns(&header_map)?;

    let mut batch = RawBatch::default();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, and the header occupies line 1.
        let line = idx + 2;
        match result {
            Ok(record) => batch.records.push(RawObservation {
                line,
                product_id: get_optional(&record, Some(columns.product_id)),
                price: get_optional(&record, Some(columns.price)),
                timestamp: get_optional(&record, Some(columns.timestamp)),
                source_url: get_optional(&record, columns.source_url),
            }),
            Err(e) => batch.row_errors.push(RowError {
                line,
                product_id: None,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    Ok(batch)
}

pub fn read_json<R: Read>(input: R) -> Result<RawBatch, AppError> {
    let values: Vec<serde_json::Value> = serde_json::from_reader(input)
        .map_err(|e| AppError::usage(format!("Input JSON must be an array of objects: {e}")))?;

    let mut batch = RawBatch::default();
    for (idx, value) in values.into_iter().enumerate() {
        let line = idx + 1;
        match serde_json::from_value::<JsonObservation>(value) {
            Ok(obs) => batch.records.push(obs.into_raw(line)),
            Err(e) => batch.row_errors.push(RowError {
                line,
                product_id: None,
                message: format!("Invalid JSON record: {e}"),
            }),
        }
    }

    Ok(batch)
}

#[derive(Debug, Deserialize)]
struct JsonObservation {
    #[serde(default)]
    product_id: Option<String>,
    #[serde(default)]
    price: Option<JsonPrice>,
    #[serde(default, alias = "scraped_at", alias = "timestamp")]
    observed_at: Option<String>,
    #[serde(default, alias = "url")]
    source_url: Option<String>,
}

/// Prices arrive either as scraped text or as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonPrice {
    Number(f64),
    Text(String),
}

impl JsonObservation {
    fn into_raw(self, line: usize) -> RawObservation {
        RawObservation {
            line,
            product_id: self.product_id,
            price: self.price.map(|p| match p {
                JsonPrice::Number(v) => v.to_string(),
                JsonPrice::Text(s) => s,
            }),
            timestamp: self.observed_at,
            source_url: self.source_url,
        }
    }
}

struct Columns {
    product_id: usize,
    price: usize,
    timestamp: usize,
    source_url: Option<usize>,
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<Columns, AppError> {
    let product_id = *header_map
        .get("product_id")
        .ok_or_else(|| AppError::usage("Missing required column: `product_id`"))?;
    let price = *header_map
        .get("price")
        .ok_or_else(|| AppError::usage("Missing required column: `price`"))?;
    let timestamp = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|name| header_map.get(*name).copied())
        .ok_or_else(|| {
            AppError::usage("Missing timestamp column: expected one of `observed_at`, `scraped_at`, `timestamp`")
        })?;
    let source_url = SOURCE_COLUMNS.iter().find_map(|name| header_map.get(*name).copied());

    Ok(Columns {
        product_id,
        price,
        timestamp,
        source_url,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_optional(record: &StringRecord, idx: Option<usize>) -> Option<String> {
    record
        .get(idx?)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
