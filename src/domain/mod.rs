//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and validated observations (`RawObservation`, `Observation`)
//! - the persisted history row (`HistoricalRecord`)
//! - completed daily series (`CompletedSeries`, `SeriesPoint`)
//! - output table rows (`MetricsRow`, `AnomalyRow`, `SpikeRow`, `SeriesRow`)
//! - run configuration (`AnalysisConfig`)

pub mod types;

pub use types::*;
