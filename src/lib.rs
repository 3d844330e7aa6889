//! `price-trends` library crate.
//!
//! The binary (`ptrend`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the analytics can run against any `HistoryStore`, not only the CSV file

pub mod analytics;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod series;
