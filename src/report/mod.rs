//! Reporting: terminal tables and run summaries.

pub mod format;

pub use format::*;
