//! Input/output adapters around the analytics core.
//!
//! - raw observation ingest from CSV/JSON (`ingest`)
//! - the persisted history and its run lock (`store`)
//! - output tables (`export`) and the JSON run summary (`summary`)

pub mod export;
pub mod ingest;
pub mod store;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use store::*;
pub use summary::*;
