//! From raw observations to completed daily series.
//!
//! - validation of raw records (`normalize`)
//! - the deduplicated, append-only history (`merge`)
//! - per-product daily resampling with interpolation (`complete`)

pub mod complete;
pub mod merge;
pub mod normalize;

pub use complete::*;
pub use merge::*;
pub use normalize::*;
