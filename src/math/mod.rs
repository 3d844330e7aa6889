//! Numeric helpers shared by the analytics: returns, moments, rounding.

pub mod moments;
pub mod returns;

pub use moments::*;
pub use returns::*;
