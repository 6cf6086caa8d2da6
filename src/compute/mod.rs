//! Compute module - slope interpolation, program evaluation, and search.

mod eval;
mod ops;
pub mod slope;

pub mod search;

pub use eval::*;
pub use ops::*;
pub use slope::Slope;
