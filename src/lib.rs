//! Slopehunt - reverse-engineering a rasterizer's antialiasing coverage formula.
//!
//! An undocumented 3D rasterizer computes per-pixel antialiasing coverage with
//! fixed-point arithmetic nobody has fully decoded. This crate models the known
//! parts of the interpolation exactly and searches for the rest: a genetic
//! algorithm evolves short stack-machine programs until one reproduces a
//! captured dataset of hardware measurements.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: search configuration and dataset sample types
//! - `compute`: the slope model, the program evaluator, and the search engine
//!
//! # Example
//!
//! ```rust,no_run
//! use slopehunt::{
//!     compute::search::SearchEngine,
//!     schema::{ExtendedSample, Sample, SearchConfig},
//! };
//!
//! // Samples come from an external dataset loader.
//! let samples: Vec<ExtendedSample> = vec![ExtendedSample::new(
//!     Sample { x: 0, y: 0, width: 15, height: 6, coverage: 6 },
//!     true,
//!     true,
//! )];
//!
//! let engine = SearchEngine::new(SearchConfig::default(), samples).unwrap();
//! while !engine.converged() {
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     println!("generation {}", engine.generation());
//! }
//!
//! if let Some(best) = engine.best() {
//!     println!("{}", slopehunt::compute::disassemble(&best.genes));
//! }
//! engine.stop();
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::search::{Chromosome, SearchEngine};
pub use compute::{EvalContext, Gene, Op, Slope, disassemble};
pub use schema::{ExtendedSample, Sample, SearchConfig};
