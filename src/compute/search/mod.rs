//! Genetic search over stack-machine programs.

mod chromosome;
mod engine;
mod fitness;

pub use chromosome::{Chromosome, INVALID_FITNESS, SearchRng};
pub use engine::{EngineError, SearchEngine};
pub use fitness::score;
