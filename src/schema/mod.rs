//! Schema module - configuration and dataset sample types.

mod config;
mod sample;

pub use config::*;
pub use sample::*;
