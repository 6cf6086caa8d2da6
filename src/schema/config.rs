//! Configuration types for the genetic search.

use serde::{Deserialize, Serialize};

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of worker threads, one population each.
    pub workers: usize,
    /// Chromosomes per population.
    pub population_size: usize,
    /// Genes per chromosome. Fixed for the whole run; effective program
    /// length varies through the per-gene enabled flag.
    pub chromosome_length: usize,
    /// Base RNG seed; picked at random when absent. Worker seeds derive from
    /// it, so a fixed seed gives a reproducible run.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Relative sizes of the elite, random-regeneration and crossover bands.
    pub weights: BandWeights,
    /// Per-chromosome mutation probabilities.
    pub mutation: MutationConfig,
    /// Probability that a freshly generated gene starts enabled.
    pub gene_enable_probability: f64,
    /// Crossover slots filled from other workers' shared best chromosomes
    /// instead of local breeding.
    pub foreign_slots: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            population_size: 1000,
            chromosome_length: 32,
            random_seed: None,
            weights: BandWeights::default(),
            mutation: MutationConfig::default(),
            gene_enable_probability: 0.8,
            foreign_slots: 2,
        }
    }
}

/// Weighted partition of each population into generation bands.
///
/// Band sizes are `population * weight / total`; the crossover band absorbs
/// the rounding remainder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandWeights {
    /// Best performers carried over untouched.
    pub elite: u32,
    /// Slots regenerated with fresh random chromosomes.
    pub random: u32,
    /// Slots bred from elite parents (and foreign imports).
    pub crossover: u32,
}

impl Default for BandWeights {
    fn default() -> Self {
        Self {
            elite: 10,
            random: 20,
            crossover: 70,
        }
    }
}

impl BandWeights {
    pub fn total(&self) -> u64 {
        self.elite as u64 + self.random as u64 + self.crossover as u64
    }

    /// Number of elite slots for a population of `size`.
    pub fn elite_count(&self, size: usize) -> usize {
        (size as u64 * self.elite as u64 / self.total()) as usize
    }

    /// Number of random-regeneration slots for a population of `size`.
    pub fn random_count(&self, size: usize) -> usize {
        (size as u64 * self.random as u64 / self.total()) as usize
    }

    /// Number of crossover slots for a population of `size`.
    pub fn crossover_count(&self, size: usize) -> usize {
        size - self.elite_count(size) - self.random_count(size)
    }
}

/// Per-chromosome mutation probabilities, each gating its operator
/// independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Replace one gene with a freshly generated one.
    pub random: f64,
    /// Relocate a contiguous gene range, preserving relative order.
    pub splice: f64,
    /// Reverse a contiguous gene range in place.
    pub reverse: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            random: 0.7,
            splice: 0.3,
            reverse: 0.3,
        }
    }
}

impl SearchConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        if self.population_size == 0 {
            return Err(ConfigError::InvalidPopulation);
        }
        if self.chromosome_length == 0 {
            return Err(ConfigError::InvalidChromosomeLength);
        }
        if self.weights.total() == 0 {
            return Err(ConfigError::ZeroWeights);
        }
        for (name, value) in [
            ("mutation.random", self.mutation.random),
            ("mutation.splice", self.mutation.splice),
            ("mutation.reverse", self.mutation.reverse),
            ("gene_enable_probability", self.gene_enable_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        let band = self.weights.crossover_count(self.population_size);
        if self.foreign_slots > band {
            return Err(ConfigError::ForeignSlotsExceedBand {
                slots: self.foreign_slots,
                band,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Worker count must be non-zero")]
    InvalidWorkers,
    #[error("Population size must be non-zero")]
    InvalidPopulation,
    #[error("Chromosome length must be non-zero")]
    InvalidChromosomeLength,
    #[error("Band weights must not all be zero")]
    ZeroWeights,
    #[error("Probability {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("{slots} foreign slots exceed the crossover band of {band}")]
    ForeignSlotsExceedBand { slots: usize, band: usize },
}
