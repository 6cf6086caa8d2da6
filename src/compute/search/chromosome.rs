//! Chromosome representation and genetic operators.
//!
//! Provides random generation, crossover, and mutation over fixed-length gene
//! sequences. All operators preserve sequence length; variable effective
//! program length comes from the per-gene enabled flag.

use rand::prelude::*;

use crate::compute::ops::{Gene, OP_COUNT, Op};
use crate::schema::MutationConfig;

/// Sentinel fitness for a chromosome whose program failed to evaluate.
pub const INVALID_FITNESS: u64 = u64::MAX;

/// Range of literal constants produced by random gene generation. Wide enough
/// to reach the interesting shift counts and coverage constants; the domain
/// pushes cover the large fixed-point values.
const CONST_RANGE: std::ops::RangeInclusive<i32> = -256..=256;

/// A candidate program: a fixed-length gene sequence with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    pub genes: Vec<Gene>,
    /// Total absolute error against the sample set; lower is better.
    /// [`INVALID_FITNESS`] marks a non-executable program.
    pub fitness: u64,
    /// Generation this chromosome was created in.
    pub generation: u64,
}

impl Chromosome {
    pub fn new(genes: Vec<Gene>, generation: u64) -> Self {
        Self {
            genes,
            fitness: INVALID_FITNESS,
            generation,
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// Random number generator wrapper for chromosome operations.
///
/// Each worker thread owns exactly one; generator state is never shared.
pub struct SearchRng {
    rng: StdRng,
}

impl SearchRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Generate a random gene; enabled with probability `enable_probability`.
    pub fn random_gene(&mut self, enable_probability: f64) -> Gene {
        let opcode = self.rng.gen_range(0..OP_COUNT);
        let op = match Op::from_opcode(opcode, 0) {
            Op::PushConst(_) => Op::PushConst(self.rng.gen_range(CONST_RANGE)),
            op => op,
        };
        Gene::new(op, self.rng.gen_bool(enable_probability))
    }

    /// Generate a fresh random chromosome.
    pub fn random_chromosome(
        &mut self,
        length: usize,
        enable_probability: f64,
        generation: u64,
    ) -> Chromosome {
        let genes = (0..length)
            .map(|_| self.random_gene(enable_probability))
            .collect();
        Chromosome::new(genes, generation)
    }

    /// Breed a child from two parents, choosing one-point or uniform gene-wise
    /// crossover with equal probability. Parents must share a length.
    pub fn crossover(&mut self, a: &Chromosome, b: &Chromosome, generation: u64) -> Chromosome {
        debug_assert_eq!(a.len(), b.len());
        let genes = if self.rng.gen_bool(0.5) {
            // One-point: head from a, tail from b.
            let point = self.rng.gen_range(0..=a.len());
            a.genes[..point]
                .iter()
                .chain(&b.genes[point..])
                .copied()
                .collect()
        } else {
            // Uniform: each gene from either parent.
            a.genes
                .iter()
                .zip(&b.genes)
                .map(|(&ga, &gb)| if self.rng.gen_bool(0.5) { ga } else { gb })
                .collect()
        };
        Chromosome::new(genes, generation)
    }

    /// Apply the mutation operators, each independently gated by its own
    /// probability.
    pub fn mutate(
        &mut self,
        chromosome: &mut Chromosome,
        config: &MutationConfig,
        enable_probability: f64,
    ) {
        if self.rng.gen_bool(config.random) {
            let idx = self.rng.gen_range(0..chromosome.len());
            chromosome.genes[idx] = self.random_gene(enable_probability);
        }
        if self.rng.gen_bool(config.splice) {
            self.splice_segment(&mut chromosome.genes);
        }
        if self.rng.gen_bool(config.reverse) {
            self.reverse_segment(&mut chromosome.genes);
        }
    }

    /// Relocate a contiguous gene range to a random position, preserving the
    /// relative order of both the moved and the displaced genes. No-op for
    /// segments shorter than two genes.
    fn splice_segment(&mut self, genes: &mut Vec<Gene>) {
        let (start, len) = self.pick_segment(genes.len());
        if len < 2 {
            return;
        }
        let segment: Vec<Gene> = genes.drain(start..start + len).collect();
        let dest = self.rng.gen_range(0..=genes.len());
        genes.splice(dest..dest, segment);
    }

    /// Reverse a contiguous gene range in place. No-op for segments shorter
    /// than two genes.
    fn reverse_segment(&mut self, genes: &mut [Gene]) {
        let (start, len) = self.pick_segment(genes.len());
        if len < 2 {
            return;
        }
        genes[start..start + len].reverse();
    }

    /// Pick a random `(start, len)` segment within a sequence.
    fn pick_segment(&mut self, total: usize) -> (usize, usize) {
        if total == 0 {
            return (0, 0);
        }
        let start = self.rng.gen_range(0..total);
        let len = self.rng.gen_range(0..=total - start);
        (start, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mutation_always() -> MutationConfig {
        MutationConfig {
            random: 1.0,
            splice: 1.0,
            reverse: 1.0,
        }
    }

    #[test]
    fn test_random_chromosome_length_and_flags() {
        let mut rng = SearchRng::new(42);
        let c = rng.random_chromosome(32, 0.0, 3);
        assert_eq!(c.len(), 32);
        assert_eq!(c.fitness, INVALID_FITNESS);
        assert_eq!(c.generation, 3);
        assert!(c.genes.iter().all(|g| !g.enabled));

        let c = rng.random_chromosome(32, 1.0, 0);
        assert!(c.genes.iter().all(|g| g.enabled));
    }

    #[test]
    fn test_crossover_preserves_length() {
        let mut rng = SearchRng::new(42);
        let a = rng.random_chromosome(16, 0.8, 0);
        let b = rng.random_chromosome(16, 0.8, 0);

        for _ in 0..50 {
            let child = rng.crossover(&a, &b, 1);
            assert_eq!(child.len(), 16);
            // Every gene comes from one of the parents.
            for (i, gene) in child.genes.iter().enumerate() {
                assert!(*gene == a.genes[i] || *gene == b.genes[i]);
            }
        }
    }

    #[test]
    fn test_mutation_preserves_length() {
        let mut rng = SearchRng::new(7);
        let mut c = rng.random_chromosome(24, 0.8, 0);
        for _ in 0..100 {
            rng.mutate(&mut c, &mutation_always(), 0.8);
            assert_eq!(c.len(), 24);
        }
    }

    #[test]
    fn test_splice_preserves_multiset() {
        let mut rng = SearchRng::new(11);
        let original = rng.random_chromosome(24, 0.8, 0);
        let mut c = original.clone();
        for _ in 0..100 {
            rng.splice_segment(&mut c.genes);
        }
        let mut before: Vec<u64> = original.genes.iter().map(Gene::pack).collect();
        let mut after: Vec<u64> = c.genes.iter().map(Gene::pack).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn test_segment_ops_noop_on_short_sequences() {
        let mut rng = SearchRng::new(3);
        let original = rng.random_chromosome(1, 0.8, 0);

        let mut c = original.clone();
        for _ in 0..20 {
            rng.splice_segment(&mut c.genes);
            rng.reverse_segment(&mut c.genes);
        }
        assert_eq!(c.genes, original.genes);
    }

    #[test]
    fn test_reverse_is_involution() {
        let mut rng = SearchRng::new(5);
        let original = rng.random_chromosome(8, 0.8, 0);

        // Reversing the full range twice restores the sequence.
        let mut c = original.clone();
        c.genes[0..8].reverse();
        c.genes[0..8].reverse();
        assert_eq!(c.genes, original.genes);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let mut a = SearchRng::new(99);
        let mut b = SearchRng::new(99);
        let ca = a.random_chromosome(16, 0.8, 0);
        let cb = b.random_chromosome(16, 0.8, 0);
        assert_eq!(ca.genes, cb.genes);
    }
}
