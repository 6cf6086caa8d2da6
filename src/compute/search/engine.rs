//! Multi-worker genetic search engine.
//!
//! A fixed number of long-running worker threads each evolve their own
//! population against the shared, fixed sample dataset. Workers exchange
//! best-found chromosomes through per-worker double-buffered slots built from
//! relaxed atomics: the owner writes the back buffer and toggles a flip index,
//! readers clone the other buffer without any lock. A reader racing a publish
//! may observe a mix of words from two chromosomes; every word decodes to a
//! valid gene, so the worst case is a slightly stale or chimeric (but
//! executable) import. That weak consistency is intentional — the slots sit on
//! a path executed millions of times per second and must not grow a mutex.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;

use log::{debug, info};

use crate::compute::ops::Gene;
use crate::schema::{ConfigError, ExtendedSample, SearchConfig};

use super::chromosome::{Chromosome, INVALID_FITNESS, SearchRng};
use super::fitness;

/// Engine construction errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One buffer of a shared best slot. Genes are stored as packed words so a
/// concurrent reader always decodes valid instructions.
struct SlotBuffer {
    genes: Vec<AtomicU64>,
    fitness: AtomicU64,
    generation: AtomicU64,
}

impl SlotBuffer {
    fn new(length: usize) -> Self {
        Self {
            genes: (0..length).map(|_| AtomicU64::new(0)).collect(),
            fitness: AtomicU64::new(INVALID_FITNESS),
            generation: AtomicU64::new(0),
        }
    }
}

/// Per-worker double-buffered best-chromosome slot.
///
/// Written only by the owning worker; readable by any worker. All accesses
/// are relaxed: readers tolerate stale or torn chromosomes by design.
struct SharedSlot {
    buffers: [SlotBuffer; 2],
    /// Index of the buffer currently offered to readers.
    flip: AtomicUsize,
}

impl SharedSlot {
    fn new(length: usize) -> Self {
        Self {
            buffers: [SlotBuffer::new(length), SlotBuffer::new(length)],
            flip: AtomicUsize::new(0),
        }
    }

    /// Owner-side publish: fill the back buffer, then flip it to the front.
    fn publish(&self, chromosome: &Chromosome) {
        let back = 1 - self.flip.load(Ordering::Relaxed);
        let buffer = &self.buffers[back];
        for (word, gene) in buffer.genes.iter().zip(&chromosome.genes) {
            word.store(gene.pack(), Ordering::Relaxed);
        }
        buffer.fitness.store(chromosome.fitness, Ordering::Relaxed);
        buffer
            .generation
            .store(chromosome.generation, Ordering::Relaxed);
        self.flip.store(back, Ordering::Relaxed);
    }

    /// Reader-side clone of the front buffer.
    fn read(&self) -> Chromosome {
        let front = self.flip.load(Ordering::Relaxed);
        let buffer = &self.buffers[front];
        let genes: Vec<Gene> = buffer
            .genes
            .iter()
            .map(|word| Gene::unpack(word.load(Ordering::Relaxed)))
            .collect();
        Chromosome {
            genes,
            fitness: buffer.fitness.load(Ordering::Relaxed),
            generation: buffer.generation.load(Ordering::Relaxed),
        }
    }
}

/// State shared by all workers and the engine surface.
struct Shared {
    config: SearchConfig,
    samples: Vec<ExtendedSample>,
    slots: Vec<SharedSlot>,
    /// Cooperative stop flag, observed at the top of every generation.
    stop: AtomicBool,
    /// Global generation counter, approximate across workers.
    generation: AtomicU64,
}

/// One worker thread: owns its population and RNG exclusively.
struct Worker {
    id: usize,
    shared: Arc<Shared>,
    rng: SearchRng,
    population: Vec<Chromosome>,
    generation: u64,
}

impl Worker {
    fn new(id: usize, shared: Arc<Shared>, seed: u64) -> Self {
        Self {
            id,
            shared,
            rng: SearchRng::new(seed),
            population: Vec::new(),
            generation: 0,
        }
    }

    fn run(mut self) {
        debug!("worker {} starting", self.id);
        self.initialize();
        while !self.shared.stop.load(Ordering::Relaxed) {
            self.step();
        }
        debug!(
            "worker {} stopped after generation {}",
            self.id, self.generation
        );
    }

    /// Fill the population with scored random chromosomes.
    fn initialize(&mut self) {
        let shared = Arc::clone(&self.shared);
        let cfg = &shared.config;
        self.population.clear();
        for _ in 0..cfg.population_size {
            let mut chromosome = self.rng.random_chromosome(
                cfg.chromosome_length,
                cfg.gene_enable_probability,
                0,
            );
            chromosome.fitness = fitness::score(&chromosome.genes, &shared.samples);
            self.population.push(chromosome);
        }
        self.finish_generation();
    }

    /// Evolve one generation in place.
    ///
    /// The population is sorted ascending by fitness on entry. Band layout:
    /// elites first (untouched), then the crossover band (foreign imports in
    /// the leading slots, elite offspring in the rest), then the random band
    /// replacing the worst performers wholesale.
    fn step(&mut self) {
        self.generation += 1;
        let shared = Arc::clone(&self.shared);
        let cfg = &shared.config;

        let size = cfg.population_size;
        let elite = cfg.weights.elite_count(size);
        let random = cfg.weights.random_count(size);
        let breed_start = elite;
        let breed_end = size - random;
        let parent_pool = elite.max(1);
        let foreign = if shared.slots.len() > 1 {
            cfg.foreign_slots.min(breed_end - breed_start)
        } else {
            0
        };

        for i in breed_start..breed_end {
            let mut child = if i - breed_start < foreign {
                self.import_foreign(i - breed_start)
            } else {
                let pa = self.rng.next_seed() as usize % parent_pool;
                let pb = self.rng.next_seed() as usize % parent_pool;
                let mut child = self.rng.crossover(
                    &self.population[pa],
                    &self.population[pb],
                    self.generation,
                );
                self.rng
                    .mutate(&mut child, &cfg.mutation, cfg.gene_enable_probability);
                child
            };
            child.fitness = fitness::score(&child.genes, &shared.samples);
            self.population[i] = child;
        }

        for i in breed_end..size {
            let mut fresh = self.rng.random_chromosome(
                cfg.chromosome_length,
                cfg.gene_enable_probability,
                self.generation,
            );
            fresh.fitness = fitness::score(&fresh.genes, &shared.samples);
            self.population[i] = fresh;
        }

        self.finish_generation();
    }

    /// Copy another worker's most recently shared best, round-robin over the
    /// other slots. The read is lock-free and may be stale or torn; the
    /// import is re-scored like any other candidate.
    fn import_foreign(&mut self, slot_index: usize) -> Chromosome {
        let workers = self.shared.slots.len();
        let mut pick = (self.id + 1 + slot_index) % workers;
        if pick == self.id {
            pick = (pick + 1) % workers;
        }
        let mut chromosome = self.shared.slots[pick].read();
        chromosome.generation = self.generation;
        chromosome
    }

    /// Sort, publish the local best, bump the global counter, and signal
    /// convergence on a perfect score.
    fn finish_generation(&mut self) {
        self.population.sort_by_key(|c| c.fitness);
        let best = &self.population[0];
        self.shared.slots[self.id].publish(best);
        self.shared.generation.fetch_add(1, Ordering::Relaxed);
        if best.fitness == 0 {
            info!(
                "worker {} found a perfect chromosome at generation {}",
                self.id, self.generation
            );
            self.shared.stop.store(true, Ordering::Relaxed);
        }
    }
}

/// Public surface of the search: spawns workers at construction, reports
/// progress, and joins them on [`SearchEngine::stop`].
pub struct SearchEngine {
    shared: Arc<Shared>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl SearchEngine {
    /// Validate the configuration and start the worker threads.
    pub fn new(
        config: SearchConfig,
        samples: Vec<ExtendedSample>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let base_seed = config.random_seed.unwrap_or_else(rand::random);
        let mut seeder = SearchRng::new(base_seed);

        let slots = (0..config.workers)
            .map(|_| SharedSlot::new(config.chromosome_length))
            .collect();
        let shared = Arc::new(Shared {
            config,
            samples,
            slots,
            stop: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        });

        let mut handles = Vec::with_capacity(shared.config.workers);
        for id in 0..shared.config.workers {
            let worker = Worker::new(id, Arc::clone(&shared), seeder.next_seed());
            let spawned = thread::Builder::new()
                .name(format!("search-{}", id))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    shared.stop.store(true, Ordering::Relaxed);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(err.into());
                }
            }
        }

        info!(
            "search started: {} workers, population {}, {} samples",
            shared.config.workers,
            shared.config.population_size,
            shared.samples.len()
        );

        Ok(Self { shared, handles })
    }

    /// Global generation count, approximate across workers.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Relaxed)
    }

    /// Best chromosome across all workers' shared slots, or `None` until a
    /// worker has published an executable program.
    pub fn best(&self) -> Option<Chromosome> {
        self.shared
            .slots
            .iter()
            .map(SharedSlot::read)
            .filter(|c| c.fitness != INVALID_FITNESS)
            .min_by_key(|c| c.fitness)
    }

    /// True once any worker has published a perfect (zero-fitness) chromosome.
    pub fn converged(&self) -> bool {
        self.best().is_some_and(|c| c.fitness == 0)
    }

    /// Signal all workers to stop and join them. The only blocking call.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ops::Op;
    use crate::compute::slope::Slope;
    use crate::schema::Sample;
    use std::time::{Duration, Instant};

    /// Dataset already satisfied by the evaluator's X-major scaffolding: the
    /// single-instruction program `push x` reproduces it exactly.
    fn scaffold_dataset() -> Vec<ExtendedSample> {
        let slope = Slope::setup(0, 0, 15, 6, true);
        (0..15)
            .map(|x| {
                let y = x * 6 / 15;
                let sample = Sample {
                    x,
                    y,
                    width: 15,
                    height: 6,
                    coverage: slope.aa_coverage(x, y),
                };
                ExtendedSample::new(sample, true, true)
            })
            .collect()
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = SearchConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            SearchEngine::new(config, scaffold_dataset()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_shared_slot_round_trip() {
        let slot = SharedSlot::new(3);

        // Fresh slots report the invalid sentinel.
        assert_eq!(slot.read().fitness, INVALID_FITNESS);

        let chromosome = Chromosome {
            genes: vec![
                Gene::new(Op::PushX, true),
                Gene::new(Op::PushConst(-7), true),
                Gene::new(Op::Add, false),
            ],
            fitness: 42,
            generation: 9,
        };
        slot.publish(&chromosome);
        assert_eq!(slot.read(), chromosome);

        // A second publish lands in the other buffer.
        let mut better = chromosome.clone();
        better.fitness = 5;
        slot.publish(&better);
        assert_eq!(slot.read().fitness, 5);
    }

    #[test]
    fn test_search_converges_and_halts_all_workers() {
        let config = SearchConfig {
            workers: 2,
            population_size: 400,
            chromosome_length: 2,
            random_seed: Some(42),
            gene_enable_probability: 0.5,
            ..Default::default()
        };
        let samples = scaffold_dataset();
        let engine = SearchEngine::new(config, samples.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(60);
        while !engine.converged() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert!(engine.converged(), "search did not converge in time");
        assert!(engine.generation() > 0);

        let best = engine.best().unwrap();
        assert_eq!(best.fitness, 0);
        assert_eq!(fitness::score(&best.genes, &samples), 0);

        // Convergence halts every worker; stop() must return promptly.
        engine.stop();
    }
}
