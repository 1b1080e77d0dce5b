//! Generational evolution: select, reproduce, advance.
//!
//! Truncation selection keeps the fittest fraction unchanged; the open slots
//! are filled with offspring of rank-weighted survivors, either by crossover
//! or by clone-then-mutate.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use tracing::{debug, info};

use super::brain::InnovationRegistry;
use super::crossover::crossover;
use super::error::EvolutionError;
use super::genome::{CreatureGenome, clone_genome};
use super::ids::IdAllocator;
use super::mutation::{MutationSettings, mutate_genome};
use super::params::{RateDecay, SimulationConfig, survivor_count};
use super::reproduction::GenerationStats;

/// Generations over which the neural mutation rate decays.
pub const DECAY_GENERATIONS: f32 = 50.0;

/// Indices of the survivors of truncation selection, best first.
///
/// Sorting is stable, so equal fitness keeps input order; non-finite fitness
/// ranks last.
pub fn select_survivors(fitness: &[f32], cull_percentage: f32) -> Vec<usize> {
    if fitness.is_empty() {
        return Vec::new();
    }
    let key = |i: usize| {
        let f = fitness[i];
        if f.is_finite() { f } else { f32::NEG_INFINITY }
    };
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    order.truncate(survivor_count(fitness.len(), cull_percentage));
    order
}

/// Selection probability of each rank: `(n - k) / Σ(n - k)`, rank 0 best.
pub fn rank_weights(n: usize) -> Vec<f32> {
    let total = (n * (n + 1) / 2) as f32;
    (0..n).map(|k| (n - k) as f32 / total).collect()
}

/// Neural weight mutation rate for `generation`.
///
/// Starts at `min(0.5, 5 · end_rate)` and decays toward `end_rate`: linearly
/// until generation 50, or exponentially with `τ = 50 / 3`.
pub fn neural_mutation_rate(generation: u32, end_rate: f32, decay: RateDecay) -> f32 {
    let start = (end_rate * 5.0).min(0.5);
    let g = generation as f32;
    match decay {
        RateDecay::Off => end_rate,
        RateDecay::Linear => {
            let progress = (g / DECAY_GENERATIONS).min(1.0);
            start + (end_rate - start) * progress
        }
        RateDecay::Exponential => {
            let tau = DECAY_GENERATIONS / 3.0;
            end_rate + (start - end_rate) * (-g / tau).exp()
        }
    }
}

/// Produces the next generation from scored genomes.
#[derive(Debug, Clone, Copy)]
pub struct EvolutionEngine<'a> {
    config: &'a SimulationConfig,
}

impl<'a> EvolutionEngine<'a> {
    /// Creates an engine for `config`.
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    /// Runs select → reproduce → advance on one scored generation.
    ///
    /// # Arguments
    ///
    /// * `scored` - Each genome with the fitness it realized
    /// * `generation` - Generation that produced `scored`
    /// * `ids` - Population id allocator
    /// * `innovations` - Population innovation registry
    /// * `rng` - Reproduction randomness
    ///
    /// # Returns
    ///
    /// Exactly `population_size` genomes and the statistics of `scored`.
    pub fn next_generation<R: Rng + ?Sized>(
        &self,
        scored: &[(CreatureGenome, f32)],
        generation: u32,
        ids: &mut IdAllocator,
        innovations: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Result<(Vec<CreatureGenome>, GenerationStats), EvolutionError> {
        let config = self.config;
        config.validate()?;
        if scored.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }

        let fitness: Vec<f32> = scored.iter().map(|(_, f)| *f).collect();
        let mut survivors = select_survivors(&fitness, config.cull_percentage);
        survivors.truncate(config.population_size);

        let settings = MutationSettings::for_generation(config, generation);
        let mut stats = GenerationStats::from_fitness(generation, &fitness);
        stats.survivors = survivors.len();
        stats.neural_mutation_rate = settings.neural_rate;

        let mut next: Vec<CreatureGenome> = survivors
            .iter()
            .map(|&i| {
                let mut genome = scored[i].0.clone();
                genome.survival_streak += 1;
                genome
            })
            .collect();

        let weights = rank_weights(survivors.len());
        let picker = WeightedIndex::new(&weights).map_err(|_| EvolutionError::EmptyPopulation)?;
        let can_cross = config.use_crossover && survivors.len() >= 2;

        while next.len() < config.population_size {
            let first = picker.sample(rng);
            if can_cross && rng.random::<f32>() < config.crossover_rate {
                let mut second = picker.sample(rng);
                while second == first {
                    second = picker.sample(rng);
                }
                // Lower rank is fitter and provides the structure.
                let (lead, mate) = (first.min(second), first.max(second));
                let (parent, parent_fitness) = &scored[survivors[lead]];
                let mut child = crossover(parent, &scored[survivors[mate]].0, config, ids, rng);
                child.ancestry = parent.ancestry_for_child(*parent_fitness);
                stats.crossover_offspring += 1;
                next.push(child);
            } else {
                let (parent, parent_fitness) = &scored[survivors[first]];
                let mut child = clone_genome(parent, ids);
                if config.use_mutation {
                    child = mutate_genome(&child, config, &settings, ids, innovations, rng);
                    stats.mutated_offspring += 1;
                } else {
                    stats.cloned_offspring += 1;
                }
                child.ancestry = parent.ancestry_for_child(*parent_fitness);
                next.push(child);
            }
        }

        debug!(
            survivors = stats.survivors,
            crossover = stats.crossover_offspring,
            mutated = stats.mutated_offspring,
            cloned = stats.cloned_offspring,
            "reproduction complete"
        );
        info!(
            generation,
            best = stats.best_fitness,
            mean = stats.mean_fitness,
            "generation evolved"
        );

        Ok((next, stats))
    }
}
