//! Explicit simulation session owned by the caller.
//!
//! The session holds everything that persists between generations: the
//! configuration, the live population, id and innovation bookkeeping and the
//! statistics history. Randomness for generation `g` is derived from
//! `(seed, g)`, so a saved session resumes exactly where it stopped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::brain::InnovationRegistry;
use super::error::{EvolutionError, SessionError, ValidationError};
use super::evolution::EvolutionEngine;
use super::genome::{CreatureGenome, generate_random_genome};
use super::ids::IdAllocator;
use super::params::SimulationConfig;
use super::reproduction::{GenerationStats, StatsHistory};
use super::rng::{STREAM_GENESIS, STREAM_REPRODUCTION, derive_rng};
use super::simulator::{CreatureSimulationResult, simulate_population};

/// A running evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSession {
    config: SimulationConfig,
    population: Vec<CreatureGenome>,
    generation: u32,
    ids: IdAllocator,
    innovations: InnovationRegistry,
    history: StatsHistory,
}

impl EvolutionSession {
    /// Validates `config` and creates generation 0.
    pub fn new(config: SimulationConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let mut ids = IdAllocator::new();
        let mut innovations = InnovationRegistry::new();
        let mut rng = derive_rng(config.seed, STREAM_GENESIS, 0);
        let population = (0..config.population_size)
            .map(|_| generate_random_genome(&config, &mut ids, &mut innovations, &mut rng))
            .collect();

        info!(
            population = config.population_size,
            controller = config.controller.label(),
            seed = config.seed,
            "session created"
        );

        Ok(Self {
            config,
            population,
            generation: 0,
            ids,
            innovations,
            history: StatsHistory::default(),
        })
    }

    /// Run configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current population.
    pub fn population(&self) -> &[CreatureGenome] {
        &self.population
    }

    /// Current generation number.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Statistics of evolved generations.
    pub fn history(&self) -> &StatsHistory {
        &self.history
    }

    /// Innovation registry shared by variable-topology networks.
    pub fn innovations(&self) -> &InnovationRegistry {
        &self.innovations
    }

    /// Simulates the current population.
    pub fn evaluate(&self) -> Result<Vec<CreatureSimulationResult>, ValidationError> {
        simulate_population(&self.population, &self.config, self.generation)
    }

    /// Breeds the next generation from `results` and advances the counter.
    pub fn evolve(
        &mut self,
        results: &[CreatureSimulationResult],
    ) -> Result<GenerationStats, EvolutionError> {
        let scored: Vec<(CreatureGenome, f32)> = results
            .iter()
            .map(|r| (r.genome.clone(), r.final_fitness))
            .collect();

        let mut rng = derive_rng(self.config.seed, STREAM_REPRODUCTION, u64::from(self.generation));
        let (population, mut stats) = EvolutionEngine::new(&self.config).next_generation(
            &scored,
            self.generation,
            &mut self.ids,
            &mut self.innovations,
            &mut rng,
        )?;
        stats.disqualified = results.iter().filter(|r| r.is_disqualified()).count();

        self.population = population;
        self.generation += 1;
        self.history.record(stats.clone());
        debug!(
            generation = self.generation,
            genomes_issued = self.ids.genomes_issued(),
            innovations = self.innovations.innovations_issued(),
            "population replaced"
        );
        Ok(stats)
    }

    /// Evaluates the current population and evolves it.
    pub fn run_generation(&mut self) -> Result<GenerationStats, EvolutionError> {
        let results = self.evaluate()?;
        self.evolve(&results)
    }

    /// Saves the session to a JSON file.
    pub fn save_to_file(&self, path: &str) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Loads a session from a JSON file.
    pub fn load_from_file(path: &str) -> Result<Self, SessionError> {
        let json = std::fs::read_to_string(path)?;
        let session: Self = serde_json::from_str(&json)?;
        session.config.validate()?;
        for genome in &session.population {
            genome.validate(&session.config)?;
        }
        info!(
            generation = session.generation,
            genomes_issued = session.ids.genomes_issued(),
            "session loaded"
        );
        Ok(session)
    }
}
