//! # Softbody Evo - Soft-Body Creature Evolution
//!
//! Evolves populations of mass-spring creatures that learn to crawl toward
//! food pellets. Muscles are driven by per-muscle oscillators or by neural
//! controllers, and genomes are selected, recombined and mutated generation
//! over generation.
//!
//! ## Features
//!
//! - Node/muscle body genomes with spanning-tree generation
//! - Semi-implicit Euler mass-spring physics with ground contact and friction
//! - Fixed two-layer networks and NEAT-style variable-topology networks
//! - Composable sensor pipeline (pellet, clock, proprioception)
//! - Truncation selection, rank-weighted breeding, decayed mutation rates
//! - Parallel population evaluation with rayon
//! - Seeded, reproducible runs and JSON session checkpoints
//!
//! ## Core Modules
//!
//! - [`simulation::genome`] - Genome model
//! - [`simulation::physics`] - Mass-spring integrator
//! - [`simulation::brain`] - Neural controllers
//! - [`simulation::senses`] - Sensor pipeline
//! - [`simulation::simulator`] - Per-creature and population runs
//! - [`simulation::evolution`] - Selection and reproduction
//! - [`simulation::session`] - Caller-owned evolution session

/// Core simulation logic and data structures.
pub mod simulation {
    /// Neural controllers: fixed perceptrons and variable-topology networks.
    pub mod brain;
    /// Recombination of parent genomes.
    pub mod crossover;
    /// Error taxonomy.
    pub mod error;
    /// Selection, rank weights and the generation loop.
    pub mod evolution;
    /// Fitness terms, curve tracking and disqualification.
    pub mod fitness;
    /// Creature genomes and their invariants.
    pub mod genome;
    /// Ground-plane geometry, sampling and numeric guards.
    pub mod geometric_utils;
    /// Integer handles for genomes and genes.
    pub mod ids;
    /// Value and structural mutation.
    pub mod mutation;
    /// Simulation parameters.
    pub mod params;
    /// Sequential food pellets.
    pub mod pellet;
    /// Mass-spring physics.
    pub mod physics;
    /// Compact frame records for external replay.
    pub mod replay;
    /// Generation statistics tracking.
    pub mod reproduction;
    /// Seeded random streams.
    pub mod rng;
    /// Sensor pipeline feeding neural controllers.
    pub mod senses;
    /// Caller-owned evolution session.
    pub mod session;
    /// Creature and population simulation runs.
    pub mod simulator;
}
