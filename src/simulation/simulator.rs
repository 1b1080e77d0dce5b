//! Runs creatures through a full simulated trial.
//!
//! A creature's run is strictly sequential; a population is dispatched over
//! the rayon pool with results collected in input order.

use glam::Vec3;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ValidationError;
use super::fitness::{Disqualification, FitnessTracker, check_disqualification, disqualified_curve};
use super::genome::{CreatureGenome, MuscleGene};
use super::geometric_utils::ground_distance;
use super::ids::GeneId;
use super::params::SimulationConfig;
use super::pellet::{PelletData, PelletField};
use super::physics::{BodyState, contracted_rest_length, oscillator_signal};
use super::rng::{STREAM_PELLETS, derive_rng};
use super::senses::{PelletReading, Perception, SensorContext};

/// Snapshot of a body after one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFrame {
    /// Simulated time at the end of the frame.
    pub time: f32,
    /// Node positions in genome node order.
    pub positions: Vec<(GeneId, Vec3)>,
    /// Mass-weighted center.
    pub center_of_mass: Vec3,
    /// Pellet waiting to be collected, if any.
    pub active_pellet: Option<usize>,
}

/// Outcome of one creature's trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureSimulationResult {
    /// Genome that was simulated.
    pub genome: CreatureGenome,
    /// Recorded frames.
    pub frames: Vec<SimulationFrame>,
    /// Fitness at the end of the run.
    pub final_fitness: f32,
    /// Pellets collected.
    pub pellets_collected: usize,
    /// Ground distance covered by the center of mass.
    pub distance_traveled: f32,
    /// Fitness after every frame.
    pub fitness_curve: Vec<f32>,
    /// Every pellet spawned during the run.
    pub pellets: Vec<PelletData>,
    /// Set when the run was disqualified.
    pub disqualification: Option<Disqualification>,
    /// Per-frame muscle activation signals, when recording is enabled.
    pub activations: Option<Vec<Vec<f32>>>,
}

impl CreatureSimulationResult {
    /// True when the run was disqualified.
    pub fn is_disqualified(&self) -> bool {
        self.disqualification.is_some()
    }
}

/// Seed of the pellet layout shared by every creature of a generation.
pub fn pellet_seed(config: &SimulationConfig, generation: u32) -> u64 {
    derive_rng(config.seed, STREAM_PELLETS, u64::from(generation)).random()
}

/// Oscillator bias from the muscle's sensory channels.
pub fn sensory_bias(muscle: &MuscleGene, reading: &PelletReading) -> f32 {
    let mut bias = 0.0;
    if let Some(dir) = muscle.direction_bias {
        bias += dir.strength * dir.axis.dot(reading.direction);
    }
    if let Some(vel) = muscle.velocity_bias {
        bias += vel.strength * vel.axis.dot(reading.velocity_direction);
    }
    if let Some(dist) = muscle.distance_bias {
        bias += dist.strength * dist.value * reading.normalized_distance;
    }
    bias
}

/// Simulates one creature.
///
/// # Arguments
///
/// * `genome` - Genome to simulate; rejected if it fails validation
/// * `config` - Shared run configuration
/// * `pellet_seed` - Seed of the pellet layout
///
/// # Returns
///
/// The full trajectory, fitness curve and pellet log.
pub fn simulate_creature(
    genome: &CreatureGenome,
    config: &SimulationConfig,
    pellet_seed: u64,
) -> Result<CreatureSimulationResult, ValidationError> {
    genome.validate(config)?;

    let frames = config.frame_count();
    let disqualification = check_disqualification(genome, config);
    let neural = genome
        .controller
        .brain()?
        .map(|brain| (brain, Perception::from_config(config)));

    let mut body = BodyState::from_genome(genome)?;
    let mut pellets = PelletField::new(config, pellet_seed);
    pellets.spawn_next(body.center_of_mass(), 0);

    let mut tracker = FitnessTracker::new(body.center_of_mass(), frames);
    let mut rest_lengths: Vec<f32> = body.springs.iter().map(|s| s.base_length).collect();
    let mut signals = vec![0.0f32; genome.muscles.len()];
    let mut activations = config.record_activations.then(|| Vec::with_capacity(frames));
    let mut recorded = Vec::with_capacity(frames);

    for frame in 0..frames {
        let time = frame as f32 * config.time_step;
        let reading = PelletReading::measure(&body, &pellets, config);

        match &neural {
            Some((brain, perception)) => {
                let context = SensorContext {
                    config,
                    genome,
                    body: &body,
                    rest_lengths: &rest_lengths,
                    reading,
                    time,
                };
                let outputs = brain.think(&perception.perceive(&context));
                for (k, signal) in signals.iter_mut().enumerate() {
                    *signal = outputs.get(k).copied().unwrap_or(0.0);
                }
            }
            None => {
                for (signal, muscle) in signals.iter_mut().zip(&genome.muscles) {
                    let bias = sensory_bias(muscle, &reading);
                    *signal = oscillator_signal(muscle, genome.global_frequency_multiplier, time, bias);
                }
            }
        }

        for ((rest, muscle), &signal) in rest_lengths.iter_mut().zip(&genome.muscles).zip(&signals) {
            *rest = contracted_rest_length(muscle.rest_length, signal, muscle.amplitude);
        }

        body.advance_frame(&rest_lengths, config);
        pellets.check_collection(&body, frame);

        let center_of_mass = body.center_of_mass();
        let pellet_distance = pellets.active().map(|p| ground_distance(p.position, center_of_mass));
        tracker.record(&config.fitness, center_of_mass, pellets.collected(), pellet_distance);

        if let Some(log) = activations.as_mut() {
            log.push(signals.clone());
        }
        recorded.push(SimulationFrame {
            time: time + config.time_step,
            positions: genome
                .nodes
                .iter()
                .zip(&body.nodes)
                .map(|(gene, node)| (gene.id, node.position))
                .collect(),
            center_of_mass,
            active_pellet: pellets.active_index(),
        });
    }

    if body.anomalies() > 0 {
        warn!(genome = %genome.id, anomalies = body.anomalies(), "neutralized non-finite physics state");
    }

    let distance_traveled = tracker.distance_traveled();
    let (final_fitness, fitness_curve) = if disqualification.is_some() {
        (0.0, disqualified_curve(frames))
    } else {
        (tracker.final_fitness(), tracker.into_curve())
    };
    let pellets_collected = pellets.collected();

    debug!(
        genome = %genome.id,
        fitness = final_fitness,
        pellets = pellets_collected,
        distance = distance_traveled,
        "creature simulated"
    );

    Ok(CreatureSimulationResult {
        genome: genome.clone(),
        frames: recorded,
        final_fitness,
        pellets_collected,
        distance_traveled,
        fitness_curve,
        pellets: pellets.into_pellets(),
        disqualification,
        activations,
    })
}

/// Simulates every genome of a generation in parallel.
///
/// All creatures share the pellet layout of `generation`. Results are in the
/// same order as `genomes`.
pub fn simulate_population(
    genomes: &[CreatureGenome],
    config: &SimulationConfig,
    generation: u32,
) -> Result<Vec<CreatureSimulationResult>, ValidationError> {
    let seed = pellet_seed(config, generation);
    genomes
        .par_iter()
        .map(|genome| simulate_creature(genome, config, seed))
        .collect()
}
