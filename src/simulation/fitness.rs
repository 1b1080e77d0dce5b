//! Pellet-seeking fitness and disqualification rules.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::genome::CreatureGenome;
use super::geometric_utils::{finite_or_zero, ground_distance};
use super::ids::GeneId;
use super::params::{FitnessWeights, SimulationConfig};

/// Fitness reported for every frame of a disqualified run.
pub const DISQUALIFIED_FITNESS: f32 = 0.0;

/// Why a run was disqualified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Disqualification {
    /// A muscle oscillates faster than the configured ceiling.
    ExcessiveFrequency {
        /// Offending muscle.
        muscle: GeneId,
        /// `frequency × global multiplier`.
        effective_frequency: f32,
        /// Configured ceiling.
        limit: f32,
    },
}

/// Returns the disqualification that applies to `genome`, if any.
pub fn check_disqualification(
    genome: &CreatureGenome,
    config: &SimulationConfig,
) -> Option<Disqualification> {
    let limit = config.max_allowed_frequency;
    let reason = genome.muscles.iter().find_map(|muscle| {
        let effective_frequency = genome.effective_frequency(muscle);
        (effective_frequency > limit).then_some(Disqualification::ExcessiveFrequency {
            muscle: muscle.id,
            effective_frequency,
            limit,
        })
    })?;
    warn!(genome = %genome.id, ?reason, "creature disqualified");
    Some(reason)
}

/// Individual terms of the fitness sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitnessBreakdown {
    /// Reward for collected pellets.
    pub pellets: f32,
    /// Bonus for standing near the active pellet.
    pub proximity: f32,
    /// Capped reward for distance traveled.
    pub movement: f32,
    /// Penalty for barely moving.
    pub stillness: f32,
}

impl FitnessBreakdown {
    /// Computes each term.
    ///
    /// `pellet_distance` is the ground distance to the active pellet, `None`
    /// when no pellet is waiting.
    pub fn compute(
        weights: &FitnessWeights,
        pellets_collected: usize,
        pellet_distance: Option<f32>,
        distance_traveled: f32,
    ) -> Self {
        let proximity = pellet_distance.map_or(0.0, |d| {
            let max_distance = weights.proximity_max_distance.max(1e-3);
            weights.proximity_weight * (1.0 - d / max_distance).max(0.0)
        });
        let stillness = if distance_traveled < weights.stillness_threshold {
            weights.stillness_penalty
        } else {
            0.0
        };
        Self {
            pellets: pellets_collected as f32 * weights.pellet_weight,
            proximity,
            movement: (distance_traveled * weights.movement_weight).min(weights.movement_cap),
            stillness,
        }
    }

    /// Weighted sum, floored at zero.
    pub fn total(&self) -> f32 {
        finite_or_zero(self.pellets + self.proximity + self.movement - self.stillness).max(0.0)
    }
}

/// Accumulates distance traveled and the per-frame fitness curve.
#[derive(Debug, Clone)]
pub struct FitnessTracker {
    last_center: Vec3,
    distance_traveled: f32,
    curve: Vec<f32>,
}

impl FitnessTracker {
    /// Starts tracking at the initial center of mass.
    pub fn new(start: Vec3, frames: usize) -> Self {
        Self {
            last_center: start,
            distance_traveled: 0.0,
            curve: Vec::with_capacity(frames),
        }
    }

    /// Records one frame and returns its fitness.
    pub fn record(
        &mut self,
        weights: &FitnessWeights,
        center: Vec3,
        pellets_collected: usize,
        pellet_distance: Option<f32>,
    ) -> f32 {
        self.distance_traveled += finite_or_zero(ground_distance(center, self.last_center));
        self.last_center = center;
        let fitness = FitnessBreakdown::compute(
            weights,
            pellets_collected,
            pellet_distance,
            self.distance_traveled,
        )
        .total();
        self.curve.push(fitness);
        fitness
    }

    /// Ground distance the center of mass covered so far.
    pub fn distance_traveled(&self) -> f32 {
        self.distance_traveled
    }

    /// Fitness of the last recorded frame.
    pub fn final_fitness(&self) -> f32 {
        self.curve.last().copied().unwrap_or(0.0)
    }

    /// Consumes the tracker, returning the curve.
    pub fn into_curve(self) -> Vec<f32> {
        self.curve
    }
}

/// Curve of a disqualified run.
pub fn disqualified_curve(frames: usize) -> Vec<f32> {
    vec![DISQUALIFIED_FITNESS; frames]
}
