//! Proprioception senses: the creature's awareness of its own body.
//!
//! Blocks are sized by `max_muscles` / `max_nodes` so every genome in a
//! population shares one input width; unused slots stay zero.

use ndarray::Array1;

use super::SensorContext;
use super::sense::Sense;
use crate::simulation::genome::CreatureGenome;
use crate::simulation::params::SimulationConfig;
use crate::simulation::physics::MAX_NODE_SPEED;

/// One strain value per muscle slot: `(length - rest) / rest`, clamped to
/// `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MuscleStrainSense;

impl Sense for MuscleStrainSense {
    fn sense(&self, context: &SensorContext<'_>) -> Array1<f32> {
        let mut outputs = Array1::zeros(self.input_size(context.config));
        let body = context.body;
        for k in 0..body.springs.len().min(outputs.len()) {
            let rest = context
                .rest_lengths
                .get(k)
                .copied()
                .unwrap_or(body.springs[k].base_length);
            if rest > 0.0 {
                outputs[k] = ((body.spring_length(k) - rest) / rest).clamp(-1.0, 1.0);
            }
        }
        outputs
    }

    fn input_size(&self, config: &SimulationConfig) -> usize {
        config.max_muscles
    }

    fn real_input_size(&self, genome: &CreatureGenome, config: &SimulationConfig) -> usize {
        genome.muscles.len().min(config.max_muscles)
    }

    fn name(&self) -> &'static str {
        "MuscleStrain"
    }
}

/// Three velocity components per node slot, scaled by the speed limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeVelocitySense;

impl Sense for NodeVelocitySense {
    fn sense(&self, context: &SensorContext<'_>) -> Array1<f32> {
        let mut outputs = Array1::zeros(self.input_size(context.config));
        let slots = context.config.max_nodes;
        for (i, node) in context.body.nodes.iter().take(slots).enumerate() {
            let v = node.velocity / MAX_NODE_SPEED;
            outputs[i * 3] = v.x;
            outputs[i * 3 + 1] = v.y;
            outputs[i * 3 + 2] = v.z;
        }
        outputs
    }

    fn input_size(&self, config: &SimulationConfig) -> usize {
        config.max_nodes * 3
    }

    fn real_input_size(&self, genome: &CreatureGenome, config: &SimulationConfig) -> usize {
        genome.nodes.len().min(config.max_nodes) * 3
    }

    fn name(&self) -> &'static str {
        "NodeVelocity"
    }
}

/// One contact flag per node slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundContactSense;

impl Sense for GroundContactSense {
    fn sense(&self, context: &SensorContext<'_>) -> Array1<f32> {
        let mut outputs = Array1::zeros(self.input_size(context.config));
        let slots = context.config.max_nodes;
        for (i, node) in context.body.nodes.iter().take(slots).enumerate() {
            if node.on_ground {
                outputs[i] = 1.0;
            }
        }
        outputs
    }

    fn input_size(&self, config: &SimulationConfig) -> usize {
        config.max_nodes
    }

    fn real_input_size(&self, genome: &CreatureGenome, config: &SimulationConfig) -> usize {
        genome.nodes.len().min(config.max_nodes)
    }

    fn name(&self) -> &'static str {
        "GroundContact"
    }
}
