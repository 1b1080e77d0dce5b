//! Perception system that combines multiple senses into controller inputs.

use ndarray::{Array1, s};

use super::SensorContext;
use super::clock::ClockSense;
use super::pellet_sense::PelletSense;
use super::proprioception::{GroundContactSense, MuscleStrainSense, NodeVelocitySense};
use super::sense::Sense;
use crate::simulation::genome::CreatureGenome;
use crate::simulation::geometric_utils::finite_or_zero;
use crate::simulation::params::{SimulationConfig, TimeEncoding};

/// Manages multiple senses and combines them into network inputs.
///
/// The perception system:
/// 1. Queries each sense for its outputs
/// 2. Concatenates all sensory outputs in order
/// 3. Replaces non-finite values with zero
pub struct Perception {
    /// Ordered list of senses that contribute to perception
    senses: Vec<Box<dyn Sense>>,
}

impl Perception {
    /// Creates a new perception system with the given senses.
    ///
    /// # Arguments
    ///
    /// * `senses` - Vector of boxed sense implementations
    ///
    /// # Returns
    ///
    /// A new perception system that will query senses in the order given.
    pub fn new(senses: Vec<Box<dyn Sense>>) -> Self {
        Self { senses }
    }

    /// Builds the pipeline enabled by `config`: pellet sense first, then the
    /// clock and the proprioception blocks that are switched on.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut senses: Vec<Box<dyn Sense>> = vec![Box::new(PelletSense)];
        if config.neural.time_encoding != TimeEncoding::None {
            senses.push(Box::new(ClockSense));
        }
        let flags = config.neural.proprioception;
        if flags.muscle_strain {
            senses.push(Box::new(MuscleStrainSense));
        }
        if flags.node_velocity {
            senses.push(Box::new(NodeVelocitySense));
        }
        if flags.ground_contact {
            senses.push(Box::new(GroundContactSense));
        }
        Self::new(senses)
    }

    /// Process all senses and return combined network inputs.
    ///
    /// # Arguments
    ///
    /// * `context` - State of the current frame
    ///
    /// # Returns
    ///
    /// A 1D array containing all sensory activations concatenated in order.
    pub fn perceive(&self, context: &SensorContext<'_>) -> Array1<f32> {
        let total_size = self.total_input_size(context.config);
        let mut combined_inputs = Array1::zeros(total_size);

        let mut offset = 0;
        for sense in &self.senses {
            let sense_size = sense.input_size(context.config);
            let outputs = sense.sense(context);
            let width = outputs.len().min(sense_size);
            combined_inputs
                .slice_mut(s![offset..offset + width])
                .assign(&outputs.slice(s![..width]));
            offset += sense_size;
        }

        combined_inputs.mapv_inplace(finite_or_zero);
        combined_inputs
    }

    /// Returns the total number of inputs produced by all senses.
    pub fn total_input_size(&self, config: &SimulationConfig) -> usize {
        self.senses.iter().map(|s| s.input_size(config)).sum()
    }

    /// Inputs carrying data for `genome`; padding slots are not counted.
    pub fn real_input_size(&self, genome: &CreatureGenome, config: &SimulationConfig) -> usize {
        self.senses
            .iter()
            .map(|s| s.real_input_size(genome, config))
            .sum()
    }

    /// Returns a reference to the senses in this perception system.
    pub fn senses(&self) -> &[Box<dyn Sense>] {
        &self.senses
    }
}
