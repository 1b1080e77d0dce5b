//! Abstract sense trait.

use ndarray::Array1;

use super::SensorContext;
use crate::simulation::genome::CreatureGenome;
use crate::simulation::params::SimulationConfig;

/// A sensory modality contributing a fixed-width block of network inputs.
///
/// Blocks sized by a population-wide maximum (muscle or node slots) are zero
/// padded; `real_input_size` reports the unpadded width for one genome.
pub trait Sense: Send + Sync {
    /// Process sensory information and return network inputs.
    ///
    /// # Arguments
    ///
    /// * `context` - Body, pellet and clock state of the current frame
    ///
    /// # Returns
    ///
    /// A 1D array of length `input_size(context.config)`.
    fn sense(&self, context: &SensorContext<'_>) -> Array1<f32>;

    /// Number of inputs this sense produces, padding included.
    fn input_size(&self, config: &SimulationConfig) -> usize;

    /// Number of inputs that carry data for `genome`, padding excluded.
    fn real_input_size(&self, genome: &CreatureGenome, config: &SimulationConfig) -> usize {
        let _ = genome;
        self.input_size(config)
    }

    /// Returns a human-readable name for this sense.
    fn name(&self) -> &'static str;
}
