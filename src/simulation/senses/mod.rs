//! Sensor pipeline feeding neural controllers.
//!
//! Each sense contributes a fixed-width slice of the input vector; the
//! [`Perception`] aggregator concatenates them in order.

mod clock;
mod pellet_sense;
mod perception;
mod proprioception;
mod sense;

pub use clock::ClockSense;
pub use pellet_sense::{PelletReading, PelletSense};
pub use perception::Perception;
pub use proprioception::{GroundContactSense, MuscleStrainSense, NodeVelocitySense};
pub use sense::Sense;

use super::genome::CreatureGenome;
use super::params::SimulationConfig;
use super::physics::BodyState;

/// Everything a sense may read during one frame.
#[derive(Debug, Clone, Copy)]
pub struct SensorContext<'a> {
    /// Run configuration.
    pub config: &'a SimulationConfig,
    /// Genome being simulated.
    pub genome: &'a CreatureGenome,
    /// Body state at the start of the frame.
    pub body: &'a BodyState,
    /// Rest length of each muscle during the previous frame.
    pub rest_lengths: &'a [f32],
    /// Pellet-relative readings.
    pub reading: PelletReading,
    /// Elapsed simulated time.
    pub time: f32,
}
