//! Pellet direction, heading and distance.

use glam::Vec3;
use ndarray::Array1;

use super::SensorContext;
use super::sense::Sense;
use crate::simulation::params::SimulationConfig;
use crate::simulation::pellet::PelletField;
use crate::simulation::physics::BodyState;

/// Pellet-relative readings shared by the pellet sense and oscillator biases.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PelletReading {
    /// Unit vector from the center of mass to the active pellet.
    pub direction: Vec3,
    /// Unit vector of the center-of-mass velocity.
    pub velocity_direction: Vec3,
    /// Distance to the active pellet over the arena size, in `[0, 1]`.
    pub normalized_distance: f32,
}

impl PelletReading {
    /// Reads the body against the active pellet. Without one, all fields
    /// except the heading are zero.
    pub fn measure(body: &BodyState, pellets: &PelletField, config: &SimulationConfig) -> Self {
        let com = body.center_of_mass();
        let velocity_direction = body.center_of_mass_velocity().normalize_or_zero();
        match pellets.active() {
            Some(pellet) => {
                let to_pellet = pellet.position - com;
                let arena = config.arena_size.max(1e-3);
                Self {
                    direction: to_pellet.normalize_or_zero(),
                    velocity_direction,
                    normalized_distance: (to_pellet.length() / arena).clamp(0.0, 1.0),
                }
            }
            None => Self {
                velocity_direction,
                ..Self::default()
            },
        }
    }
}

/// Seven base inputs: pellet direction (3), velocity direction (3),
/// normalized pellet distance (1).
#[derive(Debug, Clone, Copy, Default)]
pub struct PelletSense;

impl Sense for PelletSense {
    fn sense(&self, context: &SensorContext<'_>) -> Array1<f32> {
        let reading = context.reading;
        let [dx, dy, dz] = reading.direction.to_array();
        let [vx, vy, vz] = reading.velocity_direction.to_array();
        Array1::from_vec(vec![dx, dy, dz, vx, vy, vz, reading.normalized_distance])
    }

    fn input_size(&self, _config: &SimulationConfig) -> usize {
        7
    }

    fn name(&self) -> &'static str {
        "Pellet"
    }
}
