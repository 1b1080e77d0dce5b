//! Time inputs.

use std::f32::consts::PI;

use ndarray::Array1;

use super::SensorContext;
use super::sense::Sense;
use crate::simulation::params::{SimulationConfig, TimeEncoding};

/// Encodes elapsed time per `neural.time_encoding`.
///
/// The phase advances at `neural.time_phase_frequency` cycles per second; the
/// raw value is elapsed time over the run duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSense;

impl Sense for ClockSense {
    fn sense(&self, context: &SensorContext<'_>) -> Array1<f32> {
        let config = context.config;
        let phase = 2.0 * PI * context.time * config.neural.time_phase_frequency;
        let raw = (context.time / config.simulation_duration).clamp(0.0, 1.0);
        let values = match config.neural.time_encoding {
            TimeEncoding::None => vec![],
            TimeEncoding::Sin => vec![phase.sin()],
            TimeEncoding::Raw => vec![raw],
            TimeEncoding::SinCos => vec![phase.sin(), phase.cos()],
            TimeEncoding::SinRaw => vec![phase.sin(), raw],
        };
        Array1::from_vec(values)
    }

    fn input_size(&self, config: &SimulationConfig) -> usize {
        config.neural.time_encoding.width()
    }

    fn name(&self) -> &'static str {
        "Clock"
    }
}
