//! Neural controllers for creature muscles.
//!
//! A creature is driven either by per-muscle oscillators or by one of two
//! network families: a fixed two-layer perceptron stored as a flat weight
//! vector, or a variable-topology graph evolved NEAT-style.

use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::params::ControllerKind;

pub mod mlp;
pub mod neat;

pub use mlp::FixedNetwork;
pub use neat::{InnovationRegistry, NeatGenome, NeatNetwork};

/// Activation function applied by hidden neurons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Hyperbolic tangent.
    #[default]
    Tanh,
    /// Rectified linear unit.
    Relu,
    /// Logistic sigmoid.
    Sigmoid,
}

impl Activation {
    /// Applies the activation to one value.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// Layer sizes of a fixed-topology network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Sensor inputs.
    pub input_size: usize,
    /// Hidden neurons.
    pub hidden_size: usize,
    /// Outputs, one per muscle slot.
    pub output_size: usize,
}

impl Topology {
    /// Creates a topology.
    pub fn new(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size,
        }
    }

    /// Length of the flat weight vector for this topology.
    pub fn weight_count(&self) -> usize {
        self.input_size * self.hidden_size
            + self.hidden_size
            + self.hidden_size * self.output_size
            + self.output_size
    }
}

/// Serialized fixed-topology network.
///
/// Weights are laid out as: input→hidden weights row-major by input, hidden
/// biases, hidden→output weights row-major by hidden neuron, output biases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralGenomeData {
    /// Layer sizes.
    pub topology: Topology,
    /// Flat weight vector in canonical order.
    pub weights: Vec<f32>,
    /// Hidden activation.
    pub activation: Activation,
}

impl NeuralGenomeData {
    /// Creates a network with Xavier-initialized weights and zero biases.
    pub fn random<R: Rng + ?Sized>(topology: Topology, activation: Activation, rng: &mut R) -> Self {
        let Topology {
            input_size,
            hidden_size,
            output_size,
        } = topology;
        let mut weights = Vec::with_capacity(topology.weight_count());

        let std_ih = xavier_std(input_size, hidden_size);
        weights.extend((0..input_size * hidden_size).map(|_| gaussian(rng) * std_ih));
        weights.extend(std::iter::repeat_n(0.0, hidden_size));

        let std_ho = xavier_std(hidden_size, output_size);
        weights.extend((0..hidden_size * output_size).map(|_| gaussian(rng) * std_ho));
        weights.extend(std::iter::repeat_n(0.0, output_size));

        Self {
            topology,
            weights,
            activation,
        }
    }

    /// Checks the weight vector length and values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let expected = self.topology.weight_count();
        if self.weights.len() != expected {
            return Err(ValidationError::WeightCount {
                expected,
                actual: self.weights.len(),
            });
        }
        if self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ValidationError::NonFinite {
                field: "neural weights",
            });
        }
        Ok(())
    }
}

/// Heritable controller description of a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "network", rename_all = "snake_case")]
pub enum Controller {
    /// Muscles follow their own sinusoids.
    Oscillator,
    /// Fixed two-layer network.
    NeuralFixed(NeuralGenomeData),
    /// Variable-topology network.
    NeuralVariable(NeatGenome),
}

impl Controller {
    /// Payload-free tag of this controller.
    pub fn kind(&self) -> ControllerKind {
        match self {
            Controller::Oscillator => ControllerKind::Oscillator,
            Controller::NeuralFixed(_) => ControllerKind::NeuralFixed,
            Controller::NeuralVariable(_) => ControllerKind::NeuralVariable,
        }
    }

    /// Builds the runtime network, or `None` for oscillator control.
    pub fn brain(&self) -> Result<Option<Brain>, ValidationError> {
        match self {
            Controller::Oscillator => Ok(None),
            Controller::NeuralFixed(data) => Ok(Some(Brain::Fixed(FixedNetwork::from_genome(data)?))),
            Controller::NeuralVariable(genome) => {
                Ok(Some(Brain::Variable(NeatNetwork::compile(genome)?)))
            }
        }
    }

    /// Checks the payload against the configured input/output widths.
    pub fn validate(&self, input_size: usize, output_size: usize) -> Result<(), ValidationError> {
        match self {
            Controller::Oscillator => Ok(()),
            Controller::NeuralFixed(data) => {
                data.validate()?;
                check_width("input_size", input_size, data.topology.input_size)?;
                check_width("output_size", output_size, data.topology.output_size)
            }
            Controller::NeuralVariable(genome) => genome.validate(input_size, output_size),
        }
    }
}

/// Runtime network decoded from a [`Controller`].
#[derive(Debug, Clone)]
pub enum Brain {
    /// Decoded fixed network.
    Fixed(FixedNetwork),
    /// Compiled variable-topology network.
    Variable(NeatNetwork),
}

impl Brain {
    /// Runs a forward pass. Outputs are bounded to `[-1, 1]`.
    #[inline]
    pub fn think(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut outputs = match self {
            Brain::Fixed(network) => network.forward(inputs),
            Brain::Variable(network) => network.activate(inputs),
        };
        outputs.mapv_inplace(|o| if o.is_finite() { o.clamp(-1.0, 1.0) } else { 0.0 });
        outputs
    }

    /// Number of inputs the network expects.
    pub fn input_size(&self) -> usize {
        match self {
            Brain::Fixed(network) => network.topology.input_size,
            Brain::Variable(network) => network.input_count(),
        }
    }
}

fn check_width(field: &'static str, expected: usize, actual: usize) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::TopologyMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Standard deviation of Xavier/Glorot normal initialization.
pub fn xavier_std(fan_in: usize, fan_out: usize) -> f32 {
    let fan = (fan_in + fan_out).max(1) as f32;
    (2.0 / fan).sqrt()
}

/// Standard normal sample.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.sample::<f32, _>(StandardNormal)
}
