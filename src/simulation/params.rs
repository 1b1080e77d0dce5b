use rand::Rng;
use serde::{Deserialize, Serialize};

use super::brain::Activation;
use super::error::ConfigError;

/// Closed interval of allowed values for a tunable gene field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Lower bound (inclusive).
    pub min: f32,
    /// Upper bound (inclusive).
    pub max: f32,
}

impl ValueRange {
    /// Creates a range.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Width of the range.
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Clamps a value into the range.
    pub fn clamp(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    /// True when `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Samples uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        self.min + rng.random::<f32>() * self.span()
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::InvalidRange {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Which controller drives muscle contraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Pure sinusoid per muscle.
    #[default]
    Oscillator,
    /// Two-layer feed-forward network with fixed topology.
    NeuralFixed,
    /// Evolvable-topology network.
    NeuralVariable,
}

impl ControllerKind {
    /// Short label used in logs and errors.
    pub fn label(self) -> &'static str {
        match self {
            ControllerKind::Oscillator => "oscillator",
            ControllerKind::NeuralFixed => "neural_fixed",
            ControllerKind::NeuralVariable => "neural_variable",
        }
    }
}

/// How body genes and weight vectors are recombined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverMode {
    /// Body genes are blended with a random factor per gene; weight vectors
    /// are spliced at one cut point.
    #[default]
    SinglePoint,
    /// Every gene and weight is taken from either parent.
    Uniform,
}

/// Schedule applied to the neural weight mutation rate over generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateDecay {
    /// Constant end rate.
    Off,
    /// Linear from the start rate to the end rate by generation 50.
    Linear,
    /// Exponential approach to the end rate.
    #[default]
    Exponential,
}

/// Encoding of simulation time fed to neural controllers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeEncoding {
    /// No time input.
    #[default]
    None,
    /// `sin(phase)`.
    Sin,
    /// Elapsed time normalized by the run duration.
    Raw,
    /// `sin(phase)` and `cos(phase)`.
    SinCos,
    /// `sin(phase)` and normalized elapsed time.
    SinRaw,
}

impl TimeEncoding {
    /// Number of inputs this encoding contributes.
    pub fn width(self) -> usize {
        match self {
            TimeEncoding::None => 0,
            TimeEncoding::Sin | TimeEncoding::Raw => 1,
            TimeEncoding::SinCos | TimeEncoding::SinRaw => 2,
        }
    }
}

/// Toggles for the proprioceptive input blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProprioceptionFlags {
    /// One strain value per muscle slot.
    pub muscle_strain: bool,
    /// Three velocity components per node slot.
    pub node_velocity: bool,
    /// One contact flag per node slot.
    pub ground_contact: bool,
}

/// Neural controller hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralParams {
    /// Hidden layer width of the fixed-topology network.
    pub hidden_size: usize,
    /// Activation of hidden neurons.
    pub activation: Activation,
    /// Weight mutation rate reached once the decay schedule has run out.
    pub weight_mutation_rate: f32,
    /// Standard deviation of a weight perturbation.
    pub weight_mutation_magnitude: f32,
    /// Decay schedule for the weight mutation rate.
    pub rate_decay: RateDecay,
    /// Time input encoding.
    pub time_encoding: TimeEncoding,
    /// Frequency (Hz) of the time phase input.
    pub time_phase_frequency: f32,
    /// Proprioceptive inputs.
    pub proprioception: ProprioceptionFlags,
    /// Probability of adding a connection to a variable-topology network.
    pub add_connection_rate: f32,
    /// Probability of splitting a connection with a new hidden neuron.
    pub add_neuron_rate: f32,
    /// Per-connection probability of toggling its enabled flag.
    pub toggle_connection_rate: f32,
}

impl Default for NeuralParams {
    fn default() -> Self {
        Self {
            hidden_size: 8,
            activation: Activation::Tanh,
            weight_mutation_rate: 0.1,
            weight_mutation_magnitude: 0.3,
            rate_decay: RateDecay::Exponential,
            time_encoding: TimeEncoding::None,
            time_phase_frequency: 1.0,
            proprioception: ProprioceptionFlags::default(),
            add_connection_rate: 0.1,
            add_neuron_rate: 0.05,
            toggle_connection_rate: 0.01,
        }
    }
}

/// Weights of the fitness terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    /// Reward per collected pellet.
    pub pellet_weight: f32,
    /// Maximum bonus for standing on the active pellet.
    pub proximity_weight: f32,
    /// Distance at which the proximity bonus reaches zero.
    pub proximity_max_distance: f32,
    /// Reward per unit of distance traveled.
    pub movement_weight: f32,
    /// Cap of the movement reward.
    pub movement_cap: f32,
    /// Distance traveled below which the stillness penalty applies.
    pub stillness_threshold: f32,
    /// Penalty for barely moving.
    pub stillness_penalty: f32,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            pellet_weight: 100.0,
            proximity_weight: 20.0,
            proximity_max_distance: 20.0,
            movement_weight: 1.0,
            movement_cap: 5.0,
            stillness_threshold: 0.5,
            stillness_penalty: 2.0,
        }
    }
}

/// Simulation and evolution parameters shared read-only by every creature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed of every random stream in a run.
    pub seed: u64,
    /// Vertical acceleration (negative is down).
    pub gravity: f32,
    /// Global multiplier of node friction against the ground.
    pub ground_friction: f32,
    /// Duration of one recorded frame in seconds.
    pub time_step: f32,
    /// Integration substeps per frame.
    pub physics_substeps: usize,
    /// Simulated seconds per creature.
    pub simulation_duration: f32,
    /// Genomes per generation.
    pub population_size: usize,
    /// Fraction of the population removed each generation.
    pub cull_percentage: f32,
    /// Enables clone-then-mutate offspring.
    pub use_mutation: bool,
    /// Per-gene probability of a value mutation.
    pub mutation_rate: f32,
    /// Size of a value mutation relative to the field range.
    pub mutation_magnitude: f32,
    /// Probability of each structural mutation.
    pub structural_mutation_rate: f32,
    /// Enables crossover offspring.
    pub use_crossover: bool,
    /// Probability that an offspring comes from crossover.
    pub crossover_rate: f32,
    /// Crossover variant.
    pub crossover_mode: CrossoverMode,
    /// Minimum node count.
    pub min_nodes: usize,
    /// Maximum node count.
    pub max_nodes: usize,
    /// Maximum muscle count.
    pub max_muscles: usize,
    /// Node size range.
    pub node_size: ValueRange,
    /// Node friction range.
    pub node_friction: ValueRange,
    /// Muscle stiffness range.
    pub muscle_stiffness: ValueRange,
    /// Muscle damping range.
    pub muscle_damping: ValueRange,
    /// Muscle oscillation frequency range (Hz).
    pub muscle_frequency: ValueRange,
    /// Muscle contraction amplitude range.
    pub muscle_amplitude: ValueRange,
    /// Muscle rest length range.
    pub muscle_rest_length: ValueRange,
    /// Sensory bias strength range.
    pub bias_strength: ValueRange,
    /// Global frequency multiplier range.
    pub frequency_multiplier: ValueRange,
    /// Horizontal radius in which nodes spawn.
    pub spawn_radius: f32,
    /// Effective muscle frequency above which a creature is disqualified.
    pub max_allowed_frequency: f32,
    /// Pellets available per run.
    pub pellet_count: usize,
    /// Maximum pellet spawn distance, also the distance normalizer.
    pub arena_size: f32,
    /// Minimum pellet spawn distance.
    pub pellet_min_distance: f32,
    /// Pellet collision radius.
    pub pellet_radius: f32,
    /// Controller used for new genomes.
    pub controller: ControllerKind,
    /// Neural hyperparameters.
    pub neural: NeuralParams,
    /// Fitness weights.
    pub fitness: FitnessWeights,
    /// Keeps per-frame controller outputs on results.
    pub record_activations: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            gravity: -9.81,
            ground_friction: 0.6,
            time_step: 1.0 / 60.0,
            physics_substeps: 8,
            simulation_duration: 10.0,
            population_size: 50,
            cull_percentage: 0.5,
            use_mutation: true,
            mutation_rate: 0.1,
            mutation_magnitude: 0.3,
            structural_mutation_rate: 0.05,
            use_crossover: true,
            crossover_rate: 0.5,
            crossover_mode: CrossoverMode::SinglePoint,
            min_nodes: 3,
            max_nodes: 8,
            max_muscles: 15,
            node_size: ValueRange::new(0.2, 0.8),
            node_friction: ValueRange::new(0.1, 1.0),
            muscle_stiffness: ValueRange::new(20.0, 200.0),
            muscle_damping: ValueRange::new(0.05, 1.0),
            muscle_frequency: ValueRange::new(0.5, 3.0),
            muscle_amplitude: ValueRange::new(0.05, 0.4),
            muscle_rest_length: ValueRange::new(0.2, 5.0),
            bias_strength: ValueRange::new(0.0, 0.5),
            frequency_multiplier: ValueRange::new(0.5, 2.0),
            spawn_radius: 2.0,
            max_allowed_frequency: 10.0,
            pellet_count: 5,
            arena_size: 10.0,
            pellet_min_distance: 3.0,
            pellet_radius: 0.5,
            controller: ControllerKind::Oscillator,
            neural: NeuralParams::default(),
            fitness: FitnessWeights::default(),
            record_activations: false,
        }
    }
}

impl SimulationConfig {
    /// Checks the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_nodes < 2 {
            return Err(ConfigError::Invalid("min_nodes must be at least 2"));
        }
        if self.min_nodes > self.max_nodes {
            return Err(ConfigError::InvalidBounds {
                field: "nodes",
                min: self.min_nodes,
                max: self.max_nodes,
            });
        }
        // A spanning tree over the smallest body must fit.
        if self.max_muscles + 1 < self.min_nodes {
            return Err(ConfigError::InvalidBounds {
                field: "muscles",
                min: self.min_nodes - 1,
                max: self.max_muscles,
            });
        }
        if self.population_size == 0 {
            return Err(ConfigError::Invalid("population_size must be positive"));
        }
        if self.physics_substeps == 0 {
            return Err(ConfigError::Invalid("physics_substeps must be positive"));
        }
        if !is_positive(self.time_step) || !is_positive(self.simulation_duration) {
            return Err(ConfigError::Invalid(
                "time_step and simulation_duration must be positive",
            ));
        }
        if !is_positive(self.max_allowed_frequency) {
            return Err(ConfigError::Invalid("max_allowed_frequency must be positive"));
        }
        if self.neural.hidden_size == 0 && self.controller == ControllerKind::NeuralFixed {
            return Err(ConfigError::Invalid("neural.hidden_size must be positive"));
        }

        for (field, value) in [
            ("cull_percentage", self.cull_percentage),
            ("mutation_rate", self.mutation_rate),
            ("structural_mutation_rate", self.structural_mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("neural.weight_mutation_rate", self.neural.weight_mutation_rate),
            ("neural.add_connection_rate", self.neural.add_connection_rate),
            ("neural.add_neuron_rate", self.neural.add_neuron_rate),
            ("neural.toggle_connection_rate", self.neural.toggle_connection_rate),
        ] {
            check_unit(field, value)?;
        }

        for (field, range) in [
            ("node_size", self.node_size),
            ("node_friction", self.node_friction),
            ("muscle_stiffness", self.muscle_stiffness),
            ("muscle_damping", self.muscle_damping),
            ("muscle_frequency", self.muscle_frequency),
            ("muscle_amplitude", self.muscle_amplitude),
            ("muscle_rest_length", self.muscle_rest_length),
            ("bias_strength", self.bias_strength),
            ("frequency_multiplier", self.frequency_multiplier),
        ] {
            range.validate(field)?;
        }
        if self.node_size.min <= 0.0 {
            return Err(ConfigError::Invalid("node_size.min must be positive"));
        }
        if self.muscle_rest_length.min <= 0.0 {
            return Err(ConfigError::Invalid("muscle_rest_length.min must be positive"));
        }
        if self.pellet_min_distance > self.arena_size {
            return Err(ConfigError::InvalidRange {
                field: "pellet distance",
                min: self.pellet_min_distance,
                max: self.arena_size,
            });
        }
        Ok(())
    }

    /// Number of recorded frames per run.
    pub fn frame_count(&self) -> usize {
        ((self.simulation_duration / self.time_step).round() as usize).max(1)
    }

    /// Integration timestep of one physics substep.
    pub fn substep_dt(&self) -> f32 {
        self.time_step / self.physics_substeps.max(1) as f32
    }

    /// Number of survivors kept by truncation selection.
    pub fn survivor_count(&self) -> usize {
        survivor_count(self.population_size, self.cull_percentage)
    }

    /// Neural controller output width, one per muscle slot.
    pub fn neural_output_size(&self) -> usize {
        self.max_muscles
    }
}

/// Survivors kept out of `n` when `cull_percentage` of them is removed.
pub fn survivor_count(n: usize, cull_percentage: f32) -> usize {
    let survival_rate = (1.0 - f64::from(cull_percentage)).clamp(0.0, 1.0);
    // Absorbs only the f32 rounding of `cull_percentage`, so 10 * (1 - 0.3)
    // keeps 7 while 7 * (1 - 0.71429) keeps 1.
    let tolerance = n as f64 * f64::from(f32::EPSILON);
    ((n as f64 * survival_rate + tolerance).floor() as usize)
        .max(1)
        .min(n.max(1))
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn check_unit(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            low: 0.0,
            high: 1.0,
        });
    }
    Ok(())
}
