//! Recombination of two parent genomes into one child.
//!
//! The child takes its node and muscle topology from the structure parent;
//! each gene is paired with the other parent's gene at the same index,
//! wrapping when the other parent is smaller.

use std::collections::HashMap;

use rand::Rng;

use super::brain::{Controller, NeatGenome, NeuralGenomeData};
use super::genome::{CreatureGenome, DirectionalBias, MuscleGene, NodeGene, ScalarBias, clone_genome};
use super::geometric_utils::{lerp, wrap_phase};
use super::ids::IdAllocator;
use super::params::{CrossoverMode, SimulationConfig};

/// Blends a gene value: interpolation for single-point, a coin flip for
/// uniform.
fn mix<R: Rng + ?Sized>(mode: CrossoverMode, a: f32, b: f32, t: f32, rng: &mut R) -> f32 {
    match mode {
        CrossoverMode::SinglePoint => lerp(a, b, t),
        CrossoverMode::Uniform => {
            if rng.random_bool(0.5) {
                a
            } else {
                b
            }
        }
    }
}

/// Produces one child from two parents.
///
/// # Arguments
///
/// * `structure` - Parent whose body topology and controller shape the child inherits
/// * `other` - Parent contributing gene values
/// * `config` - Ranges used to keep blended values valid
///
/// # Returns
///
/// A child with `generation = max + 1`, both parents recorded and a zero
/// survival streak.
pub fn crossover<R: Rng + ?Sized>(
    structure: &CreatureGenome,
    other: &CreatureGenome,
    config: &SimulationConfig,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> CreatureGenome {
    let mode = config.crossover_mode;
    let mut child = clone_genome(structure, ids);

    if !other.nodes.is_empty() {
        for (i, node) in child.nodes.iter_mut().enumerate() {
            mix_node(node, &other.nodes[i % other.nodes.len()], mode, config, rng);
        }
    }
    if !other.muscles.is_empty() {
        for (i, muscle) in child.muscles.iter_mut().enumerate() {
            mix_muscle(muscle, &other.muscles[i % other.muscles.len()], mode, config, rng);
        }
    }

    let t = rng.random::<f32>();
    child.global_frequency_multiplier = config.frequency_multiplier.clamp(mix(
        mode,
        structure.global_frequency_multiplier,
        other.global_frequency_multiplier,
        t,
        rng,
    ));
    if rng.random_bool(0.5) {
        child.color = other.color;
    }

    child.controller = mix_controller(&structure.controller, &other.controller, mode, rng);
    child.generation = structure.generation.max(other.generation) + 1;
    child.parent_ids = vec![structure.id, other.id];
    child.survival_streak = 0;
    child
}

fn mix_node<R: Rng + ?Sized>(
    node: &mut NodeGene,
    other: &NodeGene,
    mode: CrossoverMode,
    config: &SimulationConfig,
    rng: &mut R,
) {
    let t = rng.random::<f32>();
    node.size = config.node_size.clamp(mix(mode, node.size, other.size, t, rng));
    node.friction = config
        .node_friction
        .clamp(mix(mode, node.friction, other.friction, t, rng));
    node.position = match mode {
        CrossoverMode::SinglePoint => node.position.lerp(other.position, t),
        CrossoverMode::Uniform if rng.random_bool(0.5) => other.position,
        CrossoverMode::Uniform => node.position,
    };
}

fn mix_muscle<R: Rng + ?Sized>(
    muscle: &mut MuscleGene,
    other: &MuscleGene,
    mode: CrossoverMode,
    config: &SimulationConfig,
    rng: &mut R,
) {
    let t = rng.random::<f32>();
    muscle.rest_length = config
        .muscle_rest_length
        .clamp(mix(mode, muscle.rest_length, other.rest_length, t, rng));
    muscle.stiffness = config
        .muscle_stiffness
        .clamp(mix(mode, muscle.stiffness, other.stiffness, t, rng));
    muscle.damping = config
        .muscle_damping
        .clamp(mix(mode, muscle.damping, other.damping, t, rng));
    muscle.frequency = config
        .muscle_frequency
        .clamp(mix(mode, muscle.frequency, other.frequency, t, rng));
    muscle.amplitude = config
        .muscle_amplitude
        .clamp(mix(mode, muscle.amplitude, other.amplitude, t, rng));
    muscle.phase = wrap_phase(mix(mode, muscle.phase, other.phase, t, rng));

    muscle.direction_bias = mix_directional(muscle.direction_bias, other.direction_bias, mode, t, rng);
    muscle.velocity_bias = mix_directional(muscle.velocity_bias, other.velocity_bias, mode, t, rng);
    muscle.distance_bias = match (muscle.distance_bias, other.distance_bias) {
        (Some(a), Some(b)) => Some(ScalarBias {
            value: mix(mode, a.value, b.value, t, rng).clamp(-1.0, 1.0),
            strength: mix(mode, a.strength, b.strength, t, rng),
        }),
        (own, _) => own,
    };
}

fn mix_directional<R: Rng + ?Sized>(
    own: Option<DirectionalBias>,
    other: Option<DirectionalBias>,
    mode: CrossoverMode,
    t: f32,
    rng: &mut R,
) -> Option<DirectionalBias> {
    match (own, other) {
        (Some(a), Some(b)) => Some(match mode {
            CrossoverMode::SinglePoint => DirectionalBias {
                axis: a.axis.lerp(b.axis, t).normalize_or(a.axis),
                strength: lerp(a.strength, b.strength, t),
            },
            CrossoverMode::Uniform => {
                if rng.random_bool(0.5) {
                    a
                } else {
                    b
                }
            }
        }),
        (own, _) => own,
    }
}

/// Recombines controllers of the same kind and shape; otherwise the
/// structure parent's controller is inherited.
fn mix_controller<R: Rng + ?Sized>(
    structure: &Controller,
    other: &Controller,
    mode: CrossoverMode,
    rng: &mut R,
) -> Controller {
    match (structure, other) {
        (Controller::NeuralFixed(a), Controller::NeuralFixed(b)) if a.topology == b.topology => {
            Controller::NeuralFixed(mix_weights(a, b, mode, rng))
        }
        (Controller::NeuralVariable(a), Controller::NeuralVariable(b)) => {
            Controller::NeuralVariable(mix_neat(a, b, rng))
        }
        _ => structure.clone(),
    }
}

/// Single-point splices the weight vectors at one cut; uniform picks each
/// weight from either parent.
pub fn mix_weights<R: Rng + ?Sized>(
    a: &NeuralGenomeData,
    b: &NeuralGenomeData,
    mode: CrossoverMode,
    rng: &mut R,
) -> NeuralGenomeData {
    let len = a.weights.len().min(b.weights.len());
    let weights = match mode {
        CrossoverMode::SinglePoint => {
            let cut = rng.random_range(0..=len);
            a.weights[..cut]
                .iter()
                .chain(&b.weights[cut..len])
                .copied()
                .collect()
        }
        CrossoverMode::Uniform => a
            .weights
            .iter()
            .zip(&b.weights)
            .map(|(&x, &y)| if rng.random_bool(0.5) { x } else { y })
            .collect(),
    };
    NeuralGenomeData {
        topology: a.topology,
        weights,
        activation: a.activation,
    }
}

/// Aligns connections and neurons by historical marker. Matching genes take
/// either parent's weight; disjoint and excess genes and every enabled flag
/// come from the structure parent, so the child keeps its acyclic shape.
pub fn mix_neat<R: Rng + ?Sized>(structure: &NeatGenome, other: &NeatGenome, rng: &mut R) -> NeatGenome {
    let other_weights: HashMap<u64, f32> = other
        .connections
        .iter()
        .map(|c| (c.innovation, c.weight))
        .collect();
    let other_biases: HashMap<u32, f32> = other.neurons.iter().map(|n| (n.id, n.bias)).collect();

    let mut child = structure.clone();
    for connection in &mut child.connections {
        if let Some(&weight) = other_weights.get(&connection.innovation) {
            if rng.random_bool(0.5) {
                connection.weight = weight;
            }
        }
    }
    for neuron in &mut child.neurons {
        if let Some(&bias) = other_biases.get(&neuron.id) {
            if rng.random_bool(0.5) {
                neuron.bias = bias;
            }
        }
    }
    child
}
