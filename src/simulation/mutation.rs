//! Value and structural mutation of genomes.
//!
//! Value mutation perturbs each field independently with probability `rate`
//! by a Gaussian step scaled to the field's range. Structural mutation adds
//! or removes nodes and muscles; a structural edit that leaves the body
//! disconnected is repaired by bridging components, or reverted when the
//! bridge would exceed the muscle limit.

use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::brain::neat::NeuronKind;
use super::brain::{Controller, InnovationRegistry, NeatGenome, gaussian};
use super::evolution::neural_mutation_rate;
use super::genome::{
    CreatureGenome, DirectionalBias, MIN_SPAWN_HEIGHT, MuscleGene, NodeGene, ScalarBias,
    random_muscle, random_node,
};
use super::geometric_utils::{finite_or_zero, random_unit_vec3, wrap_phase};
use super::ids::IdAllocator;
use super::params::{SimulationConfig, ValueRange};

/// Rates and magnitudes used by one mutation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationSettings {
    /// Per-field probability of a value mutation.
    pub rate: f32,
    /// Step size relative to each field's range.
    pub magnitude: f32,
    /// Probability of each structural operation.
    pub structural_rate: f32,
    /// Per-weight probability of a neural weight mutation.
    pub neural_rate: f32,
    /// Standard deviation of a neural weight step.
    pub neural_magnitude: f32,
}

impl MutationSettings {
    /// Settings for offspring created in `generation`, with the neural rate
    /// taken from the decay schedule.
    pub fn for_generation(config: &SimulationConfig, generation: u32) -> Self {
        Self {
            rate: config.mutation_rate,
            magnitude: config.mutation_magnitude,
            structural_rate: config.structural_mutation_rate,
            neural_rate: neural_mutation_rate(
                generation,
                config.neural.weight_mutation_rate,
                config.neural.rate_decay,
            ),
            neural_magnitude: config.neural.weight_mutation_magnitude,
        }
    }
}

/// Perturbs `value` with probability `chance` by `N(0, magnitude · span)`,
/// clamped to `range`.
pub fn mutate_value<R: Rng + ?Sized>(
    value: f32,
    range: ValueRange,
    chance: f32,
    magnitude: f32,
    rng: &mut R,
) -> f32 {
    if rng.random::<f32>() >= chance {
        return value;
    }
    let scale = range.span() * magnitude;
    range.clamp(finite_or_zero(value + gaussian(rng) * scale))
}

/// Returns a mutated copy of `genome` under a new id.
///
/// Generation and parents are kept; the survival streak resets.
pub fn mutate_genome<R: Rng + ?Sized>(
    genome: &CreatureGenome,
    config: &SimulationConfig,
    settings: &MutationSettings,
    ids: &mut IdAllocator,
    innovations: &mut InnovationRegistry,
    rng: &mut R,
) -> CreatureGenome {
    let mut child = genome.clone();
    child.id = ids.genome();
    child.survival_streak = 0;

    mutate_body(&mut child, config, settings, rng);
    mutate_structure(&mut child, config, settings.structural_rate, ids, rng);
    mutate_controller(&mut child.controller, config, settings, innovations, rng);
    child
}

fn mutate_body<R: Rng + ?Sized>(
    genome: &mut CreatureGenome,
    config: &SimulationConfig,
    settings: &MutationSettings,
    rng: &mut R,
) {
    let MutationSettings {
        rate, magnitude, ..
    } = *settings;

    for node in &mut genome.nodes {
        node.size = mutate_value(node.size, config.node_size, rate, magnitude, rng);
        node.friction = mutate_value(node.friction, config.node_friction, rate, magnitude, rng);
        node.position = mutate_position(node.position, config, rate, magnitude, rng);
    }

    for muscle in &mut genome.muscles {
        mutate_muscle(muscle, config, rate, magnitude, rng);
    }

    genome.global_frequency_multiplier = mutate_value(
        genome.global_frequency_multiplier,
        config.frequency_multiplier,
        rate,
        magnitude,
        rng,
    );
    if rng.random::<f32>() < rate {
        genome.color.h = (genome.color.h + gaussian(rng) * magnitude * 360.0).rem_euclid(360.0);
    }
}

fn mutate_position<R: Rng + ?Sized>(
    position: Vec3,
    config: &SimulationConfig,
    rate: f32,
    magnitude: f32,
    rng: &mut R,
) -> Vec3 {
    let step = config.spawn_radius * magnitude;
    let jitter = |value: f32, rng: &mut R| {
        if rng.random::<f32>() < rate {
            finite_or_zero(value + gaussian(rng) * step)
        } else {
            value
        }
    };
    let x = jitter(position.x, rng);
    let y = jitter(position.y, rng).max(MIN_SPAWN_HEIGHT);
    let z = jitter(position.z, rng);
    Vec3::new(x, y, z)
}

fn mutate_muscle<R: Rng + ?Sized>(
    muscle: &mut MuscleGene,
    config: &SimulationConfig,
    rate: f32,
    magnitude: f32,
    rng: &mut R,
) {
    muscle.stiffness = mutate_value(muscle.stiffness, config.muscle_stiffness, rate, magnitude, rng);
    muscle.damping = mutate_value(muscle.damping, config.muscle_damping, rate, magnitude, rng);
    muscle.frequency = mutate_value(muscle.frequency, config.muscle_frequency, rate, magnitude, rng);
    muscle.amplitude = mutate_value(muscle.amplitude, config.muscle_amplitude, rate, magnitude, rng);
    muscle.rest_length = mutate_value(
        muscle.rest_length,
        config.muscle_rest_length,
        rate,
        magnitude,
        rng,
    );
    if rng.random::<f32>() < rate {
        muscle.phase = wrap_phase(muscle.phase + gaussian(rng) * magnitude * PI * 2.0);
    }

    for bias in [&mut muscle.direction_bias, &mut muscle.velocity_bias]
        .into_iter()
        .flatten()
    {
        mutate_directional(bias, config, rate, magnitude, rng);
    }
    if let Some(ScalarBias { value, strength }) = &mut muscle.distance_bias {
        *value = mutate_value(*value, ValueRange::new(-1.0, 1.0), rate, magnitude, rng);
        *strength = mutate_value(*strength, config.bias_strength, rate, magnitude, rng);
    }
}

fn mutate_directional<R: Rng + ?Sized>(
    bias: &mut DirectionalBias,
    config: &SimulationConfig,
    rate: f32,
    magnitude: f32,
    rng: &mut R,
) {
    if rng.random::<f32>() < rate {
        let nudged = bias.axis + random_unit_vec3(rng) * magnitude;
        bias.axis = nudged.normalize_or(bias.axis);
    }
    bias.strength = mutate_value(bias.strength, config.bias_strength, rate, magnitude, rng);
}

fn mutate_structure<R: Rng + ?Sized>(
    genome: &mut CreatureGenome,
    config: &SimulationConfig,
    structural_rate: f32,
    ids: &mut IdAllocator,
    rng: &mut R,
) {
    let before = (genome.nodes.clone(), genome.muscles.clone());
    let mut changed = false;

    if rng.random::<f32>() < structural_rate {
        changed |= add_node(genome, config, ids, rng);
    }
    if rng.random::<f32>() < structural_rate {
        changed |= remove_node(genome, config, rng);
    }
    if rng.random::<f32>() < structural_rate {
        changed |= add_muscle(genome, config, ids, rng);
    }

    if changed && !repair_connectivity(genome, config, ids, rng) {
        (genome.nodes, genome.muscles) = before;
    }
}

/// Spawns a node near a random existing node, attached by one new muscle.
pub fn add_node<R: Rng + ?Sized>(
    genome: &mut CreatureGenome,
    config: &SimulationConfig,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> bool {
    if genome.nodes.len() >= config.max_nodes || genome.muscles.len() >= config.max_muscles {
        return false;
    }
    let Some(anchor) = genome.nodes.choose(rng).cloned() else {
        return false;
    };
    let reach = config.muscle_rest_length.sample(rng);
    let mut position = anchor.position + random_unit_vec3(rng) * reach;
    position.y = position.y.max(MIN_SPAWN_HEIGHT);

    let node = random_node(config, position, ids, rng);
    let muscle = random_muscle(config, &anchor, &node, ids, rng);
    genome.nodes.push(node);
    genome.muscles.push(muscle);
    true
}

/// Drops the least-connected node (ties broken at random) with its muscles.
pub fn remove_node<R: Rng + ?Sized>(
    genome: &mut CreatureGenome,
    config: &SimulationConfig,
    rng: &mut R,
) -> bool {
    if genome.nodes.len() <= config.min_nodes {
        return false;
    }
    let Some(min_degree) = genome.nodes.iter().map(|n| genome.degree(n.id)).min() else {
        return false;
    };
    let candidates: Vec<NodeGene> = genome
        .nodes
        .iter()
        .filter(|n| genome.degree(n.id) == min_degree)
        .cloned()
        .collect();
    let Some(victim) = candidates.choose(rng).map(|n| n.id) else {
        return false;
    };
    let remaining = genome
        .muscles
        .iter()
        .filter(|m| m.node_a != victim && m.node_b != victim)
        .count();
    if remaining == 0 {
        return false;
    }

    genome.nodes.retain(|n| n.id != victim);
    genome.muscles.retain(|m| m.node_a != victim && m.node_b != victim);
    true
}

/// Connects a random pair of nodes that share no muscle.
pub fn add_muscle<R: Rng + ?Sized>(
    genome: &mut CreatureGenome,
    config: &SimulationConfig,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> bool {
    if genome.muscles.len() >= config.max_muscles {
        return false;
    }
    let n = genome.nodes.len();
    let mut pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
        .filter(|&(a, b)| !genome.has_muscle_between(genome.nodes[a].id, genome.nodes[b].id))
        .collect();
    pairs.shuffle(rng);
    let Some(&(a, b)) = pairs.first() else {
        return false;
    };
    let muscle = random_muscle(config, &genome.nodes[a], &genome.nodes[b], ids, rng);
    genome.muscles.push(muscle);
    true
}

/// Bridges disconnected components by their closest node pair.
///
/// Returns `false` when the bridges would exceed `max_muscles`.
pub fn repair_connectivity<R: Rng + ?Sized>(
    genome: &mut CreatureGenome,
    config: &SimulationConfig,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> bool {
    loop {
        let components = genome.components();
        if components.len() <= 1 {
            return true;
        }
        if genome.muscles.len() >= config.max_muscles {
            return false;
        }

        let (main, rest) = components.split_at(1);
        let mut best: Option<(usize, usize, f32)> = None;
        for &a in &main[0] {
            for &b in rest.iter().flatten() {
                let d = genome.nodes[a].position.distance(genome.nodes[b].position);
                if best.is_none_or(|(_, _, current)| d < current) {
                    best = Some((a, b, d));
                }
            }
        }
        let Some((a, b, _)) = best else {
            return false;
        };
        let muscle = random_muscle(config, &genome.nodes[a], &genome.nodes[b], ids, rng);
        genome.muscles.push(muscle);
    }
}

fn mutate_controller<R: Rng + ?Sized>(
    controller: &mut Controller,
    config: &SimulationConfig,
    settings: &MutationSettings,
    innovations: &mut InnovationRegistry,
    rng: &mut R,
) {
    match controller {
        Controller::Oscillator => {}
        Controller::NeuralFixed(data) => {
            for weight in &mut data.weights {
                perturb_weight(weight, settings, rng);
            }
        }
        Controller::NeuralVariable(genome) => {
            mutate_neat(genome, config, settings, innovations, rng);
        }
    }
}

fn perturb_weight<R: Rng + ?Sized>(weight: &mut f32, settings: &MutationSettings, rng: &mut R) {
    if rng.random::<f32>() < settings.neural_rate {
        *weight = finite_or_zero(*weight + gaussian(rng) * settings.neural_magnitude);
    }
}

fn mutate_neat<R: Rng + ?Sized>(
    genome: &mut NeatGenome,
    config: &SimulationConfig,
    settings: &MutationSettings,
    innovations: &mut InnovationRegistry,
    rng: &mut R,
) {
    for connection in &mut genome.connections {
        perturb_weight(&mut connection.weight, settings, rng);
    }
    for neuron in &mut genome.neurons {
        if neuron.kind != NeuronKind::Input {
            perturb_weight(&mut neuron.bias, settings, rng);
        }
    }

    let neural = &config.neural;
    if rng.random::<f32>() < neural.add_connection_rate {
        genome.add_connection(innovations, rng);
    }
    if rng.random::<f32>() < neural.add_neuron_rate {
        genome.add_neuron(innovations, rng);
    }
    genome.toggle_connections(neural.toggle_connection_rate, rng);
}
