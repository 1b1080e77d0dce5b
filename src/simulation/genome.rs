//! Heritable description of a creature: a node/muscle body graph plus its
//! controller.

use std::collections::{HashSet, VecDeque};
use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::brain::{Controller, InnovationRegistry, NeatGenome, NeuralGenomeData, Topology};
use super::error::ValidationError;
use super::geometric_utils::random_unit_vec3;
use super::ids::{GeneId, GenomeId, IdAllocator};
use super::params::{ControllerKind, SimulationConfig};
use super::senses::Perception;

/// Maximum number of ancestor snapshots carried by a genome.
pub const MAX_ANCESTRY: usize = 10;

/// Lowest spawn height of a node.
pub const MIN_SPAWN_HEIGHT: f32 = 0.5;

/// A point mass of the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    /// Gene id.
    pub id: GeneId,
    /// Diameter; mass grows with its cube.
    pub size: f32,
    /// Ground friction coefficient.
    pub friction: f32,
    /// Spawn position.
    pub position: Vec3,
}

/// Sensory bias that projects a sensed direction onto a muscle axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalBias {
    /// Unit axis.
    pub axis: Vec3,
    /// Gain.
    pub strength: f32,
}

/// Sensory bias driven by a scalar reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarBias {
    /// Response in `[-1, 1]`.
    pub value: f32,
    /// Gain.
    pub strength: f32,
}

/// A spring-damper connecting two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleGene {
    /// Gene id.
    pub id: GeneId,
    /// First endpoint.
    pub node_a: GeneId,
    /// Second endpoint.
    pub node_b: GeneId,
    /// Length at zero contraction.
    pub rest_length: f32,
    /// Spring constant.
    pub stiffness: f32,
    /// Damping along the muscle axis.
    pub damping: f32,
    /// Oscillation frequency in Hz.
    pub frequency: f32,
    /// Fraction of the rest length removed at full contraction.
    pub amplitude: f32,
    /// Oscillation phase in radians.
    pub phase: f32,
    /// Bias toward the active pellet.
    pub direction_bias: Option<DirectionalBias>,
    /// Bias along the body's own velocity.
    pub velocity_bias: Option<DirectionalBias>,
    /// Bias by normalized pellet distance.
    pub distance_bias: Option<ScalarBias>,
}

impl MuscleGene {
    /// True when the muscle joins `a` and `b`, in either order.
    pub fn connects(&self, a: GeneId, b: GeneId) -> bool {
        (self.node_a == a && self.node_b == b) || (self.node_a == b && self.node_b == a)
    }
}

/// Cosmetic creature color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HslColor {
    /// Hue in degrees, `[0, 360)`.
    pub h: f32,
    /// Saturation.
    pub s: f32,
    /// Lightness.
    pub l: f32,
}

impl HslColor {
    /// Random color in a readable band.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            h: rng.random_range(0.0..360.0),
            s: rng.random_range(0.5..0.9),
            l: rng.random_range(0.4..0.6),
        }
    }
}

/// Summary of an ancestor for lineage display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncestorSnapshot {
    /// Ancestor genome id.
    pub id: GenomeId,
    /// Ancestor generation.
    pub generation: u32,
    /// Fitness the ancestor reached.
    pub fitness: f32,
    /// Node count.
    pub node_count: usize,
    /// Muscle count.
    pub muscle_count: usize,
}

/// Heritable description of one creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureGenome {
    /// Genome id.
    pub id: GenomeId,
    /// Lineage depth.
    pub generation: u32,
    /// Consecutive generations this exact instance survived selection.
    pub survival_streak: u32,
    /// Zero, one or two parents.
    pub parent_ids: Vec<GenomeId>,
    /// Body nodes.
    pub nodes: Vec<NodeGene>,
    /// Body muscles.
    pub muscles: Vec<MuscleGene>,
    /// Multiplier applied to every muscle frequency.
    pub global_frequency_multiplier: f32,
    /// Muscle controller.
    pub controller: Controller,
    /// Display color.
    pub color: HslColor,
    /// Most recent ancestors, oldest first.
    #[serde(default)]
    pub ancestry: Vec<AncestorSnapshot>,
}

impl CreatureGenome {
    /// Index of the node with `id`.
    pub fn node_index(&self, id: GeneId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Number of muscles attached to node `id`.
    pub fn degree(&self, id: GeneId) -> usize {
        self.muscles
            .iter()
            .filter(|m| m.node_a == id || m.node_b == id)
            .count()
    }

    /// True when some muscle joins `a` and `b`.
    pub fn has_muscle_between(&self, a: GeneId, b: GeneId) -> bool {
        self.muscles.iter().any(|m| m.connects(a, b))
    }

    /// Frequency a muscle actually oscillates at.
    pub fn effective_frequency(&self, muscle: &MuscleGene) -> f32 {
        muscle.frequency * self.global_frequency_multiplier
    }

    /// True when every node is reachable from the first through muscles.
    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }

    /// Connected components of the muscle graph as lists of node indices.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.nodes.len();
        let mut adjacency = vec![Vec::new(); n];
        for muscle in &self.muscles {
            if let (Some(a), Some(b)) = (self.node_index(muscle.node_a), self.node_index(muscle.node_b)) {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }

        let mut seen = vec![false; n];
        let mut components = Vec::new();
        for start in 0..n {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for &next in &adjacency[node] {
                    if !seen[next] {
                        seen[next] = true;
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Snapshot of this genome for a descendant's ancestry.
    pub fn snapshot(&self, fitness: f32) -> AncestorSnapshot {
        AncestorSnapshot {
            id: self.id,
            generation: self.generation,
            fitness,
            node_count: self.nodes.len(),
            muscle_count: self.muscles.len(),
        }
    }

    /// Ancestry for a child of this genome that scored `fitness`.
    pub fn ancestry_for_child(&self, fitness: f32) -> Vec<AncestorSnapshot> {
        let mut ancestry = self.ancestry.clone();
        ancestry.push(self.snapshot(fitness));
        if ancestry.len() > MAX_ANCESTRY {
            ancestry.drain(..ancestry.len() - MAX_ANCESTRY);
        }
        ancestry
    }

    /// Replaces every gene id with a fresh one, remapping muscle endpoints.
    pub(crate) fn reassign_gene_ids(&mut self, ids: &mut IdAllocator) {
        let mut remap = Vec::with_capacity(self.nodes.len());
        for node in &mut self.nodes {
            let fresh = ids.gene();
            remap.push((node.id, fresh));
            node.id = fresh;
        }
        let lookup = |old: GeneId| {
            remap
                .iter()
                .find(|(from, _)| *from == old)
                .map_or(old, |(_, to)| *to)
        };
        for muscle in &mut self.muscles {
            muscle.id = ids.gene();
            muscle.node_a = lookup(muscle.node_a);
            muscle.node_b = lookup(muscle.node_b);
        }
    }

    /// Checks every structural invariant against `config`.
    pub fn validate(&self, config: &SimulationConfig) -> Result<(), ValidationError> {
        if !(config.min_nodes..=config.max_nodes).contains(&self.nodes.len()) {
            return Err(ValidationError::NodeCount {
                genome: self.id,
                count: self.nodes.len(),
                min: config.min_nodes,
                max: config.max_nodes,
            });
        }
        if !(1..=config.max_muscles).contains(&self.muscles.len()) {
            return Err(ValidationError::MuscleCount {
                genome: self.id,
                count: self.muscles.len(),
                min: 1,
                max: config.max_muscles,
            });
        }

        let mut seen = HashSet::with_capacity(self.nodes.len() + self.muscles.len());
        for id in self.nodes.iter().map(|n| n.id).chain(self.muscles.iter().map(|m| m.id)) {
            if !seen.insert(id) {
                return Err(ValidationError::DuplicateGene { id });
            }
        }

        for node in &self.nodes {
            if !node.size.is_finite() || !node.friction.is_finite() || !node.position.is_finite() {
                return Err(ValidationError::NonFinite { field: "node" });
            }
            if !config.node_size.contains(node.size) {
                return Err(ValidationError::NodeSize {
                    node: node.id,
                    size: node.size,
                    min: config.node_size.min,
                    max: config.node_size.max,
                });
            }
            if node.position.y < 0.0 {
                return Err(ValidationError::NodeBelowGround {
                    node: node.id,
                    y: node.position.y,
                });
            }
        }

        for muscle in &self.muscles {
            for endpoint in [muscle.node_a, muscle.node_b] {
                if self.node_index(endpoint).is_none() {
                    return Err(ValidationError::DanglingMuscle {
                        muscle: muscle.id,
                        node: endpoint,
                    });
                }
            }
            if muscle.node_a == muscle.node_b {
                return Err(ValidationError::SelfConnectedMuscle {
                    muscle: muscle.id,
                    node: muscle.node_a,
                });
            }
            let values = [
                muscle.rest_length,
                muscle.stiffness,
                muscle.damping,
                muscle.frequency,
                muscle.amplitude,
                muscle.phase,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ValidationError::NonFinite { field: "muscle" });
            }
        }

        if !self.global_frequency_multiplier.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "global_frequency_multiplier",
            });
        }

        if self.controller.kind() != config.controller {
            return Err(ValidationError::ControllerMismatch {
                expected: config.controller.label(),
                actual: self.controller.kind().label(),
            });
        }
        let input_size = Perception::from_config(config).total_input_size(config);
        self.controller.validate(input_size, config.neural_output_size())
    }
}

/// Creates a random node.
pub fn random_node<R: Rng + ?Sized>(
    config: &SimulationConfig,
    position: Vec3,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> NodeGene {
    NodeGene {
        id: ids.gene(),
        size: config.node_size.sample(rng),
        friction: config.node_friction.sample(rng),
        position,
    }
}

/// Creates a random muscle between two nodes with the given rest length.
pub fn random_muscle<R: Rng + ?Sized>(
    config: &SimulationConfig,
    a: &NodeGene,
    b: &NodeGene,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> MuscleGene {
    let rest_length = config
        .muscle_rest_length
        .clamp(a.position.distance(b.position));
    MuscleGene {
        id: ids.gene(),
        node_a: a.id,
        node_b: b.id,
        rest_length,
        stiffness: config.muscle_stiffness.sample(rng),
        damping: config.muscle_damping.sample(rng),
        frequency: config.muscle_frequency.sample(rng),
        amplitude: config.muscle_amplitude.sample(rng),
        phase: rng.random_range(0.0..PI * 2.0),
        direction_bias: Some(DirectionalBias {
            axis: random_unit_vec3(rng),
            strength: config.bias_strength.sample(rng),
        }),
        velocity_bias: Some(DirectionalBias {
            axis: random_unit_vec3(rng),
            strength: config.bias_strength.sample(rng),
        }),
        distance_bias: Some(ScalarBias {
            value: rng.random_range(-1.0..=1.0),
            strength: config.bias_strength.sample(rng),
        }),
    }
}

/// Random spawn position inside the spawn disc.
pub fn random_spawn_position<R: Rng + ?Sized>(config: &SimulationConfig, rng: &mut R) -> Vec3 {
    let angle = rng.random_range(0.0..PI * 2.0);
    let radius = config.spawn_radius * rng.random::<f32>().sqrt();
    let height = MIN_SPAWN_HEIGHT + rng.random::<f32>() * config.spawn_radius;
    Vec3::new(angle.cos() * radius, height, angle.sin() * radius)
}

/// Builds a fresh controller of the configured kind.
pub fn random_controller<R: Rng + ?Sized>(
    config: &SimulationConfig,
    innovations: &mut InnovationRegistry,
    rng: &mut R,
) -> Controller {
    let input_size = Perception::from_config(config).total_input_size(config);
    let output_size = config.neural_output_size();
    match config.controller {
        ControllerKind::Oscillator => Controller::Oscillator,
        ControllerKind::NeuralFixed => Controller::NeuralFixed(NeuralGenomeData::random(
            Topology::new(input_size, config.neural.hidden_size, output_size),
            config.neural.activation,
            rng,
        )),
        ControllerKind::NeuralVariable => Controller::NeuralVariable(NeatGenome::minimal(
            input_size,
            output_size,
            config.neural.activation,
            innovations,
            rng,
        )),
    }
}

/// Generates a random connected genome for generation 0.
///
/// A random spanning tree guarantees connectivity with exactly `N - 1`
/// muscles; up to `max_muscles - (N - 1)` extra distinct edges follow.
pub fn generate_random_genome<R: Rng + ?Sized>(
    config: &SimulationConfig,
    ids: &mut IdAllocator,
    innovations: &mut InnovationRegistry,
    rng: &mut R,
) -> CreatureGenome {
    let max_nodes = config.max_nodes.min(config.max_muscles + 1).max(config.min_nodes);
    let node_count = rng.random_range(config.min_nodes..=max_nodes);

    let nodes: Vec<NodeGene> = (0..node_count)
        .map(|_| {
            let position = random_spawn_position(config, rng);
            random_node(config, position, ids, rng)
        })
        .collect();

    let mut order: Vec<usize> = (0..node_count).collect();
    order.shuffle(rng);

    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(config.max_muscles);
    for i in 1..node_count {
        let parent = order[rng.random_range(0..i)];
        edges.push((parent, order[i]));
    }

    let mut free_pairs: Vec<(usize, usize)> = (0..node_count)
        .flat_map(|a| (a + 1..node_count).map(move |b| (a, b)))
        .filter(|&(a, b)| !edges.iter().any(|&(x, y)| (x, y) == (a, b) || (x, y) == (b, a)))
        .collect();
    free_pairs.shuffle(rng);
    let remaining = config.max_muscles.saturating_sub(edges.len());
    let extra = rng.random_range(0..=remaining.min(free_pairs.len()));
    edges.extend(free_pairs.into_iter().take(extra));

    let muscles = edges
        .into_iter()
        .map(|(a, b)| random_muscle(config, &nodes[a], &nodes[b], ids, rng))
        .collect();

    CreatureGenome {
        id: ids.genome(),
        generation: 0,
        survival_streak: 0,
        parent_ids: Vec::new(),
        nodes,
        muscles,
        global_frequency_multiplier: config.frequency_multiplier.sample(rng),
        controller: random_controller(config, innovations, rng),
        color: HslColor::random(rng),
        ancestry: Vec::new(),
    }
}

/// Copies a genome as a new lineage member with fresh ids.
pub fn clone_genome(genome: &CreatureGenome, ids: &mut IdAllocator) -> CreatureGenome {
    let mut child = genome.clone();
    child.id = ids.genome();
    child.reassign_gene_ids(ids);
    child.parent_ids = vec![genome.id];
    child.generation = genome.generation + 1;
    child.survival_streak = 0;
    child
}
