//! Variable-topology networks with NEAT-style historical markers.
//!
//! Neurons are evaluated in non-decreasing topological depth. Depth is found
//! by a forward breadth-first pass over enabled connections starting at the
//! inputs; unreachable neurons stay at depth 0 and every output is pinned to
//! the maximum depth of the graph so outputs never feed each other.

use std::collections::{HashMap, HashSet, VecDeque};

use ndarray::Array1;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::{Activation, gaussian, xavier_std};
use crate::simulation::error::ValidationError;

/// Role of a neuron in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuronKind {
    /// Receives one sensor value.
    Input,
    /// Internal neuron.
    Hidden,
    /// Drives one muscle slot.
    Output,
}

impl NeuronKind {
    fn eval_rank(self) -> u8 {
        match self {
            NeuronKind::Input => 0,
            NeuronKind::Hidden => 1,
            NeuronKind::Output => 2,
        }
    }
}

/// A neuron of a variable-topology genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronGene {
    /// Neuron id, stable across the population.
    pub id: u32,
    /// Role.
    pub kind: NeuronKind,
    /// Bias added before activation.
    pub bias: f32,
}

/// A weighted edge between two neurons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    /// Source neuron id.
    pub from: u32,
    /// Target neuron id.
    pub to: u32,
    /// Weight.
    pub weight: f32,
    /// Disabled connections stay in the genome but carry no signal.
    pub enabled: bool,
    /// Historical marker.
    pub innovation: u64,
}

/// Population-wide bookkeeping of structural innovations.
///
/// The same structural change receives the same innovation id (or neuron id)
/// no matter which genome makes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InnovationRegistry {
    next_innovation: u64,
    next_neuron: u32,
    connections: HashMap<u64, u64>,
    splits: HashMap<u64, u32>,
}

impl InnovationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure freshly allocated neuron ids start at or above `count`.
    pub fn reserve_neurons(&mut self, count: u32) {
        self.next_neuron = self.next_neuron.max(count);
    }

    /// Innovation id of the connection `from → to`.
    pub fn connection(&mut self, from: u32, to: u32) -> u64 {
        let key = (u64::from(from) << 32) | u64::from(to);
        let next = &mut self.next_innovation;
        *self.connections.entry(key).or_insert_with(|| {
            let id = *next;
            *next += 1;
            id
        })
    }

    /// Neuron id created when the connection `innovation` is split.
    pub fn split_neuron(&mut self, innovation: u64) -> u32 {
        let next = &mut self.next_neuron;
        *self.splits.entry(innovation).or_insert_with(|| {
            let id = *next;
            *next += 1;
            id
        })
    }

    /// Number of innovation ids issued.
    pub fn innovations_issued(&self) -> u64 {
        self.next_innovation
    }
}

/// Variable-topology network genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeatGenome {
    /// Neurons; inputs first, then outputs, then hidden neurons.
    pub neurons: Vec<NeuronGene>,
    /// Connections, enabled or not.
    pub connections: Vec<ConnectionGene>,
    /// Activation of hidden and output neurons.
    pub activation: Activation,
}

impl NeatGenome {
    /// Creates a genome with every input connected to every output.
    pub fn minimal<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Self {
        let input_ids = 0..input_size as u32;
        let output_ids = input_size as u32..(input_size + output_size) as u32;
        registry.reserve_neurons((input_size + output_size) as u32);

        let mut neurons = Vec::with_capacity(input_size + output_size);
        neurons.extend(input_ids.clone().map(|id| NeuronGene {
            id,
            kind: NeuronKind::Input,
            bias: 0.0,
        }));
        neurons.extend(output_ids.clone().map(|id| NeuronGene {
            id,
            kind: NeuronKind::Output,
            bias: 0.0,
        }));

        let std = xavier_std(input_size, output_size);
        let mut connections = Vec::with_capacity(input_size * output_size);
        for from in input_ids {
            for to in output_ids.clone() {
                connections.push(ConnectionGene {
                    from,
                    to,
                    weight: gaussian(rng) * std,
                    enabled: true,
                    innovation: registry.connection(from, to),
                });
            }
        }

        Self {
            neurons,
            connections,
            activation,
        }
    }

    /// Number of neurons of the given kind.
    pub fn count(&self, kind: NeuronKind) -> usize {
        self.neurons.iter().filter(|n| n.kind == kind).count()
    }

    fn kind_of(&self, id: u32) -> Option<NeuronKind> {
        self.neurons.iter().find(|n| n.id == id).map(|n| n.kind)
    }

    /// Checks endpoint references, connection direction, input/output widths
    /// and acyclicity of the enabled graph.
    pub fn validate(&self, input_size: usize, output_size: usize) -> Result<(), ValidationError> {
        let inputs = self.count(NeuronKind::Input);
        if inputs != input_size {
            return Err(ValidationError::TopologyMismatch {
                field: "input_size",
                expected: input_size,
                actual: inputs,
            });
        }
        let outputs = self.count(NeuronKind::Output);
        if outputs != output_size {
            return Err(ValidationError::TopologyMismatch {
                field: "output_size",
                expected: output_size,
                actual: outputs,
            });
        }

        let mut seen = HashSet::with_capacity(self.neurons.len());
        for neuron in &self.neurons {
            if !seen.insert(neuron.id) {
                return Err(ValidationError::DuplicateGene {
                    id: crate::simulation::ids::GeneId(u64::from(neuron.id)),
                });
            }
            if !neuron.bias.is_finite() {
                return Err(ValidationError::NonFinite {
                    field: "neuron bias",
                });
            }
        }

        for conn in &self.connections {
            let from = self
                .kind_of(conn.from)
                .ok_or(ValidationError::MissingNeuron {
                    innovation: conn.innovation,
                    neuron: conn.from,
                })?;
            let to = self.kind_of(conn.to).ok_or(ValidationError::MissingNeuron {
                innovation: conn.innovation,
                neuron: conn.to,
            })?;
            if from == NeuronKind::Output || to == NeuronKind::Input || conn.from == conn.to {
                return Err(ValidationError::InvalidConnection {
                    innovation: conn.innovation,
                });
            }
            if !conn.weight.is_finite() {
                return Err(ValidationError::NonFinite {
                    field: "connection weight",
                });
            }
        }

        if self.has_cycle() {
            return Err(ValidationError::CyclicNetwork);
        }
        Ok(())
    }

    /// True when the enabled connections contain a cycle.
    pub fn has_cycle(&self) -> bool {
        self.topological_order().is_none()
    }

    /// Neuron indices in Kahn order over the enabled connections, or `None`
    /// when those connections contain a cycle.
    fn topological_order(&self) -> Option<Vec<usize>> {
        let index = self.index_map();
        let mut adjacency = vec![Vec::new(); self.neurons.len()];
        let mut in_degree = vec![0usize; self.neurons.len()];
        for conn in self.connections.iter().filter(|c| c.enabled) {
            if let (Some(&a), Some(&b)) = (index.get(&conn.from), index.get(&conn.to)) {
                adjacency[a].push(b);
                in_degree[b] += 1;
            }
        }

        let mut queue: VecDeque<usize> = (0..self.neurons.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.neurons.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &adjacency[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        (order.len() == self.neurons.len()).then_some(order)
    }

    /// True when an enabled path leads from `start` to `target`.
    pub fn reaches(&self, start: u32, target: u32) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(
                self.connections
                    .iter()
                    .filter(|c| c.enabled && c.from == current)
                    .map(|c| c.to),
            );
        }
        false
    }

    /// Topological depth of every neuron, keyed by neuron id.
    pub fn depths(&self) -> HashMap<u32, u32> {
        let index = self.index_map();
        let depth = compute_depths(self, &index);
        self.neurons
            .iter()
            .zip(depth)
            .map(|(neuron, d)| (neuron.id, d))
            .collect()
    }

    /// Adds a connection between a random unconnected, acyclic pair.
    ///
    /// Returns `false` when no such pair exists.
    pub fn add_connection<R: Rng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> bool {
        let existing: HashSet<(u32, u32)> = self.connections.iter().map(|c| (c.from, c.to)).collect();
        let mut candidates = Vec::new();
        for source in self.neurons.iter().filter(|n| n.kind != NeuronKind::Output) {
            for target in self.neurons.iter().filter(|n| n.kind != NeuronKind::Input) {
                if source.id == target.id || existing.contains(&(source.id, target.id)) {
                    continue;
                }
                if self.reaches(target.id, source.id) {
                    continue;
                }
                candidates.push((source.id, target.id));
            }
        }

        let Some(&(from, to)) = candidates.choose(rng) else {
            return false;
        };
        self.connections.push(ConnectionGene {
            from,
            to,
            weight: gaussian(rng) * 0.5,
            enabled: true,
            innovation: registry.connection(from, to),
        });
        true
    }

    /// Splits a random enabled connection with a new hidden neuron.
    ///
    /// The old connection is disabled; the incoming edge gets weight 1 and the
    /// outgoing edge inherits the old weight, so behavior is initially kept.
    pub fn add_neuron<R: Rng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> bool {
        let enabled: Vec<usize> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled)
            .map(|(i, _)| i)
            .collect();
        let Some(&index) = enabled.choose(rng) else {
            return false;
        };

        let (from, to, weight, innovation) = {
            let conn = &self.connections[index];
            (conn.from, conn.to, conn.weight, conn.innovation)
        };
        let neuron = registry.split_neuron(innovation);
        if self.neurons.iter().any(|n| n.id == neuron) {
            return false;
        }

        self.connections[index].enabled = false;
        self.neurons.push(NeuronGene {
            id: neuron,
            kind: NeuronKind::Hidden,
            bias: 0.0,
        });
        self.connections.push(ConnectionGene {
            from,
            to: neuron,
            weight: 1.0,
            enabled: true,
            innovation: registry.connection(from, neuron),
        });
        self.connections.push(ConnectionGene {
            from: neuron,
            to,
            weight,
            enabled: true,
            innovation: registry.connection(neuron, to),
        });
        true
    }

    /// Flips enabled flags with probability `rate` each.
    ///
    /// Re-enabling is skipped when it would close a cycle.
    pub fn toggle_connections<R: Rng + ?Sized>(&mut self, rate: f32, rng: &mut R) {
        for i in 0..self.connections.len() {
            if rng.random::<f32>() >= rate {
                continue;
            }
            if self.connections[i].enabled {
                self.connections[i].enabled = false;
            } else {
                let (from, to) = (self.connections[i].from, self.connections[i].to);
                if !self.reaches(to, from) {
                    self.connections[i].enabled = true;
                }
            }
        }
    }

    fn index_map(&self) -> HashMap<u32, usize> {
        self.neurons
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect()
    }
}

fn compute_depths(genome: &NeatGenome, index: &HashMap<u32, usize>) -> Vec<u32> {
    let n = genome.neurons.len();
    let mut outgoing = vec![Vec::new(); n];
    for conn in genome.connections.iter().filter(|c| c.enabled) {
        if let (Some(&a), Some(&b)) = (index.get(&conn.from), index.get(&conn.to)) {
            outgoing[a].push(b);
        }
    }

    let mut depth = vec![0u32; n];
    let mut queue: VecDeque<usize> = genome
        .neurons
        .iter()
        .enumerate()
        .filter(|(_, neuron)| neuron.kind == NeuronKind::Input)
        .map(|(i, _)| i)
        .collect();
    while let Some(node) = queue.pop_front() {
        for &next in &outgoing[node] {
            let candidate = depth[node] + 1;
            // Depth can never exceed the neuron count in an acyclic graph.
            if candidate > depth[next] && (candidate as usize) <= n {
                depth[next] = candidate;
                queue.push_back(next);
            }
        }
    }

    let max_depth = depth.iter().copied().max().unwrap_or(0);
    for (i, neuron) in genome.neurons.iter().enumerate() {
        if neuron.kind == NeuronKind::Output {
            depth[i] = max_depth;
        }
    }
    depth
}

/// Evaluation plan compiled from a [`NeatGenome`].
#[derive(Debug, Clone)]
pub struct NeatNetwork {
    order: Vec<usize>,
    kinds: Vec<NeuronKind>,
    biases: Vec<f32>,
    incoming: Vec<Vec<(usize, f32)>>,
    input_slots: Vec<usize>,
    output_slots: Vec<usize>,
    activation: Activation,
}

impl NeatNetwork {
    /// Compiles a genome into an evaluation plan.
    pub fn compile(genome: &NeatGenome) -> Result<Self, ValidationError> {
        let topological = genome.topological_order().ok_or(ValidationError::CyclicNetwork)?;
        let index = genome.index_map();
        let n = genome.neurons.len();

        let mut incoming = vec![Vec::new(); n];
        for conn in genome.connections.iter().filter(|c| c.enabled) {
            let from = *index.get(&conn.from).ok_or(ValidationError::MissingNeuron {
                innovation: conn.innovation,
                neuron: conn.from,
            })?;
            let to = *index.get(&conn.to).ok_or(ValidationError::MissingNeuron {
                innovation: conn.innovation,
                neuron: conn.to,
            })?;
            incoming[to].push((from, conn.weight));
        }

        let depth = compute_depths(genome, &index);
        let mut position = vec![0usize; n];
        for (rank, &i) in topological.iter().enumerate() {
            position[i] = rank;
        }
        // Neurons cut off from the inputs all sit at depth 0; the Kahn
        // position keeps a feeding neuron ahead of the one it feeds.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| (depth[i], genome.neurons[i].kind.eval_rank(), position[i]));

        let slots = |kind: NeuronKind| -> Vec<usize> {
            genome
                .neurons
                .iter()
                .enumerate()
                .filter(|(_, neuron)| neuron.kind == kind)
                .map(|(i, _)| i)
                .collect()
        };

        Ok(Self {
            order,
            kinds: genome.neurons.iter().map(|n| n.kind).collect(),
            biases: genome.neurons.iter().map(|n| n.bias).collect(),
            incoming,
            input_slots: slots(NeuronKind::Input),
            output_slots: slots(NeuronKind::Output),
            activation: genome.activation,
        })
    }

    /// Number of input neurons.
    pub fn input_count(&self) -> usize {
        self.input_slots.len()
    }

    /// Number of output neurons.
    pub fn output_count(&self) -> usize {
        self.output_slots.len()
    }

    /// Evaluates the network once.
    pub fn activate(&self, inputs: &Array1<f32>) -> Array1<f32> {
        let mut values = vec![0.0f32; self.kinds.len()];
        for (slot, &neuron) in self.input_slots.iter().enumerate() {
            values[neuron] = inputs.get(slot).copied().unwrap_or(0.0);
        }

        for &neuron in &self.order {
            if self.kinds[neuron] == NeuronKind::Input {
                continue;
            }
            let sum: f32 = self.incoming[neuron]
                .iter()
                .map(|&(from, weight)| values[from] * weight)
                .sum::<f32>()
                + self.biases[neuron];
            values[neuron] = self.activation.apply(sum);
        }

        self.output_slots.iter().map(|&i| values[i]).collect()
    }
}
