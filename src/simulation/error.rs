//! Error types raised by the engine.
//!
//! Disqualification is not an error: it is reported on the simulation result.

#![allow(missing_docs)]

use thiserror::Error;

use super::ids::{GeneId, GenomeId};

/// Structural invariant violations found on a genome before it is simulated.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("genome {genome} has {count} nodes, expected between {min} and {max}")]
    NodeCount {
        genome: GenomeId,
        count: usize,
        min: usize,
        max: usize,
    },
    #[error("genome {genome} has {count} muscles, expected between {min} and {max}")]
    MuscleCount {
        genome: GenomeId,
        count: usize,
        min: usize,
        max: usize,
    },
    #[error("gene id {id} appears more than once")]
    DuplicateGene { id: GeneId },
    #[error("muscle {muscle} references missing node {node}")]
    DanglingMuscle { muscle: GeneId, node: GeneId },
    #[error("muscle {muscle} connects node {node} to itself")]
    SelfConnectedMuscle { muscle: GeneId, node: GeneId },
    #[error("node {node} size {size} outside [{min}, {max}]")]
    NodeSize {
        node: GeneId,
        size: f32,
        min: f32,
        max: f32,
    },
    #[error("node {node} sits below the ground plane (y = {y})")]
    NodeBelowGround { node: GeneId, y: f32 },
    #[error("non-finite value in {field}")]
    NonFinite { field: &'static str },
    #[error("neural weight vector has {actual} entries, topology requires {expected}")]
    WeightCount { expected: usize, actual: usize },
    #[error("network {field} is {actual}, configuration requires {expected}")]
    TopologyMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("connection {innovation} references missing neuron {neuron}")]
    MissingNeuron { innovation: u64, neuron: u32 },
    #[error("connection {innovation} has an invalid direction")]
    InvalidConnection { innovation: u64 },
    #[error("enabled connections form a cycle")]
    CyclicNetwork,
    #[error("controller kind {actual} does not match configured kind {expected}")]
    ControllerMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Inconsistent configuration, rejected when a population is created.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid range for {field}: min {min} > max {max}")]
    InvalidRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("invalid bounds for {field}: min {min} > max {max}")]
    InvalidBounds {
        field: &'static str,
        min: usize,
        max: usize,
    },
    #[error("{field} must be within [{low}, {high}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        low: f32,
        high: f32,
    },
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Frame transport decoding failures.
#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("frame record has {actual} values, expected {expected}")]
    RecordLength { expected: usize, actual: usize },
    #[error("frame record is empty")]
    Empty,
}

/// Failures raised while advancing a generation.
#[derive(Debug, Error, PartialEq)]
pub enum EvolutionError {
    #[error("cannot evolve an empty population")]
    EmptyPopulation,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Checkpoint persistence failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
