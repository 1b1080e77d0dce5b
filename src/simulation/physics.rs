//! Mass-spring integrator.
//!
//! Nodes are point masses; muscles are spring-dampers whose rest length is
//! modulated by the controller every frame. Integration is semi-implicit Euler
//! over `physics_substeps` substeps per recorded frame.

use std::f32::consts::PI;

use glam::Vec3;

use super::error::ValidationError;
use super::genome::{CreatureGenome, MuscleGene};
use super::geometric_utils::{finite_or_zero, finite_vec_or_zero};
use super::params::SimulationConfig;

/// Lower bound on node mass.
pub const MIN_NODE_MASS: f32 = 0.005;
/// Lower bound on a contracted rest length.
pub const MIN_REST_LENGTH: f32 = 0.05;
/// Speed limit of a single node.
pub const MAX_NODE_SPEED: f32 = 50.0;

/// Simulated state of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct PointMass {
    /// Position.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Mass, `size³`.
    pub mass: f32,
    /// Collision radius, `size / 2`.
    pub radius: f32,
    /// Friction coefficient from the gene.
    pub friction: f32,
    /// Touching the ground after the last substep.
    pub on_ground: bool,
}

/// A muscle resolved to node indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    /// Index of the first node.
    pub a: usize,
    /// Index of the second node.
    pub b: usize,
    /// Uncontracted rest length.
    pub base_length: f32,
    /// Spring constant.
    pub stiffness: f32,
    /// Damping coefficient.
    pub damping: f32,
}

/// The physical body of a creature during a run.
#[derive(Debug, Clone)]
pub struct BodyState {
    /// Nodes, in genome order.
    pub nodes: Vec<PointMass>,
    /// Muscles, in genome order.
    pub springs: Vec<Spring>,
    anomalies: usize,
}

impl BodyState {
    /// Builds the initial body from a genome: gene positions, zero velocity.
    pub fn from_genome(genome: &CreatureGenome) -> Result<Self, ValidationError> {
        let nodes = genome
            .nodes
            .iter()
            .map(|node| PointMass {
                position: node.position,
                velocity: Vec3::ZERO,
                mass: node_mass(node.size),
                radius: node.size * 0.5,
                friction: node.friction,
                on_ground: node.position.y <= node.size * 0.5,
            })
            .collect();

        let springs = genome
            .muscles
            .iter()
            .map(|muscle| {
                let index = |id| {
                    genome
                        .node_index(id)
                        .ok_or(ValidationError::DanglingMuscle {
                            muscle: muscle.id,
                            node: id,
                        })
                };
                Ok(Spring {
                    a: index(muscle.node_a)?,
                    b: index(muscle.node_b)?,
                    base_length: muscle.rest_length,
                    stiffness: muscle.stiffness,
                    damping: muscle.damping,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            nodes,
            springs,
            anomalies: 0,
        })
    }

    /// Mass-weighted average position.
    pub fn center_of_mass(&self) -> Vec3 {
        self.weighted(|n| n.position)
    }

    /// Mass-weighted average velocity.
    pub fn center_of_mass_velocity(&self) -> Vec3 {
        self.weighted(|n| n.velocity)
    }

    fn weighted(&self, value: impl Fn(&PointMass) -> Vec3) -> Vec3 {
        let total: f32 = self.nodes.iter().map(|n| n.mass).sum();
        if total <= 0.0 {
            return Vec3::ZERO;
        }
        let sum = self
            .nodes
            .iter()
            .fold(Vec3::ZERO, |acc, n| acc + value(n) * n.mass);
        finite_vec_or_zero(sum / total)
    }

    /// Current length of spring `k`.
    pub fn spring_length(&self, k: usize) -> f32 {
        let spring = &self.springs[k];
        self.nodes[spring.a]
            .position
            .distance(self.nodes[spring.b].position)
    }

    /// Number of non-finite values neutralized so far.
    pub fn anomalies(&self) -> usize {
        self.anomalies
    }

    /// Advances one recorded frame using `rest_lengths[k]` for spring `k`.
    pub fn advance_frame(&mut self, rest_lengths: &[f32], config: &SimulationConfig) {
        let dt = config.substep_dt();
        for _ in 0..config.physics_substeps.max(1) {
            self.substep(rest_lengths, config, dt);
        }
    }

    /// One semi-implicit Euler substep.
    pub fn substep(&mut self, rest_lengths: &[f32], config: &SimulationConfig, dt: f32) {
        let mut forces: Vec<Vec3> = self
            .nodes
            .iter()
            .map(|n| Vec3::new(0.0, config.gravity * n.mass, 0.0))
            .collect();

        for (k, spring) in self.springs.iter().enumerate() {
            let (pa, pb) = (&self.nodes[spring.a], &self.nodes[spring.b]);
            let delta = pb.position - pa.position;
            let length = delta.length();
            if length < 1e-6 {
                continue;
            }
            let axis = delta / length;
            let rest = rest_lengths.get(k).copied().unwrap_or(spring.base_length);
            let stretch = spring.stiffness * (length - rest);
            let closing = spring.damping * (pb.velocity - pa.velocity).dot(axis);
            let force = axis * finite_or_zero(stretch + closing);
            forces[spring.a] += force;
            forces[spring.b] -= force;
        }

        let ground_decel = config.gravity.abs() * config.ground_friction;
        for (node, force) in self.nodes.iter_mut().zip(forces) {
            let previous = node.position;

            node.velocity += force * (dt / node.mass);
            node.velocity = node.velocity.clamp_length_max(MAX_NODE_SPEED);
            node.position += node.velocity * dt;

            node.on_ground = node.position.y <= node.radius;
            if node.on_ground {
                node.position.y = node.radius;
                if node.velocity.y < 0.0 {
                    node.velocity.y = 0.0;
                }
                let horizontal = node.velocity.with_y(0.0);
                let speed = horizontal.length();
                if speed > 0.0 {
                    let reduced = (speed - node.friction * ground_decel * dt).max(0.0);
                    let scaled = horizontal * (reduced / speed);
                    node.velocity.x = scaled.x;
                    node.velocity.z = scaled.z;
                }
            }

            if !node.position.is_finite() || !node.velocity.is_finite() {
                node.position = previous;
                node.velocity = Vec3::ZERO;
                self.anomalies += 1;
            }
        }
    }
}

/// Mass of a node of the given size.
pub fn node_mass(size: f32) -> f32 {
    size.powi(3).max(MIN_NODE_MASS)
}

/// Contracted rest length for activation `signal ∈ [-1, 1]`.
pub fn contracted_rest_length(base: f32, signal: f32, amplitude: f32) -> f32 {
    let s = finite_or_zero(signal).clamp(-1.0, 1.0);
    (base * (1.0 - s * amplitude)).max(MIN_REST_LENGTH)
}

/// Oscillator activation of a muscle at time `t`, shifted by a sensory `bias`.
pub fn oscillator_signal(muscle: &MuscleGene, multiplier: f32, t: f32, bias: f32) -> f32 {
    let angle = t * muscle.frequency * multiplier * 2.0 * PI + muscle.phase;
    (angle.sin() + finite_or_zero(bias)).clamp(-1.0, 1.0)
}
