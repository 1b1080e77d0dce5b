//! Food pellets the creatures are rewarded for reaching.
//!
//! Pellets appear one at a time: pellet `k` spawns the frame pellet `k - 1` is
//! collected. Spawn angles and distances are drawn up front from the pellet
//! seed, so every creature sharing a seed faces the same layout relative to
//! its own center of mass.

use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::geometric_utils::ground_distance;
use super::params::SimulationConfig;
use super::physics::BodyState;
use super::rng::create_rng;

/// A pellet placed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PelletData {
    /// Spawn order, starting at 0.
    pub id: usize,
    /// World position.
    pub position: Vec3,
    /// Frame at which a node first touched the pellet.
    pub collected_frame: Option<usize>,
    /// Frame at which the pellet appeared.
    pub spawned_frame: usize,
    /// Ground distance from the center of mass at spawn time.
    pub initial_distance: f32,
}

impl PelletData {
    /// True once collected.
    pub fn is_collected(&self) -> bool {
        self.collected_frame.is_some()
    }
}

/// Sequential pellet spawner and collision tracker for one run.
#[derive(Debug, Clone)]
pub struct PelletField {
    layout: Vec<(f32, f32)>,
    pellets: Vec<PelletData>,
    radius: f32,
}

impl PelletField {
    /// Draws the layout for `config.pellet_count` pellets from `seed`.
    pub fn new(config: &SimulationConfig, seed: u64) -> Self {
        let mut rng = create_rng(seed);
        let (near, far) = (config.pellet_min_distance, config.arena_size.max(config.pellet_min_distance));
        let layout = (0..config.pellet_count)
            .map(|_| {
                let angle = rng.random_range(0.0..PI * 2.0);
                let distance = near + rng.random::<f32>() * (far - near);
                (angle, distance)
            })
            .collect();
        Self {
            layout,
            pellets: Vec::with_capacity(config.pellet_count),
            radius: config.pellet_radius,
        }
    }

    /// Spawns the next pellet around `origin` if any remain.
    pub fn spawn_next(&mut self, origin: Vec3, frame: usize) -> Option<usize> {
        let id = self.pellets.len();
        let &(angle, distance) = self.layout.get(id)?;
        let offset = Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
        let position = Vec3::new(origin.x + offset.x, self.radius, origin.z + offset.z);
        self.pellets.push(PelletData {
            id,
            position,
            collected_frame: None,
            spawned_frame: frame,
            initial_distance: ground_distance(position, origin),
        });
        Some(id)
    }

    /// Index of the pellet currently waiting to be collected.
    pub fn active_index(&self) -> Option<usize> {
        self.pellets
            .last()
            .filter(|p| !p.is_collected())
            .map(|p| p.id)
    }

    /// The pellet currently waiting to be collected.
    pub fn active(&self) -> Option<&PelletData> {
        self.pellets.last().filter(|p| !p.is_collected())
    }

    /// Marks the active pellet collected if any node touches it, then spawns
    /// the next one. Returns `true` on collection.
    pub fn check_collection(&mut self, body: &BodyState, frame: usize) -> bool {
        let radius = self.radius;
        let Some(active) = self.pellets.last_mut().filter(|p| !p.is_collected()) else {
            return false;
        };
        let touched = body
            .nodes
            .iter()
            .any(|node| node.position.distance(active.position) < node.radius + radius);
        if !touched {
            return false;
        }
        active.collected_frame = Some(frame);
        self.spawn_next(body.center_of_mass(), frame);
        true
    }

    /// Number of pellets collected.
    pub fn collected(&self) -> usize {
        self.pellets.iter().filter(|p| p.is_collected()).count()
    }

    /// Pellets spawned so far.
    pub fn pellets(&self) -> &[PelletData] {
        &self.pellets
    }

    /// Consumes the field, returning every spawned pellet.
    pub fn into_pellets(self) -> Vec<PelletData> {
        self.pellets
    }
}
