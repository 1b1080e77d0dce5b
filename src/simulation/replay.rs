//! Compact frame records for external replay.
//!
//! A record is `[time, x₁, y₁, z₁, x₂, y₂, z₂, …]` in genome node order.

use glam::Vec3;

use super::error::ReplayError;
use super::genome::CreatureGenome;
use super::geometric_utils::finite_vec_or_zero;
use super::pellet::PelletData;
use super::physics::node_mass;
use super::simulator::SimulationFrame;

/// Flattens a frame into a record.
pub fn encode_frame(frame: &SimulationFrame) -> Vec<f32> {
    let mut record = Vec::with_capacity(1 + frame.positions.len() * 3);
    record.push(frame.time);
    for (_, position) in &frame.positions {
        record.extend(position.to_array());
    }
    record
}

/// Flattens every frame of a run.
pub fn encode_frames(frames: &[SimulationFrame]) -> Vec<Vec<f32>> {
    frames.iter().map(encode_frame).collect()
}

/// Rebuilds a frame from a record.
///
/// Node ids come from `genome`; the center of mass is recomputed from node
/// masses. The active pellet is the one spawned at or before the frame time
/// and not yet collected, given `frame_index` and the run's pellet log.
pub fn decode_frame(
    record: &[f32],
    genome: &CreatureGenome,
    pellets: &[PelletData],
    frame_index: usize,
) -> Result<SimulationFrame, ReplayError> {
    let (&time, coords) = record.split_first().ok_or(ReplayError::Empty)?;
    let expected = 1 + genome.nodes.len() * 3;
    if record.len() != expected {
        return Err(ReplayError::RecordLength {
            expected,
            actual: record.len(),
        });
    }

    let positions: Vec<_> = genome
        .nodes
        .iter()
        .zip(coords.chunks_exact(3))
        .map(|(node, xyz)| (node.id, Vec3::new(xyz[0], xyz[1], xyz[2])))
        .collect();

    let (weighted, total) = genome.nodes.iter().zip(&positions).fold(
        (Vec3::ZERO, 0.0f32),
        |(sum, total), (node, (_, position))| {
            let mass = node_mass(node.size);
            (sum + *position * mass, total + mass)
        },
    );
    let center_of_mass = if total > 0.0 {
        finite_vec_or_zero(weighted / total)
    } else {
        Vec3::ZERO
    };

    let active_pellet = pellets
        .iter()
        .find(|p| {
            p.spawned_frame <= frame_index && p.collected_frame.is_none_or(|c| c > frame_index)
        })
        .map(|p| p.id);

    Ok(SimulationFrame {
        time,
        positions,
        center_of_mass,
        active_pellet,
    })
}
