//! Geometric helpers and numeric guards used by physics and sensing.
//!
//! Vectors are `glam::Vec3` with `y` up; the ground is the XZ plane.

use std::f32::consts::PI;

use glam::{Vec3, Vec3Swizzles};
use rand::Rng;

/// Returns `value`, or 0 when it is NaN or infinite.
#[inline]
pub fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Replaces non-finite components with zero.
#[inline]
pub fn finite_vec_or_zero(v: Vec3) -> Vec3 {
    Vec3::from_array(v.to_array().map(finite_or_zero))
}

/// Distance between two points projected on the ground plane.
#[inline]
pub fn ground_distance(a: Vec3, b: Vec3) -> f32 {
    a.xz().distance(b.xz())
}

/// Linear interpolation between two scalars.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wraps an angle into `[0, 2π)`.
pub fn wrap_phase(phase: f32) -> f32 {
    let p = phase.rem_euclid(PI * 2.0);
    if p.is_finite() { p } else { 0.0 }
}

/// Samples a point uniformly on the unit sphere.
///
/// Uses the cylinder projection: uniform height in `[-1, 1]` and uniform
/// azimuth give a uniform area density.
pub fn random_unit_vec3<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.random::<f32>() * PI * 2.0;
    let y = rng.random::<f32>() * 2.0 - 1.0;
    let radial = (1.0 - y * y).max(0.0).sqrt();
    Vec3::new(theta.cos() * radial, y, theta.sin() * radial)
}
