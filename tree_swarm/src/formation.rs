//! Formation field (the cone silhouette the agents assemble into) and the
//! bounding volumes they scatter through in the chaos layout.
//!
//! The tree is centred on the Y axis, base at `y = -h/2`, apex at `y = h/2`:
//!
//! ```text
//!        /\        y =  h/2   radius 0
//!       /  \
//!      /    \
//!     /______\     y = -h/2   radius = base_radius
//! ```
//!
//! Sampling is linear in the radial offset (not area-uniform), which biases
//! foliage density toward the outer edge of each slice.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

// ════════════════════════════════════════════════════════════════════════════
// FormationField
// ════════════════════════════════════════════════════════════════════════════

/// Tree silhouette: `radius(y) = base_radius · (1 − (y + h/2)/h)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormationField {
    height:      f32,
    base_radius: f32,
}

/// Where on a height slice an agent sits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// Anywhere in the disk `[0, radius(y)]` (foliage).
    Volume,
    /// On the surface: `radius(y) · scale + offset` (ornaments, lights, props).
    Shell { scale: f32, offset: f32 },
}

impl Placement {
    /// Shell pushed `offset` units outside the silhouette.
    pub const fn outside(offset: f32) -> Self {
        Placement::Shell { scale: 1.0, offset }
    }

    /// Shell pulled inside the silhouette by a factor.
    pub const fn inside(scale: f32) -> Self {
        Placement::Shell { scale, offset: 0.0 }
    }
}

impl FormationField {
    pub fn new(height: f32, base_radius: f32) -> Result<Self, FieldError> {
        if !(height.is_finite() && height > 0.0) {
            return Err(FieldError::InvalidHeight(height));
        }
        if !(base_radius.is_finite() && base_radius >= 0.0) {
            return Err(FieldError::InvalidRadius(base_radius));
        }
        Ok(FormationField { height, base_radius })
    }

    pub fn height(&self)      -> f32 { self.height }
    pub fn base_radius(&self) -> f32 { self.base_radius }
    pub fn base_y(&self)      -> f32 { -self.height / 2.0 }
    pub fn apex_y(&self)      -> f32 {  self.height / 2.0 }

    /// Silhouette radius at height `y`; heights outside the tree clamp to
    /// the base or apex.
    pub fn radius_at(&self, y: f32) -> f32 {
        let normalized = ((y + self.height / 2.0) / self.height).clamp(0.0, 1.0);
        self.base_radius * (1.0 - normalized)
    }

    /// Deterministic part of the field: the point at height `y`, azimuth
    /// `theta`, radial offset `r`.
    pub fn point(&self, y: f32, theta: f32, r: f32) -> Vec3 {
        Vec3::new(r * theta.cos(), y, r * theta.sin())
    }

    /// Resolve a placement at `y` given a unit draw `u ∈ [0, 1)` for the
    /// radial offset (ignored for shells).
    pub fn radial_offset(&self, y: f32, placement: Placement, u: f32) -> f32 {
        let radius = self.radius_at(y);
        match placement {
            Placement::Volume => u * radius,
            Placement::Shell { scale, offset } => radius * scale + offset,
        }
    }

    /// Draw one formation position.
    pub fn sample<R: Rng>(&self, rng: &mut R, placement: Placement) -> Vec3 {
        let y     = rng.gen::<f32>() * self.height - self.height / 2.0;
        let theta = rng.gen::<f32>() * TAU;
        let r     = self.radial_offset(y, placement, rng.gen::<f32>());
        self.point(y, theta, r)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChaosVolume — the dispersed layout
// ════════════════════════════════════════════════════════════════════════════

/// Bounding volume chaos positions are drawn from, centred on the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ChaosVolume {
    Sphere { radius: f32 },
    Cube   { side: f32 },
}

impl ChaosVolume {
    /// Uniform sample inside the volume.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec3 {
        match *self {
            ChaosVolume::Sphere { radius } => {
                // Rejection keeps the distribution uniform in volume.
                loop {
                    let p = Vec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    );
                    if p.length_squared() <= 1.0 {
                        return p * radius;
                    }
                }
            }
            ChaosVolume::Cube { side } => Vec3::new(
                (rng.gen::<f32>() - 0.5) * side,
                (rng.gen::<f32>() - 0.5) * side,
                (rng.gen::<f32>() - 0.5) * side,
            ),
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        match *self {
            ChaosVolume::Sphere { radius } => p.length() <= radius + 1e-4,
            ChaosVolume::Cube { side } => {
                let half = side / 2.0 + 1e-4;
                p.x.abs() <= half && p.y.abs() <= half && p.z.abs() <= half
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn field() -> FormationField {
        FormationField::new(22.0, 9.0).unwrap()
    }

    #[test]
    fn radius_at_base_and_apex() {
        let f = field();
        assert_relative_eq!(f.radius_at(f.base_y()), 9.0);
        assert_relative_eq!(f.radius_at(f.apex_y()), 0.0);
    }

    #[test]
    fn radius_non_increasing_with_height() {
        let f = field();
        let mut prev = f32::INFINITY;
        for i in 0..=220 {
            let y = f.base_y() + i as f32 * 0.1;
            let r = f.radius_at(y);
            assert!(r <= prev + 1e-6, "radius grew at y={}", y);
            prev = r;
        }
    }

    #[test]
    fn radius_clamps_outside_tree() {
        let f = field();
        assert_relative_eq!(f.radius_at(-100.0), 9.0);
        assert_relative_eq!(f.radius_at(100.0), 0.0);
    }

    #[test]
    fn volume_samples_stay_inside_silhouette() {
        let f = field();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let p = f.sample(&mut rng, Placement::Volume);
            assert!(p.y >= f.base_y() && p.y <= f.apex_y());
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!(r <= f.radius_at(p.y) + 1e-4);
        }
    }

    #[test]
    fn shell_samples_sit_on_offset_surface() {
        let f = field();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let p = f.sample(&mut rng, Placement::outside(0.5));
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert_relative_eq!(r, f.radius_at(p.y) + 0.5, epsilon = 1e-3);
        }
    }

    #[test]
    fn inside_shell_scales_radius() {
        let f = field();
        let r = f.radial_offset(0.0, Placement::inside(0.95), 0.3);
        assert_relative_eq!(r, f.radius_at(0.0) * 0.95);
    }

    #[test]
    fn invalid_dimensions_rejected() {
        assert_eq!(FormationField::new(0.0, 9.0), Err(FieldError::InvalidHeight(0.0)));
        assert_eq!(FormationField::new(22.0, -1.0), Err(FieldError::InvalidRadius(-1.0)));
    }

    #[test]
    fn chaos_volumes_contain_their_samples() {
        let mut rng = StdRng::seed_from_u64(5);
        let sphere = ChaosVolume::Sphere { radius: 25.0 };
        let cube   = ChaosVolume::Cube { side: 60.0 };
        for _ in 0..1000 {
            assert!(sphere.contains(sphere.sample(&mut rng)));
            assert!(cube.contains(cube.sample(&mut rng)));
        }
    }
}
