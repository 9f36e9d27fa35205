//! The five pools that make up the memory tree and how each randomizes its
//! agents.

use std::f32::consts::PI;

use glam::{EulerRot, Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::formation::{ChaosVolume, FormationField, Placement};
use crate::palette;
use crate::pool::{Agent, AgentKind};

/// Uniform draw in `[-half, half)` for each axis.
fn spin<R: Rng>(rng: &mut R, half: f32) -> Vec3 {
    Vec3::new(
        (rng.gen::<f32>() - 0.5) * 2.0 * half,
        (rng.gen::<f32>() - 0.5) * 2.0 * half,
        (rng.gen::<f32>() - 0.5) * 2.0 * half,
    )
}

/// Random initial orientation with each Euler angle in `[0, π)`.
fn tumbled<R: Rng>(rng: &mut R) -> Quat {
    Quat::from_euler(
        EulerRot::XYZ,
        rng.gen::<f32>() * PI,
        rng.gen::<f32>() * PI,
        rng.gen::<f32>() * PI,
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Foliage — emerald needle points
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Foliage {
    pub chaos: ChaosVolume,
}

impl Default for Foliage {
    fn default() -> Self {
        Foliage { chaos: ChaosVolume::Sphere { radius: 25.0 } }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct NeedleParams {
    /// Size class in `[0, 1)`; point size scales with `1 + size`.
    pub size: f32,
}

impl AgentKind for Foliage {
    type Params = NeedleParams;

    fn name(&self) -> &'static str { "foliage" }

    fn spawn<R: Rng>(&self, _index: usize, field: &FormationField, rng: &mut R) -> Agent<NeedleParams> {
        let chaos     = self.chaos.sample(rng);
        let formation = field.sample(rng, Placement::Volume);
        Agent::at_chaos(chaos, formation, 1.0, NeedleParams { size: rng.gen() })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PhotoCards — double-sided polaroids
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhotoCards {
    pub chaos:        ChaosVolume,
    pub shell_offset: f32,
    /// Length of the photo asset list; texture indices wrap modulo this.
    pub photo_count:  usize,
}

impl PhotoCards {
    pub fn new(photo_count: usize) -> Self {
        PhotoCards {
            chaos:        ChaosVolume::Cube { side: 70.0 },
            shell_offset: 0.5,
            photo_count,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CardParams {
    pub base_scale:    f32,
    /// Inertia in `[0.8, 2.0)`; heavier cards settle onto the tree slower.
    pub weight:        f32,
    pub border:        u32,
    /// `None` only when the photo list is empty.
    pub texture:       Option<usize>,
    pub spin:          Vec3,
    pub wobble_offset: f32,
    pub wobble_speed:  f32,
}

impl AgentKind for PhotoCards {
    type Params = CardParams;

    fn name(&self) -> &'static str { "photos" }

    fn spawn<R: Rng>(&self, index: usize, field: &FormationField, rng: &mut R) -> Agent<CardParams> {
        let chaos     = self.chaos.sample(rng);
        let formation = field.sample(rng, Placement::outside(self.shell_offset));

        let big        = rng.gen_bool(0.2);
        let base_scale = if big { 2.2 } else { 0.8 + rng.gen::<f32>() * 0.6 };
        let params = CardParams {
            base_scale,
            weight:        0.8 + rng.gen::<f32>() * 1.2,
            border:        palette::pick(rng, &palette::BORDERS),
            texture:       (self.photo_count > 0).then(|| index % self.photo_count),
            spin:          spin(rng, 0.5),
            wobble_offset: rng.gen::<f32>() * 10.0,
            wobble_speed:  0.5 + rng.gen::<f32>() * 0.5,
        };

        let mut agent = Agent::at_chaos(chaos, formation, base_scale, params);
        agent.rotation = tumbled(rng);
        agent
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Props — gift boxes, baubles and candy canes
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropShape { Gift, Bauble, Cane }

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Props {
    pub chaos:       ChaosVolume,
    pub shell_scale: f32,
}

impl Default for Props {
    fn default() -> Self {
        Props { chaos: ChaosVolume::Cube { side: 60.0 }, shell_scale: 0.95 }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PropParams {
    pub shape: PropShape,
    pub color: u32,
    pub spin:  Vec3,
}

impl AgentKind for Props {
    type Params = PropParams;

    fn name(&self) -> &'static str { "props" }

    fn spawn<R: Rng>(&self, _index: usize, field: &FormationField, rng: &mut R) -> Agent<PropParams> {
        let chaos     = self.chaos.sample(rng);
        let formation = field.sample(rng, Placement::inside(self.shell_scale));

        let (shape, color, scale) = match rng.gen_range(0..3) {
            0 => (PropShape::Gift,   palette::pick(rng, &palette::GIFTS), 0.8 + rng.gen::<f32>() * 0.4),
            1 => (PropShape::Bauble, palette::pick(rng, &palette::GIFTS), 0.6 + rng.gen::<f32>() * 0.4),
            _ => {
                let color = if rng.gen_bool(0.5) { palette::RED } else { palette::WHITE };
                (PropShape::Cane, color, 0.7 + rng.gen::<f32>() * 0.3)
            }
        };

        let params = PropParams { shape, color, spin: spin(rng, 1.0) };
        let mut agent = Agent::at_chaos(chaos, formation, scale, params);
        agent.rotation = tumbled(rng);
        agent
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Lights — blinking fairy bulbs
// ════════════════════════════════════════════════════════════════════════════

pub const BULB_SCALE: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lights {
    pub chaos:        ChaosVolume,
    pub shell_offset: f32,
}

impl Default for Lights {
    fn default() -> Self {
        Lights { chaos: ChaosVolume::Cube { side: 60.0 }, shell_offset: 0.3 }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BulbParams {
    pub color:       u32,
    /// Blink angular frequency in `[2, 5)` rad/s.
    pub speed:       f32,
    pub time_offset: f32,
}

impl AgentKind for Lights {
    type Params = BulbParams;

    fn name(&self) -> &'static str { "lights" }

    fn spawn<R: Rng>(&self, _index: usize, field: &FormationField, rng: &mut R) -> Agent<BulbParams> {
        let chaos     = self.chaos.sample(rng);
        let formation = field.sample(rng, Placement::outside(self.shell_offset));
        let params = BulbParams {
            color:       palette::pick(rng, &palette::LIGHTS),
            speed:       2.0 + rng.gen::<f32>() * 3.0,
            time_offset: rng.gen::<f32>() * 100.0,
        };
        Agent::at_chaos(chaos, formation, BULB_SCALE, params)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Star — the single gold topper
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    /// Height above the apex.
    pub lift: f32,
}

impl Default for Star {
    fn default() -> Self { Star { lift: 1.8 } }
}

#[derive(Clone, Copy, Debug)]
pub struct StarParams {
    pub color: u32,
}

impl AgentKind for Star {
    type Params = StarParams;

    fn name(&self) -> &'static str { "star" }

    /// The star never travels; it only grows in and shrinks away.
    fn spawn<R: Rng>(&self, _index: usize, field: &FormationField, _rng: &mut R) -> Agent<StarParams> {
        let top = Vec3::new(0.0, field.apex_y() + self.lift, 0.0);
        Agent::at_chaos(top, top, 0.0, StarParams { color: palette::GOLD })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::AgentPool;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn field() -> FormationField {
        FormationField::new(22.0, 9.0).unwrap()
    }

    #[test]
    fn photo_textures_wrap_modulo_asset_count() {
        let mut rng = StdRng::seed_from_u64(9);
        let pool = AgentPool::create(PhotoCards::new(4), 10, &field(), &mut rng).unwrap();
        let textures: Vec<_> = pool.iter().unwrap().map(|a| a.params.texture).collect();
        assert_eq!(textures[0], Some(0));
        assert_eq!(textures[4], Some(0));
        assert_eq!(textures[9], Some(1));
    }

    #[test]
    fn photo_without_assets_has_no_texture() {
        let mut rng = StdRng::seed_from_u64(9);
        let pool = AgentPool::create(PhotoCards::new(0), 3, &field(), &mut rng).unwrap();
        assert!(pool.iter().unwrap().all(|a| a.params.texture.is_none()));
    }

    #[test]
    fn photo_params_in_range() {
        let mut rng = StdRng::seed_from_u64(10);
        let pool = AgentPool::create(PhotoCards::new(32), 200, &field(), &mut rng).unwrap();
        for a in pool.iter().unwrap() {
            let p = &a.params;
            assert!(p.weight >= 0.8 && p.weight < 2.0);
            assert!(p.base_scale == 2.2 || (p.base_scale >= 0.8 && p.base_scale < 1.4));
            assert!(p.wobble_speed >= 0.5 && p.wobble_speed < 1.0);
            assert!(palette::BORDERS.contains(&p.border));
            assert!(PhotoCards::new(32).chaos.contains(a.chaos));
        }
    }

    #[test]
    fn props_cover_all_shapes() {
        let mut rng = StdRng::seed_from_u64(12);
        let pool = AgentPool::create(Props::default(), 100, &field(), &mut rng).unwrap();
        let shapes: Vec<_> = pool.iter().unwrap().map(|a| a.params.shape).collect();
        assert!(shapes.contains(&PropShape::Gift));
        assert!(shapes.contains(&PropShape::Bauble));
        assert!(shapes.contains(&PropShape::Cane));
    }

    #[test]
    fn lights_sit_just_outside_the_tree() {
        let f = field();
        let mut rng = StdRng::seed_from_u64(13);
        let pool = AgentPool::create(Lights::default(), 50, &f, &mut rng).unwrap();
        for a in pool.iter().unwrap() {
            let r = (a.formation.x.powi(2) + a.formation.z.powi(2)).sqrt();
            assert_relative_eq!(r, f.radius_at(a.formation.y) + 0.3, epsilon = 1e-3);
            assert_relative_eq!(a.scale, BULB_SCALE);
        }
    }

    #[test]
    fn star_sits_above_apex() {
        let f = field();
        let mut rng = StdRng::seed_from_u64(14);
        let pool = AgentPool::create(Star::default(), 1, &f, &mut rng).unwrap();
        let star = &pool.agents().unwrap()[0];
        assert_relative_eq!(star.formation.y, 11.0 + 1.8);
        assert_eq!(star.scale, 0.0);
    }
}
