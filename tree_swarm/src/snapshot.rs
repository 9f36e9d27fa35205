//! Per-frame render snapshot.
//!
//! The renderer never touches agents directly. Once per frame the
//! choreographer flattens every pool into plain [`AgentTransform`]s and
//! hands them over in a [`SceneFrame`].

use glam::{Quat, Vec3};

use crate::camera::CameraPose;
use crate::error::PoolResult;
use crate::kinds::{
    BulbParams, CardParams, Foliage, Lights, NeedleParams, PhotoCards, PropParams, PropShape,
    Props, Star, StarParams,
};
use crate::palette;
use crate::pool::{Agent, AgentKind, AgentPool};
use crate::scene::SceneState;

/// Render-only shimmer amplitude on the assembled foliage.
pub const SHIMMER: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Point,
    Card,
    Gift,
    Bauble,
    Cane,
    Bulb,
    Star,
}

impl From<PropShape> for Variant {
    fn from(shape: PropShape) -> Self {
        match shape {
            PropShape::Gift   => Variant::Gift,
            PropShape::Bauble => Variant::Bauble,
            PropShape::Cane   => Variant::Cane,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualParams {
    /// Base color, `0xAARRGGBB`.
    pub color:    u32,
    pub emissive: f32,
    pub variant:  Variant,
    /// Photo asset index, already wrapped to the asset list.
    pub texture:  Option<usize>,
    /// Point-size multiplier for foliage; 1 elsewhere.
    pub size:     f32,
}

impl VisualParams {
    fn plain(color: u32, variant: Variant) -> Self {
        VisualParams { color, emissive: 0.0, variant, texture: None, size: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale:    f32,
    pub visual:   VisualParams,
}

// ════════════════════════════════════════════════════════════════════════════
// Describe — agent → visual
// ════════════════════════════════════════════════════════════════════════════

/// How a pool's agents look to the renderer.
pub trait Describe: AgentKind {
    fn visual(&self, agent: &Agent<Self::Params>) -> VisualParams;
}

impl Describe for Foliage {
    fn visual(&self, agent: &Agent<NeedleParams>) -> VisualParams {
        VisualParams {
            size: 1.0 + agent.params.size,
            ..VisualParams::plain(palette::EMERALD, Variant::Point)
        }
    }
}

impl Describe for PhotoCards {
    fn visual(&self, agent: &Agent<CardParams>) -> VisualParams {
        VisualParams {
            texture: agent.params.texture,
            ..VisualParams::plain(agent.params.border, Variant::Card)
        }
    }
}

impl Describe for Props {
    fn visual(&self, agent: &Agent<PropParams>) -> VisualParams {
        VisualParams::plain(agent.params.color, agent.params.shape.into())
    }
}

impl Describe for Lights {
    fn visual(&self, agent: &Agent<BulbParams>) -> VisualParams {
        VisualParams {
            emissive: agent.intensity,
            ..VisualParams::plain(agent.params.color, Variant::Bulb)
        }
    }
}

impl Describe for Star {
    fn visual(&self, agent: &Agent<StarParams>) -> VisualParams {
        VisualParams {
            emissive: agent.intensity,
            ..VisualParams::plain(agent.params.color, Variant::Star)
        }
    }
}

impl<K: Describe> AgentPool<K> {
    /// Flatten the pool in creation order.
    pub fn transforms(&self) -> PoolResult<Vec<AgentTransform>> {
        let kind = self.kind();
        Ok(self
            .iter()?
            .map(|a| AgentTransform {
                position: a.position,
                rotation: a.rotation,
                scale:    a.scale,
                visual:   kind.visual(a),
            })
            .collect())
    }
}

/// Shimmer offset for one foliage point, scaled by assembly progress.
pub fn shimmer(position: Vec3, time: f32, progress: f32) -> Vec3 {
    Vec3::new(
        (time * 1.5 + position.x).sin(),
        (time + position.y).cos(),
        (time * 1.5 + position.z).sin(),
    ) * SHIMMER * progress
}

// ════════════════════════════════════════════════════════════════════════════
// SceneFrame
// ════════════════════════════════════════════════════════════════════════════

/// Everything the renderer draws for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneFrame {
    pub state:        SceneState,
    pub focused:      Option<usize>,
    pub time:         f32,
    pub camera:       CameraPose,
    pub foliage:      Vec<AgentTransform>,
    /// Foliage emissive mix, `0.4` dispersed up to `1.5` assembled.
    pub foliage_glow: f32,
    pub photos:       Vec<AgentTransform>,
    pub props:        Vec<AgentTransform>,
    pub lights:       Vec<AgentTransform>,
    pub star:         Vec<AgentTransform>,
    /// Status line shown in the HUD.
    pub status:       String,
    /// Normalized hand landmarks for the debug inset; empty when hidden.
    pub landmarks:    Vec<Vec3>,
}

impl SceneFrame {
    /// Pools in draw order: points, then solids, then emissive.
    pub fn pools(&self) -> [(&'static str, &[AgentTransform]); 5] {
        [
            ("foliage", &self.foliage),
            ("photos",  &self.photos),
            ("props",   &self.props),
            ("lights",  &self.lights),
            ("star",    &self.star),
        ]
    }

    pub fn agent_count(&self) -> usize {
        self.pools().iter().map(|(_, p)| p.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::FormationField;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn transforms_follow_creation_order() {
        let field = FormationField::new(22.0, 9.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let pool = AgentPool::create(PhotoCards::new(3), 7, &field, &mut rng).unwrap();
        let flat = pool.transforms().unwrap();
        assert_eq!(flat.len(), 7);
        for (i, (t, a)) in flat.iter().zip(pool.iter().unwrap()).enumerate() {
            assert_eq!(t.position, a.position);
            assert_eq!(t.visual.variant, Variant::Card);
            assert_eq!(t.visual.texture, Some(i % 3));
        }
    }

    #[test]
    fn unpopulated_pool_cannot_be_flattened() {
        let pool = AgentPool::new(Lights::default(), 4).unwrap();
        assert!(pool.transforms().is_err());
    }

    #[test]
    fn shimmer_vanishes_when_dispersed() {
        assert_eq!(shimmer(Vec3::new(1.0, 2.0, 3.0), 4.0, 0.0), Vec3::ZERO);
        let s = shimmer(Vec3::new(1.0, 2.0, 3.0), 4.0, 1.0);
        assert!(s.abs().max_element() <= SHIMMER + 1e-6);
    }

    #[test]
    fn prop_shapes_map_to_variants() {
        assert_eq!(Variant::from(PropShape::Gift), Variant::Gift);
        assert_eq!(Variant::from(PropShape::Bauble), Variant::Bauble);
        assert_eq!(Variant::from(PropShape::Cane), Variant::Cane);
    }
}
