//! The choreographer owns the whole swarm.
//!
//! It is the render-side aggregate: one formation field, the five pools,
//! the scene state machine and the orbit camera. The render loop calls
//! [`Choreographer::handle`] for each discrete event, [`Choreographer::advance`]
//! once per frame and [`Choreographer::snapshot`] to hand the result to the
//! renderer.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::camera::OrbitCamera;
use crate::error::{SwarmError, SwarmResult};
use crate::formation::FormationField;
use crate::kinds::{Foliage, Lights, PhotoCards, Props, Star};
use crate::motion::{approach_scalar, cubic_in_out, FrameContext, FOLIAGE_RATE};
use crate::pool::AgentPool;
use crate::scene::{SceneEvent, SceneMachine, SceneState};
use crate::snapshot::{shimmer, SceneFrame};

/// Frames longer than this are integrated as if they lasted this long.
pub const MAX_DT: f32 = 0.1;

// ════════════════════════════════════════════════════════════════════════════
// SwarmConfig
// ════════════════════════════════════════════════════════════════════════════

/// Tree shape and pool sizes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub tree_height:    f32,
    pub tree_radius:    f32,
    pub foliage:        usize,
    pub photos:         usize,
    pub props:          usize,
    pub lights:         usize,
    /// Distance in front of the lens at which a focused card is shown.
    pub focus_distance: f32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        SwarmConfig {
            tree_height:    22.0,
            tree_radius:    9.0,
            foliage:        15_000,
            photos:         150,
            props:          100,
            lights:         400,
            focus_distance: 20.0,
        }
    }
}

impl SwarmConfig {
    /// A light configuration for quick runs and tests.
    pub fn quick() -> Self {
        SwarmConfig { foliage: 1_500, photos: 24, props: 20, lights: 60, ..Self::default() }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Choreographer
// ════════════════════════════════════════════════════════════════════════════

pub struct Choreographer {
    field:            FormationField,
    foliage:          AgentPool<Foliage>,
    photos:           AgentPool<PhotoCards>,
    props:            AgentPool<Props>,
    lights:           AgentPool<Lights>,
    star:             AgentPool<Star>,
    machine:          SceneMachine,
    camera:           OrbitCamera,
    focus_distance:   f32,
    /// Foliage assembly progress in `[0, 1]`.
    foliage_progress: f32,
    time:             f32,
}

impl Choreographer {
    /// Build every pool. `photo_count` is the length of the photo asset
    /// list (texture indices wrap around it); `seed` makes the layout and
    /// focus picks reproducible.
    pub fn new(config: &SwarmConfig, photo_count: usize, seed: Option<u64>) -> SwarmResult<Self> {
        if !(config.focus_distance.is_finite() && config.focus_distance > 0.0) {
            return Err(SwarmError::InvalidFocusDistance(config.focus_distance));
        }
        let field = FormationField::new(config.tree_height, config.tree_radius)?;
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_entropy(),
        };

        let foliage = AgentPool::create(Foliage::default(), config.foliage, &field, &mut rng)?;
        let photos  = AgentPool::create(PhotoCards::new(photo_count), config.photos, &field, &mut rng)?;
        let props   = AgentPool::create(Props::default(), config.props, &field, &mut rng)?;
        let lights  = AgentPool::create(Lights::default(), config.lights, &field, &mut rng)?;
        let star    = AgentPool::create(Star::default(), 1, &field, &mut rng)?;

        log::info!(
            "swarm ready: {} foliage, {} photos, {} props, {} lights",
            foliage.len(), photos.len(), props.len(), lights.len(),
        );

        Ok(Choreographer {
            field,
            foliage,
            photos,
            props,
            lights,
            star,
            machine:          SceneMachine::new(seed.map(|s| s.wrapping_add(1))),
            camera:           OrbitCamera::default(),
            focus_distance:   config.focus_distance,
            foliage_progress: 0.0,
            time:             0.0,
        })
    }

    pub fn field(&self)            -> &FormationField { &self.field }
    pub fn state(&self)            -> SceneState      { self.machine.state() }
    pub fn focused(&self)          -> Option<usize>   { self.machine.focused() }
    pub fn camera(&self)           -> &OrbitCamera    { &self.camera }
    pub fn time(&self)             -> f32             { self.time }
    pub fn foliage_progress(&self) -> f32             { self.foliage_progress }
    pub fn photos(&self)           -> &AgentPool<PhotoCards> { &self.photos }

    /// Total number of agents across all pools.
    pub fn agent_count(&self) -> usize {
        self.foliage.len() + self.photos.len() + self.props.len() + self.lights.len() + self.star.len()
    }

    /// Apply one discrete event.
    pub fn handle(&mut self, event: SceneEvent) -> SceneState {
        self.machine.apply(event, self.photos.len())
    }

    /// Advance one frame. `control` is the current orbit speed (rad/s).
    pub fn advance(&mut self, dt: f32, control: f32) -> SwarmResult<()> {
        let dt = dt.clamp(0.0, MAX_DT);
        self.time += dt;

        let state = self.machine.state();
        self.camera.update(control, state, dt);

        let frame = FrameContext {
            state,
            focused:      self.machine.focused(),
            dt,
            time:         self.time,
            focus_anchor: self.camera.focus_anchor(self.focus_distance),
            eye:          self.camera.eye(),
        };

        let target = if state == SceneState::Formed { 1.0 } else { 0.0 };
        self.foliage_progress = approach_scalar(self.foliage_progress, target, FOLIAGE_RATE, dt);

        self.foliage.par_advance(&frame)?;
        self.photos.advance(&frame)?;
        self.props.advance(&frame)?;
        self.lights.advance(&frame)?;
        self.star.advance(&frame)?;
        log::trace!("frame t={:.3} dt={:.4} state={}", self.time, dt, state);
        Ok(())
    }

    /// Flatten the current frame for the renderer. Status and landmarks are
    /// left empty for the caller to fill.
    pub fn snapshot(&self) -> SwarmResult<SceneFrame> {
        let progress = self.foliage_progress;
        let mut foliage = self.foliage.transforms()?;
        if progress > 0.0 {
            for t in &mut foliage {
                t.position += shimmer(t.position, self.time, progress);
            }
        }

        Ok(SceneFrame {
            state:        self.machine.state(),
            focused:      self.machine.focused(),
            time:         self.time,
            camera:       self.camera.pose(),
            foliage,
            foliage_glow: 0.4 + 1.1 * cubic_in_out(progress),
            photos:       self.photos.transforms()?,
            props:        self.props.transforms()?,
            lights:       self.lights.transforms()?,
            star:         self.star.transforms()?,
            status:       String::new(),
            landmarks:    Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use crate::scene::Gesture;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn tiny() -> SwarmConfig {
        SwarmConfig { foliage: 200, photos: 12, props: 10, lights: 30, ..SwarmConfig::default() }
    }

    fn run(c: &mut Choreographer, frames: usize) {
        for _ in 0..frames {
            c.advance(DT, 0.0).unwrap();
        }
    }

    #[test]
    fn pool_counts_are_exact() {
        let c = Choreographer::new(&tiny(), 5, Some(1)).unwrap();
        let frame = c.snapshot().unwrap();
        assert_eq!(frame.foliage.len(), 200);
        assert_eq!(frame.photos.len(), 12);
        assert_eq!(frame.props.len(), 10);
        assert_eq!(frame.lights.len(), 30);
        assert_eq!(frame.star.len(), 1);
        assert_eq!(frame.agent_count(), c.agent_count());
    }

    #[test]
    fn zero_count_fails_fast() {
        let config = SwarmConfig { props: 0, ..tiny() };
        let err = Choreographer::new(&config, 5, Some(1)).err().unwrap();
        assert_eq!(err, SwarmError::Pool(PoolError::ZeroCount { pool: "props" }));
    }

    #[test]
    fn bad_focus_distance_rejected() {
        let config = SwarmConfig { focus_distance: 0.0, ..tiny() };
        assert!(Choreographer::new(&config, 5, Some(1)).is_err());
    }

    #[test]
    fn fist_assembles_the_tree() {
        let mut c = Choreographer::new(&tiny(), 5, Some(2)).unwrap();
        c.handle(SceneEvent::Gesture(Gesture::Fist));
        run(&mut c, 900);
        let frame = c.snapshot().unwrap();
        assert_eq!(frame.state, SceneState::Formed);
        assert_relative_eq!(c.foliage_progress(), 1.0, epsilon = 1e-3);
        assert_relative_eq!(frame.foliage_glow, 1.5, epsilon = 1e-2);
        assert!(frame.lights.iter().all(|l| l.visual.emissive >= 4.0));
        assert_relative_eq!(frame.star[0].scale, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn dispersed_foliage_is_not_shimmered() {
        let mut c = Choreographer::new(&tiny(), 5, Some(3)).unwrap();
        run(&mut c, 10);
        let frame = c.snapshot().unwrap();
        assert_eq!(frame.foliage_glow, 0.4);
        for (t, a) in frame.foliage.iter().zip(c.foliage.iter().unwrap()) {
            assert_eq!(t.position, a.position);
        }
    }

    #[test]
    fn pinch_focuses_a_card_in_front_of_the_camera() {
        let mut c = Choreographer::new(&tiny(), 5, Some(4)).unwrap();
        c.handle(SceneEvent::Gesture(Gesture::Pinch));
        let idx = c.focused().unwrap();
        run(&mut c, 300);
        let frame = c.snapshot().unwrap();
        let anchor = c.camera().focus_anchor(tiny().focus_distance);
        assert!((frame.photos[idx].position - anchor).length() < 0.05);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut c = Choreographer::new(&tiny(), 5, Some(5)).unwrap();
        c.advance(5.0, 0.0).unwrap();
        assert_relative_eq!(c.time(), MAX_DT);
    }

    #[test]
    fn same_seed_same_layout() {
        let a = Choreographer::new(&tiny(), 5, Some(6)).unwrap().snapshot().unwrap();
        let b = Choreographer::new(&tiny(), 5, Some(6)).unwrap().snapshot().unwrap();
        assert_eq!(a.photos, b.photos);
    }
}
