//! Motion integrator — per-agent, per-frame update.
//!
//! Every agent eases toward the target its pool selects for the current
//! scene state using a frame-time-scaled exponential approach:
//!
//! ```text
//! position += (target − position) · min(1, rate · Δt)
//! ```
//!
//! The factor is clamped to 1, so a long frame lands on the target instead
//! of overshooting it. Agents never read each other, so a pool can be
//! stepped in any order (the foliage pool is stepped in parallel).

use glam::{EulerRot, Quat, Vec3};
use rayon::prelude::*;

use crate::error::PoolResult;
use crate::kinds::{BulbParams, CardParams, Foliage, Lights, NeedleParams, PhotoCards, PropParams, Props, Star, StarParams};
use crate::pool::{Agent, AgentKind, AgentPool};
use crate::scene::SceneState;

// ── Approach rates (1/s) ──────────────────────────────────────────────────────
pub const FOLIAGE_RATE:      f32 = 1.5;
/// Photo cards in `Formed`; divided by the card's weight.
pub const CARD_FORMED_RATE:  f32 = 1.6;
pub const CARD_CHAOS_RATE:   f32 = 0.5;
/// A focused card snaps to the camera much faster than ambient motion.
pub const CARD_FOCUS_RATE:   f32 = 6.0;
pub const CARD_TURN_RATE:    f32 = 4.0;
pub const CARD_SCALE_RATE:   f32 = 3.0;
pub const PROP_RATE:         f32 = 1.5;
pub const LIGHT_RATE:        f32 = 2.0;
pub const STAR_SCALE_RATE:   f32 = 3.0;

// ── Shape of the secondary motion ─────────────────────────────────────────────
pub const WOBBLE_AMPLITUDE:  f32 = 0.05;
pub const FOCUS_SCALE:       f32 = 4.5;
/// Scale of the other cards while one is focused.
pub const BACKDROP_SCALE:    f32 = 0.6;
pub const STAR_SPIN:         f32 = 0.5;
pub const BULB_BASE_GLOW:    f32 = 4.0;
pub const BULB_BLINK_GLOW:   f32 = 6.0;

/// Everything an agent needs to know about the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub state:        SceneState,
    /// Focused photo card (only meaningful in `Focus`).
    pub focused:      Option<usize>,
    /// Seconds since the previous frame.
    pub dt:           f32,
    /// Seconds since start.
    pub time:         f32,
    pub focus_anchor: Vec3,
    pub eye:          Vec3,
}

impl FrameContext {
    fn formed(&self) -> bool { self.state == SceneState::Formed }

    fn is_focused(&self, index: usize) -> bool {
        self.state == SceneState::Focus && self.focused == Some(index)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Easing helpers
// ════════════════════════════════════════════════════════════════════════════

/// `min(1, rate · dt)`, never negative.
pub fn approach_factor(rate: f32, dt: f32) -> f32 {
    (rate * dt).clamp(0.0, 1.0)
}

pub fn approach(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    current + (target - current) * approach_factor(rate, dt)
}

pub fn approach_scalar(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * approach_factor(rate, dt)
}

/// Cubic ease-in-out on `[0, 1]`.
pub fn cubic_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        0.5 * (2.0 * t - 2.0).powi(3) + 1.0
    }
}

/// Orientation whose local +Z points along `dir` with Y kept up.
pub fn facing(dir: Vec3) -> Quat {
    let len = dir.length();
    if len < 1e-6 {
        return Quat::IDENTITY;
    }
    let yaw   = dir.x.atan2(dir.z);
    let pitch = -(dir.y / len).clamp(-1.0, 1.0).asin();
    Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch)
}

fn tumble(rotation: Quat, spin: Vec3, dt: f32) -> Quat {
    let delta = Quat::from_euler(EulerRot::XYZ, spin.x * dt, spin.y * dt, spin.z * dt);
    (rotation * delta).normalize()
}

// ════════════════════════════════════════════════════════════════════════════
// Animate — per-kind step
// ════════════════════════════════════════════════════════════════════════════

pub trait Animate: AgentKind {
    fn step(&self, index: usize, agent: &mut Agent<Self::Params>, frame: &FrameContext);
}

impl<K: Animate> AgentPool<K> {
    /// Step every agent once, in creation order.
    pub fn advance(&mut self, frame: &FrameContext) -> PoolResult<()> {
        let (kind, agents) = self.parts_mut()?;
        for (i, agent) in agents.iter_mut().enumerate() {
            kind.step(i, agent, frame);
        }
        Ok(())
    }
}

impl<K: Animate + Sync> AgentPool<K> {
    /// Step every agent once across the rayon pool.
    pub fn par_advance(&mut self, frame: &FrameContext) -> PoolResult<()> {
        let (kind, agents) = self.parts_mut()?;
        agents
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, agent)| kind.step(i, agent, frame));
        Ok(())
    }
}

impl Animate for Foliage {
    fn step(&self, _index: usize, agent: &mut Agent<NeedleParams>, frame: &FrameContext) {
        let target = if frame.formed() { agent.formation } else { agent.chaos };
        agent.position = approach(agent.position, target, FOLIAGE_RATE, frame.dt);
    }
}

impl Animate for PhotoCards {
    fn step(&self, index: usize, agent: &mut Agent<CardParams>, frame: &FrameContext) {
        let p  = agent.params;
        let dt = frame.dt;

        if frame.is_focused(index) {
            agent.position = approach(agent.position, frame.focus_anchor, CARD_FOCUS_RATE, dt);
            agent.rotation = facing(frame.eye - agent.position);
            agent.scale = approach_scalar(agent.scale, p.base_scale * FOCUS_SCALE, CARD_FOCUS_RATE, dt);
            return;
        }

        if frame.formed() {
            agent.position = approach(agent.position, agent.formation, CARD_FORMED_RATE / p.weight, dt);

            // Face away from the trunk, tilted slightly up, with a gentle
            // two-sine wobble so the tree never looks frozen.
            let outward = Vec3::new(agent.position.x, 0.5, agent.position.z);
            let t = frame.time;
            let wobble = Quat::from_euler(
                EulerRot::XYZ,
                (t * p.wobble_speed + p.wobble_offset).sin() * WOBBLE_AMPLITUDE,
                0.0,
                (t * p.wobble_speed * 0.8 + p.wobble_offset).cos() * WOBBLE_AMPLITUDE,
            );
            let target = facing(outward) * wobble;
            agent.rotation = agent.rotation.slerp(target, approach_factor(CARD_TURN_RATE, dt));
        } else {
            agent.position = approach(agent.position, agent.chaos, CARD_CHAOS_RATE, dt);
            agent.rotation = tumble(agent.rotation, p.spin, dt);
        }

        let target_scale = match frame.state {
            SceneState::Focus => p.base_scale * BACKDROP_SCALE,
            _                 => p.base_scale,
        };
        agent.scale = approach_scalar(agent.scale, target_scale, CARD_SCALE_RATE, dt);
    }
}

impl Animate for Props {
    fn step(&self, _index: usize, agent: &mut Agent<PropParams>, frame: &FrameContext) {
        let target = if frame.formed() { agent.formation } else { agent.chaos };
        agent.position = approach(agent.position, target, PROP_RATE, frame.dt);
        agent.rotation = tumble(agent.rotation, agent.params.spin, frame.dt);
    }
}

/// Blink level in `[0, 1]`: a squared unit sine, so bulbs spend longer dim
/// than bright.
pub fn blink(params: &BulbParams, time: f32) -> f32 {
    let s = ((time * params.speed + params.time_offset).sin() + 1.0) / 2.0;
    s * s
}

impl Animate for Lights {
    fn step(&self, _index: usize, agent: &mut Agent<BulbParams>, frame: &FrameContext) {
        let target = if frame.formed() { agent.formation } else { agent.chaos };
        agent.position = approach(agent.position, target, LIGHT_RATE, frame.dt);
        agent.intensity = if frame.state.is_lit() {
            BULB_BASE_GLOW + blink(&agent.params, frame.time) * BULB_BLINK_GLOW
        } else {
            0.0
        };
    }
}

impl Animate for Star {
    fn step(&self, _index: usize, agent: &mut Agent<StarParams>, frame: &FrameContext) {
        let target_scale = if frame.formed() { 1.0 } else { 0.0 };
        agent.scale = approach_scalar(agent.scale, target_scale, STAR_SCALE_RATE, frame.dt);
        agent.rotation = (agent.rotation * Quat::from_rotation_y(STAR_SPIN * frame.dt)).normalize();
        agent.intensity = agent.scale;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::FormationField;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    const DT: f32 = 1.0 / 60.0;

    fn field() -> FormationField {
        FormationField::new(22.0, 9.0).unwrap()
    }

    fn frame(state: SceneState, time: f32) -> FrameContext {
        FrameContext {
            state,
            focused: None,
            dt: DT,
            time,
            focus_anchor: Vec3::new(0.0, 6.0, 38.0),
            eye: Vec3::new(0.0, 14.0, 60.0),
        }
    }

    #[test]
    fn approach_never_overshoots() {
        let target = Vec3::new(10.0, 0.0, 0.0);
        let mut p = Vec3::ZERO;
        let mut prev = f32::INFINITY;
        for _ in 0..500 {
            p = approach(p, target, 2.0, DT);
            let d = (target - p).length();
            assert!(d <= prev);
            assert!(p.x <= target.x);
            prev = d;
        }
        // A huge step lands exactly on target
        assert_eq!(approach(Vec3::ZERO, target, 10.0, 1.0), target);
    }

    #[test]
    fn cubic_in_out_endpoints() {
        assert_eq!(cubic_in_out(0.0), 0.0);
        assert_relative_eq!(cubic_in_out(0.5), 0.5);
        assert_eq!(cubic_in_out(1.0), 1.0);
    }

    #[test]
    fn facing_points_local_z_along_direction() {
        for dir in [Vec3::X, Vec3::new(1.0, 0.5, -2.0), Vec3::new(-3.0, -1.0, 0.2)] {
            let q = facing(dir);
            let z = q * Vec3::Z;
            assert_relative_eq!(z.dot(dir.normalize()), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn ten_agents_settle_on_chaos_after_1000_frames() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pool = AgentPool::create(Props::default(), 10, &field(), &mut rng).unwrap();

        // Start everyone on the tree, then disperse.
        for a in pool.agents_mut().unwrap() {
            a.position = a.formation;
        }
        for i in 0..1000 {
            pool.advance(&frame(SceneState::Chaos, i as f32 * DT)).unwrap();
        }
        for a in pool.iter().unwrap() {
            assert!((a.position - a.chaos).length() < 1e-3);
        }
    }

    #[test]
    fn distance_to_formation_decreases_monotonically() {
        let mut rng = StdRng::seed_from_u64(43);
        let mut pool = AgentPool::create(Foliage::default(), 64, &field(), &mut rng).unwrap();
        let mut prev: Vec<f32> = pool.iter().unwrap().map(|a| (a.formation - a.position).length()).collect();
        for i in 0..600 {
            pool.par_advance(&frame(SceneState::Formed, i as f32 * DT)).unwrap();
            for (a, d0) in pool.iter().unwrap().zip(prev.iter_mut()) {
                let d = (a.formation - a.position).length();
                assert!(d <= *d0 + 1e-5);
                *d0 = d;
            }
        }
        assert!(prev.iter().all(|&d| d < 0.01));
    }

    #[test]
    fn heavier_cards_settle_slower() {
        let kind = PhotoCards::new(1);
        let mut rng = StdRng::seed_from_u64(44);
        let mut light = kind.spawn(0, &field(), &mut rng);
        let mut heavy = light.clone();
        light.params.weight = 0.8;
        heavy.params.weight = 2.0;
        let f = frame(SceneState::Formed, 0.0);
        let d0 = (light.formation - light.position).length();
        kind.step(0, &mut light, &f);
        kind.step(0, &mut heavy, &f);
        let dl = (light.formation - light.position).length();
        let dh = (heavy.formation - heavy.position).length();
        assert!(dl < dh && dh < d0);
    }

    #[test]
    fn focused_card_flies_to_anchor_and_grows() {
        let kind = PhotoCards::new(3);
        let mut rng = StdRng::seed_from_u64(45);
        let mut pool = AgentPool::create(kind, 3, &field(), &mut rng).unwrap();
        let mut f = frame(SceneState::Focus, 0.0);
        f.focused = Some(1);
        for i in 0..300 {
            f.time = i as f32 * DT;
            pool.advance(&f).unwrap();
        }
        let agents = pool.agents().unwrap();
        let card = &agents[1];
        assert!((card.position - f.focus_anchor).length() < 1e-2);
        assert_relative_eq!(card.scale, card.params.base_scale * FOCUS_SCALE, epsilon = 1e-2);
        // It faces the camera.
        let z = card.rotation * Vec3::Z;
        assert!(z.dot((f.eye - card.position).normalize()) > 0.99);
        // Everyone else scatters as a shrunken backdrop.
        for (i, a) in agents.iter().enumerate().filter(|(i, _)| *i != 1) {
            assert!((a.position - a.chaos).length() < 1.0, "card {} not scattered", i);
            assert_relative_eq!(a.scale, a.params.base_scale * BACKDROP_SCALE, epsilon = 1e-2);
        }
    }

    #[test]
    fn focused_card_tracks_an_orbiting_eye_every_frame() {
        let kind = PhotoCards::new(1);
        let mut rng = StdRng::seed_from_u64(47);
        let mut pool = AgentPool::create(kind, 1, &field(), &mut rng).unwrap();
        let mut f = frame(SceneState::Focus, 0.0);
        f.focused = Some(0);
        for i in 0..20 {
            let a = i as f32 * 0.3;
            f.eye = Vec3::new(60.0 * a.sin(), 14.0, 60.0 * a.cos());
            pool.advance(&f).unwrap();
            let card = &pool.agents().unwrap()[0];
            let z = card.rotation * Vec3::Z;
            assert!(z.dot((f.eye - card.position).normalize()) > 0.999, "frame {}", i);
        }
    }

    #[test]
    fn formed_cards_face_outward_with_small_wobble() {
        let kind = PhotoCards::new(1);
        let mut rng = StdRng::seed_from_u64(46);
        let mut card = kind.spawn(0, &field(), &mut rng);
        for i in 0..900 {
            kind.step(0, &mut card, &frame(SceneState::Formed, i as f32 * DT));
        }
        let outward = Vec3::new(card.position.x, 0.5, card.position.z).normalize();
        let z = card.rotation * Vec3::Z;
        // Wobble is ±0.05 rad per axis, so the normal stays within ~0.08 rad.
        assert!(z.dot(outward) > 0.99);
    }

    #[test]
    fn lights_dark_unless_formed() {
        let mut rng = StdRng::seed_from_u64(47);
        let mut pool = AgentPool::create(Lights::default(), 20, &field(), &mut rng).unwrap();
        pool.advance(&frame(SceneState::Chaos, 1.0)).unwrap();
        assert!(pool.iter().unwrap().all(|a| a.intensity == 0.0));
        pool.advance(&frame(SceneState::Focus, 1.0)).unwrap();
        assert!(pool.iter().unwrap().all(|a| a.intensity == 0.0));
        pool.advance(&frame(SceneState::Formed, 1.0)).unwrap();
        for a in pool.iter().unwrap() {
            assert!(a.intensity >= BULB_BASE_GLOW && a.intensity <= BULB_BASE_GLOW + BULB_BLINK_GLOW);
        }
    }

    #[test]
    fn star_grows_only_when_formed() {
        let mut rng = StdRng::seed_from_u64(48);
        let mut pool = AgentPool::create(Star::default(), 1, &field(), &mut rng).unwrap();
        for i in 0..300 {
            pool.advance(&frame(SceneState::Formed, i as f32 * DT)).unwrap();
        }
        assert_relative_eq!(pool.agents().unwrap()[0].scale, 1.0, epsilon = 1e-3);
        for i in 0..300 {
            pool.advance(&frame(SceneState::Chaos, i as f32 * DT)).unwrap();
        }
        assert!(pool.agents().unwrap()[0].scale < 1e-3);
    }

    #[test]
    fn advance_before_populate_fails() {
        let mut pool = AgentPool::new(Lights::default(), 3).unwrap();
        assert!(pool.advance(&frame(SceneState::Formed, 0.0)).is_err());
    }
}
