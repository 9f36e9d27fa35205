//! Scene state machine.
//!
//! | Event | New state |
//! |---|---|
//! | `Gesture(OpenPalm)` | `Chaos` |
//! | `Gesture(Fist)` | `Formed` |
//! | `Gesture(Pinch)` | `Focus` (random photo card) |
//! | `Toggle` | `Chaos` → `Formed`, anything else → `Chaos` |
//! | `Set(s)` | `s` |
//!
//! Every event is an unconditional overwrite: no queue, no debounce, the
//! latest event wins. Debouncing happens upstream in the gesture pipeline.
//! The transition itself has no side effects on agents; the integrator
//! reads the new state on its next frame and agents glide toward the new
//! targets.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The discrete scene mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SceneState {
    #[default]
    Chaos,
    Formed,
    Focus,
}

impl SceneState {
    pub fn label(&self) -> &'static str {
        match self {
            SceneState::Chaos  => "CHAOS",
            SceneState::Formed => "FORMED",
            SceneState::Focus  => "FOCUS",
        }
    }

    /// Fairy lights only glow on the assembled tree.
    pub fn is_lit(&self) -> bool { *self == SceneState::Formed }
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified hand gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    /// Open hand: disperse.
    OpenPalm,
    /// Closed fist: assemble.
    Fist,
    /// Thumb and index together: focus one photo.
    Pinch,
}

impl Gesture {
    pub fn label(&self) -> &'static str {
        match self {
            Gesture::OpenPalm => "OPEN_PALM",
            Gesture::Fist     => "CLOSED_FIST",
            Gesture::Pinch    => "PINCH",
        }
    }

    pub fn target(&self) -> SceneState {
        match self {
            Gesture::OpenPalm => SceneState::Chaos,
            Gesture::Fist     => SceneState::Formed,
            Gesture::Pinch    => SceneState::Focus,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Anything that can drive a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneEvent {
    Gesture(Gesture),
    /// Manual assemble / disperse button.
    Toggle,
    /// Manual override to an explicit state.
    Set(SceneState),
}

// ════════════════════════════════════════════════════════════════════════════
// SceneMachine
// ════════════════════════════════════════════════════════════════════════════

pub struct SceneMachine {
    state:   SceneState,
    /// Photo card index shown in `Focus`.
    focused: Option<usize>,
    rng:     StdRng,
}

impl SceneMachine {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None    => StdRng::from_entropy(),
        };
        SceneMachine { state: SceneState::Chaos, focused: None, rng }
    }

    pub fn state(&self)   -> SceneState    { self.state }
    pub fn focused(&self) -> Option<usize> { self.focused }

    /// Apply one event. `photo_count` bounds the focus pick.
    pub fn apply(&mut self, event: SceneEvent, photo_count: usize) -> SceneState {
        let next = match event {
            SceneEvent::Gesture(g) => g.target(),
            SceneEvent::Toggle => match self.state {
                SceneState::Chaos => SceneState::Formed,
                _                 => SceneState::Chaos,
            },
            SceneEvent::Set(s) => s,
        };
        self.enter(next, photo_count);
        next
    }

    fn enter(&mut self, next: SceneState, photo_count: usize) {
        if next == SceneState::Focus {
            self.focused = self.pick_focus(photo_count);
        }
        if next != self.state {
            log::debug!("scene {} → {} (focused={:?})", self.state, next, self.focused);
        }
        self.state = next;
    }

    /// Random card, never the one that was just focused (when there is a
    /// choice).
    fn pick_focus(&mut self, photo_count: usize) -> Option<usize> {
        match (photo_count, self.focused) {
            (0, _) => None,
            (1, _) => Some(0),
            (n, Some(prev)) if prev < n => {
                let k = self.rng.gen_range(0..n - 1);
                Some(if k >= prev { k + 1 } else { k })
            }
            (n, _) => Some(self.rng.gen_range(0..n)),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_chaos() {
        assert_eq!(SceneMachine::new(Some(1)).state(), SceneState::Chaos);
    }

    #[test]
    fn fist_forms_from_any_state() {
        for start in [SceneState::Chaos, SceneState::Formed, SceneState::Focus] {
            let mut m = SceneMachine::new(Some(1));
            m.apply(SceneEvent::Set(start), 10);
            m.apply(SceneEvent::Gesture(Gesture::Fist), 10);
            assert_eq!(m.state(), SceneState::Formed);
        }
    }

    #[test]
    fn open_palm_disperses() {
        let mut m = SceneMachine::new(Some(1));
        m.apply(SceneEvent::Gesture(Gesture::Fist), 10);
        m.apply(SceneEvent::Gesture(Gesture::OpenPalm), 10);
        assert_eq!(m.state(), SceneState::Chaos);
    }

    #[test]
    fn latest_event_wins() {
        let mut m = SceneMachine::new(Some(1));
        m.apply(SceneEvent::Gesture(Gesture::Fist), 10);
        m.apply(SceneEvent::Gesture(Gesture::OpenPalm), 10);
        m.apply(SceneEvent::Gesture(Gesture::Fist), 10);
        assert_eq!(m.state(), SceneState::Formed);
    }

    #[test]
    fn toggle_flips_between_chaos_and_formed() {
        let mut m = SceneMachine::new(Some(1));
        assert_eq!(m.apply(SceneEvent::Toggle, 10), SceneState::Formed);
        assert_eq!(m.apply(SceneEvent::Toggle, 10), SceneState::Chaos);
        m.apply(SceneEvent::Gesture(Gesture::Pinch), 10);
        assert_eq!(m.apply(SceneEvent::Toggle, 10), SceneState::Chaos);
    }

    #[test]
    fn pinch_focuses_a_valid_card() {
        let mut m = SceneMachine::new(Some(2));
        m.apply(SceneEvent::Gesture(Gesture::Pinch), 7);
        assert_eq!(m.state(), SceneState::Focus);
        assert!(m.focused().unwrap() < 7);
    }

    #[test]
    fn repeated_pinch_never_repeats_card() {
        let mut m = SceneMachine::new(Some(3));
        let mut prev = None;
        for _ in 0..200 {
            m.apply(SceneEvent::Gesture(Gesture::Pinch), 5);
            let now = m.focused();
            assert!(now.unwrap() < 5);
            assert_ne!(now, prev);
            prev = now;
        }
    }

    #[test]
    fn focus_without_photos_has_no_target() {
        let mut m = SceneMachine::new(Some(4));
        m.apply(SceneEvent::Gesture(Gesture::Pinch), 0);
        assert_eq!(m.state(), SceneState::Focus);
        assert_eq!(m.focused(), None);
    }

    #[test]
    fn single_photo_is_always_focused() {
        let mut m = SceneMachine::new(Some(5));
        m.apply(SceneEvent::Gesture(Gesture::Pinch), 1);
        m.apply(SceneEvent::Gesture(Gesture::Pinch), 1);
        assert_eq!(m.focused(), Some(0));
    }
}
