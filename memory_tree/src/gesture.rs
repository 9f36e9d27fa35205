//! Discrete gesture classification.
//!
//! A geometric heuristic over the 21 landmarks:
//!
//! | Test | Result |
//! |---|---|
//! | thumb tip to index tip `< pinch` | `Pinch` |
//! | mean fingertip-to-wrist distance `< fist` | `Fist` |
//! | mean fingertip-to-wrist distance `> open` | `OpenPalm` |
//! | anything in between | nothing |
//!
//! The gap between `fist` and `open` is a hysteresis band: a hand drifting
//! through it emits no event, so the scene keeps its last state. When the
//! source also carries an external classifier vote, a confident vote
//! (`score > min_score`) with a known label wins over the geometry.

use serde::{Deserialize, Serialize};

use tree_swarm::Gesture;

use crate::landmarks::{HandFrame, FINGERTIPS, INDEX_TIP, THUMB_TIP};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    pub pinch:     f32,
    pub fist:      f32,
    pub open:      f32,
    /// External classifier votes at or below this score are ignored.
    pub min_score: f32,
    /// Consecutive frames without the held gesture (no hand, or a hand in
    /// the hysteresis band) before the same gesture may fire again.
    pub rearm_frames: u32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        GestureThresholds { pinch: 0.05, fist: 0.25, open: 0.40, min_score: 0.4, rearm_frames: 6 }
    }
}

impl GestureThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.pinch > 0.0) {
            return Err(format!("pinch threshold must be > 0, got {}", self.pinch));
        }
        if !(self.fist > 0.0 && self.fist < self.open) {
            return Err(format!(
                "need 0 < fist < open, got fist={} open={}",
                self.fist, self.open
            ));
        }
        if !(0.0..1.0).contains(&self.min_score) {
            return Err(format!("min_score must be in [0, 1), got {}", self.min_score));
        }
        Ok(())
    }
}

/// Raw measurements behind a classification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandFeatures {
    pub pinch_distance: f32,
    /// Mean distance of the four fingertips to the wrist.
    pub openness:       f32,
}

impl HandFeatures {
    pub fn measure(hand: &HandFrame) -> Self {
        let wrist = hand.wrist();
        let openness = FINGERTIPS
            .iter()
            .map(|&tip| hand.point(tip).distance(wrist))
            .sum::<f32>()
            / FINGERTIPS.len() as f32;
        HandFeatures {
            pinch_distance: hand.point(THUMB_TIP).distance(hand.point(INDEX_TIP)),
            openness,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub gesture:  Option<Gesture>,
    pub features: HandFeatures,
}

/// Map an external classifier label onto a gesture.
pub fn gesture_from_label(label: &str) -> Option<Gesture> {
    match label {
        "Open_Palm"   => Some(Gesture::OpenPalm),
        "Closed_Fist" => Some(Gesture::Fist),
        "Pinch"       => Some(Gesture::Pinch),
        _             => None,
    }
}

pub fn classify(hand: &HandFrame, t: &GestureThresholds) -> Classification {
    let features = HandFeatures::measure(hand);

    let voted = hand
        .vote
        .as_ref()
        .filter(|v| v.score > t.min_score)
        .and_then(|v| gesture_from_label(&v.label));

    let gesture = voted.or_else(|| {
        if features.pinch_distance < t.pinch {
            Some(Gesture::Pinch)
        } else if features.openness < t.fist {
            Some(Gesture::Fist)
        } else if features.openness > t.open {
            Some(Gesture::OpenPalm)
        } else {
            None
        }
    });

    Classification { gesture, features }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Pose;
    use glam::Vec3;

    fn classify_pose(pose: Pose) -> Option<Gesture> {
        classify(&HandFrame::synthetic(pose, 0.5), &GestureThresholds::default()).gesture
    }

    #[test]
    fn poses_map_to_gestures() {
        assert_eq!(classify_pose(Pose::Open),  Some(Gesture::OpenPalm));
        assert_eq!(classify_pose(Pose::Fist),  Some(Gesture::Fist));
        assert_eq!(classify_pose(Pose::Pinch), Some(Gesture::Pinch));
    }

    /// Hand with all four fingertips `reach` from the wrist and the thumb
    /// tucked well away from the index tip.
    fn hand_with_openness(reach: f32) -> HandFrame {
        let wrist = Vec3::new(0.5, 0.8, 0.0);
        let mut points = [wrist; crate::landmarks::LANDMARK_COUNT];
        for (k, &tip) in FINGERTIPS.iter().enumerate() {
            let a = -std::f32::consts::FRAC_PI_2 + (k as f32 - 1.5) * 0.25;
            points[tip] = wrist + Vec3::new(a.cos(), a.sin(), 0.0) * reach;
        }
        points[THUMB_TIP] = wrist + Vec3::new(-0.15, 0.0, 0.0);
        HandFrame::new(points)
    }

    #[test]
    fn hysteresis_band_yields_nothing() {
        assert_eq!(classify_pose(Pose::Relaxed), None);

        let t = GestureThresholds::default();
        for i in 1..15 {
            let reach = t.fist + (t.open - t.fist) * i as f32 / 15.0;
            let c = classify(&hand_with_openness(reach), &t);
            assert!(c.features.pinch_distance > t.pinch);
            assert!((c.features.openness - reach).abs() < 1e-4);
            assert_eq!(c.gesture, None, "openness={}", reach);
        }
        assert_eq!(classify(&hand_with_openness(0.2), &t).gesture, Some(Gesture::Fist));
        assert_eq!(classify(&hand_with_openness(0.45), &t).gesture, Some(Gesture::OpenPalm));
    }

    #[test]
    fn pinch_beats_fist() {
        // Tight fist whose thumb also touches the index tip.
        let mut hand = HandFrame::synthetic(Pose::Fist, 0.5);
        let mut points = *hand.landmarks();
        points[THUMB_TIP] = points[INDEX_TIP];
        hand = HandFrame::new(points);
        let c = classify(&hand, &GestureThresholds::default());
        assert!(c.features.openness < 0.25);
        assert_eq!(c.gesture, Some(Gesture::Pinch));
    }

    #[test]
    fn confident_vote_overrides_geometry() {
        let hand = HandFrame::synthetic(Pose::Open, 0.5).with_vote("Closed_Fist", 0.9);
        assert_eq!(classify(&hand, &GestureThresholds::default()).gesture, Some(Gesture::Fist));
    }

    #[test]
    fn weak_vote_is_ignored() {
        let hand = HandFrame::synthetic(Pose::Relaxed, 0.5).with_vote("Closed_Fist", 0.4);
        assert_eq!(classify(&hand, &GestureThresholds::default()).gesture, None);
    }

    #[test]
    fn unknown_label_falls_back_to_geometry() {
        let hand = HandFrame::synthetic(Pose::Open, 0.5).with_vote("Thumb_Up", 0.99);
        assert_eq!(classify(&hand, &GestureThresholds::default()).gesture, Some(Gesture::OpenPalm));
    }

    #[test]
    fn thresholds_validate() {
        assert!(GestureThresholds::default().validate().is_ok());
        let inverted = GestureThresholds { fist: 0.5, open: 0.4, ..Default::default() };
        assert!(inverted.validate().is_err());
    }
}
