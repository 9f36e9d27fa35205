//! Hand landmarks as delivered by a landmark source.
//!
//! 21 points in MediaPipe order, normalized image coordinates: `x` and `y`
//! in `[0, 1]` with `y` growing downward, `z` relative depth.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use crate::error::SensorError;

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP:   usize = 16;
pub const PINKY_TIP:  usize = 20;

/// The four non-thumb fingertips.
pub const FINGERTIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Bone pairs for drawing the hand skeleton.
pub const CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Label and confidence from an external gesture classifier, passed
/// through untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierVote {
    /// e.g. `"Open_Palm"`, `"Closed_Fist"`.
    pub label: String,
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandFrame {
    landmarks: [Vec3; LANDMARK_COUNT],
    pub vote:  Option<ClassifierVote>,
}

impl HandFrame {
    pub fn new(landmarks: [Vec3; LANDMARK_COUNT]) -> Self {
        HandFrame { landmarks, vote: None }
    }

    /// Build from a slice that must hold exactly 21 points.
    pub fn from_slice(points: &[Vec3]) -> Result<Self, SensorError> {
        let landmarks: [Vec3; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            SensorError::MalformedFrame { expected: LANDMARK_COUNT, got: points.len() }
        })?;
        Ok(Self::new(landmarks))
    }

    pub fn with_vote(mut self, label: impl Into<String>, score: f32) -> Self {
        self.vote = Some(ClassifierVote { label: label.into(), score });
        self
    }

    pub fn landmarks(&self)     -> &[Vec3; LANDMARK_COUNT] { &self.landmarks }
    pub fn point(&self, i: usize) -> Vec3                   { self.landmarks[i] }
    pub fn wrist(&self)         -> Vec3                     { self.landmarks[WRIST] }
}

/// One poll of a landmark source.
#[derive(Clone, Debug, PartialEq)]
pub enum Detection {
    NoHand,
    Hand(HandFrame),
}

impl Detection {
    pub fn hand(&self) -> Option<&HandFrame> {
        match self {
            Detection::Hand(h) => Some(h),
            Detection::NoHand  => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands
// ════════════════════════════════════════════════════════════════════════════

/// Canned hand shapes for the simulator and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pose {
    Open,
    Fist,
    /// Between fist and open; classifies as nothing.
    Relaxed,
    Pinch,
}

impl Pose {
    /// Fingertip distance from the wrist.
    pub fn reach(&self) -> f32 {
        match self {
            Pose::Open    => 0.50,
            Pose::Fist    => 0.15,
            Pose::Relaxed => 0.32,
            Pose::Pinch   => 0.32,
        }
    }
}

/// Finger directions in image space, thumb first. Pointing up the frame.
const FINGER_ANGLES: [f32; 5] = [
    -FRAC_PI_2 - 1.2,
    -FRAC_PI_2 - 0.3,
    -FRAC_PI_2 - 0.1,
    -FRAC_PI_2 + 0.1,
    -FRAC_PI_2 + 0.3,
];

impl HandFrame {
    /// A straight-fingered hand with its wrist at `(x, 0.8)`.
    ///
    /// Every fingertip sits exactly `pose.reach()` from the wrist; a pinch
    /// parks the thumb tip 0.02 beside the index tip.
    pub fn synthetic(pose: Pose, x: f32) -> Self {
        let wrist = Vec3::new(x, 0.8, 0.0);
        let reach = pose.reach();
        let mut landmarks = [wrist; LANDMARK_COUNT];
        for (finger, angle) in FINGER_ANGLES.iter().enumerate() {
            let dir = Vec3::new(angle.cos(), angle.sin(), 0.0);
            for joint in 0..4 {
                let t = (joint + 1) as f32 / 4.0;
                landmarks[1 + finger * 4 + joint] = wrist + dir * reach * t;
            }
        }
        if pose == Pose::Pinch {
            landmarks[THUMB_TIP] = landmarks[INDEX_TIP] + Vec3::new(0.02, 0.0, 0.0);
        }
        HandFrame::new(landmarks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_slice_requires_21_points() {
        let err = HandFrame::from_slice(&[Vec3::ZERO; 20]).unwrap_err();
        assert_eq!(err, SensorError::MalformedFrame { expected: 21, got: 20 });
        assert!(HandFrame::from_slice(&[Vec3::ZERO; 21]).is_ok());
    }

    #[test]
    fn synthetic_fingertips_sit_at_reach() {
        for pose in [Pose::Open, Pose::Fist, Pose::Relaxed] {
            let hand = HandFrame::synthetic(pose, 0.5);
            for tip in FINGERTIPS {
                assert_relative_eq!((hand.point(tip) - hand.wrist()).length(), pose.reach(), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn synthetic_hand_points_up_the_frame() {
        let hand = HandFrame::synthetic(Pose::Open, 0.3);
        assert_eq!(hand.wrist().x, 0.3);
        assert!(FINGERTIPS.iter().all(|&t| hand.point(t).y < hand.wrist().y));
    }

    #[test]
    fn connections_stay_in_range() {
        assert!(CONNECTIONS.iter().all(|&(a, b)| a < LANDMARK_COUNT && b < LANDMARK_COUNT));
    }
}
