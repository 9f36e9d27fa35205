//! Orbit camera driven by the continuous control signal.
//!
//! Coordinates are tree-local: the tree is centred on the Y axis with its
//! base at `y = -h/2`. The camera circles the trunk at a fixed distance and
//! height and always looks at the same point slightly above the middle.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};

use crate::scene::SceneState;

/// Control magnitudes at or below this leave the camera to auto-rotation.
pub const ACTIVE_CONTROL: f32 = 0.001;
/// Idle spin in `Formed` (rad/s).
pub const AUTO_ROTATE:    f32 = 0.3;
/// Rate at which a control step is eased in (1/s).
pub const STEER_SMOOTH:   f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub eye:    Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y:  f32,
    pub near:   f32,
    pub far:    f32,
}

impl CameraPose {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrbitCamera {
    /// Angle around the Y axis, radians in `[0, 2π)`.
    pub azimuth:  f32,
    pub distance: f32,
    pub height:   f32,
    pub target:   Vec3,
    pub fov_y:    f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        OrbitCamera {
            azimuth:  0.0,
            distance: 60.0,
            height:   14.0,
            target:   Vec3::new(0.0, 6.0, 0.0),
            fov_y:    50f32.to_radians(),
        }
    }
}

impl OrbitCamera {
    /// Advance one frame. A live control value steers; otherwise the
    /// assembled tree slowly turns on its own.
    pub fn update(&mut self, control: f32, state: SceneState, dt: f32) {
        if control.abs() > ACTIVE_CONTROL {
            let step = control * dt;
            self.azimuth += step * (STEER_SMOOTH * dt).min(1.0);
        } else if state == SceneState::Formed {
            self.azimuth += AUTO_ROTATE * dt;
        }
        self.azimuth = self.azimuth.rem_euclid(TAU);
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(
            self.distance * self.azimuth.sin(),
            self.height,
            self.distance * self.azimuth.cos(),
        )
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            eye:    self.eye(),
            target: self.target,
            fov_y:  self.fov_y,
            near:   0.1,
            far:    200.0,
        }
    }

    /// Point on the view axis `distance` units in front of the lens, where
    /// a focused photo card is presented.
    pub fn focus_anchor(&self, distance: f32) -> Vec3 {
        let pose = self.pose();
        pose.eye + pose.forward() * distance
    }
}
