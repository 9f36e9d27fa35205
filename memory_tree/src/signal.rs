//! Continuous orbit control from the wrist's horizontal position.
//!
//! ```text
//! x ∈ [0,1] → (x − 0.5)·2 → dead zone → sign·|·|^0.8 → −·0.4·0.9π → smooth → floor
//! ```
//!
//! Smoothing uses the measured time between detections, clamped so one
//! long gap can never push the value past its target.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlTuning {
    /// Half-width of the centred band that produces no motion.
    pub dead_zone:  f32,
    /// Response curve exponent; below 1 softens small offsets less than large.
    pub exponent:   f32,
    pub multiplier: f32,
    /// Angular range the curved input is scaled to.
    pub range:      f32,
    /// Smoothing rate (1/s).
    pub smoothing:  f32,
    /// Outputs at or below this magnitude are reported as zero.
    pub min_speed:  f32,
}

impl Default for ControlTuning {
    fn default() -> Self {
        ControlTuning {
            dead_zone:  0.2,
            exponent:   0.8,
            multiplier: 0.4,
            range:      PI * 0.9,
            smoothing:  3.0,
            min_speed:  0.008,
        }
    }
}

impl ControlTuning {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.dead_zone) {
            return Err(format!("dead_zone must be in [0, 1), got {}", self.dead_zone));
        }
        if !(self.exponent > 0.0) {
            return Err(format!("exponent must be > 0, got {}", self.exponent));
        }
        if !(self.smoothing > 0.0) {
            return Err(format!("smoothing must be > 0, got {}", self.smoothing));
        }
        if self.min_speed < 0.0 {
            return Err(format!("min_speed must be >= 0, got {}", self.min_speed));
        }
        Ok(())
    }

    /// Target speed (rad/s) for a normalized wrist `x`.
    pub fn target(&self, x: f32) -> f32 {
        let centred = ((x - 0.5) * 2.0).clamp(-1.0, 1.0);
        let live = dead_zone(centred, self.dead_zone);
        if live == 0.0 {
            return 0.0;
        }
        let curved = live.signum() * live.abs().powf(self.exponent);
        -curved * self.multiplier * self.range
    }
}

/// Collapse `|x| ≤ zone` to zero and rescale the rest back onto `[-1, 1]`.
pub fn dead_zone(x: f32, zone: f32) -> f32 {
    if x.abs() <= zone {
        0.0
    } else {
        x.signum() * (x.abs() - zone) / (1.0 - zone)
    }
}

/// Smoothed orbit speed with a minimum-speed floor.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlSignal {
    tuning:   ControlTuning,
    smoothed: f32,
    target:   f32,
}

impl ControlSignal {
    pub fn new(tuning: ControlTuning) -> Self {
        ControlSignal { tuning, smoothed: 0.0, target: 0.0 }
    }

    /// Feed one detection. `hand_x` is the wrist's normalized `x`, `None`
    /// when no hand is seen (the target becomes zero). Returns the output.
    pub fn update(&mut self, hand_x: Option<f32>, dt: f32) -> f32 {
        self.target = hand_x.map_or(0.0, |x| self.tuning.target(x));
        let k = (self.tuning.smoothing * dt.max(0.0)).min(1.0);
        self.smoothed += (self.target - self.smoothed) * k;
        self.output()
    }

    pub fn output(&self) -> f32 {
        if self.smoothed.abs() > self.tuning.min_speed { self.smoothed } else { 0.0 }
    }

    pub fn smoothed(&self) -> f32 { self.smoothed }
    pub fn target(&self)   -> f32 { self.target }
}
