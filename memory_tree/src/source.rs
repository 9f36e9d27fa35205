//! Landmark sources: where hands come from.
//!
//! The pipeline thread builds its source on that thread, calls
//! [`LandmarkSource::load`] and [`LandmarkSource::open`] once, then polls
//! [`LandmarkSource::next_detection`] until it is told to stop. Each poll
//! blocks for at most about one sensor frame.
//!
//! * [`SimLandmarkSource`] — keyboard/mouse simulation driven by the window
//!   (always available).
//! * [`ScriptedSource`] — a fixed timeline of poses for headless runs.
//! * `LeapLandmarkSource` — LeapMotion hardware (feature `leap`).

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SensorError;
use crate::landmarks::{Detection, HandFrame, Pose};

/// Nominal sensor cadence for the software sources.
pub const FRAME_PERIOD: Duration = Duration::from_millis(33);

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

pub trait LandmarkSource {
    fn name(&self) -> &'static str;

    /// Load the classifier model, if any.
    fn load(&mut self) -> Result<(), SensorError> { Ok(()) }

    /// Acquire the sensor.
    fn open(&mut self) -> Result<(), SensorError>;

    /// Wait for the next sensor frame.
    fn next_detection(&mut self) -> Result<Detection, SensorError>;
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — keyboard/mouse simulation
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
    /// Mouse moved; normalized window `x` (0 = left edge).
    Pointer(f32),
}

/// Simulated key codes (mapped from minifb keys by the visualizer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    OpenPalm,   // 1
    Fist,       // 2
    Pinch,      // 3
    Relax,      // 4
    HideHand,   // H
    MoveLeft,   // ←
    MoveRight,  // →
    Centre,     // C
}

/// Wrist travel while an arrow key is held (normalized units per second).
const SIM_DRIFT: f32 = 0.6;
/// Per-axis landmark noise, normalized units.
const SIM_JITTER: f32 = 0.003;

/// Hand simulated from window input.
///
/// Starts with no hand in view. A pose key shows the hand in that pose;
/// `H` hides it again. The wrist follows the mouse, or drifts while an
/// arrow key is held. Directions are as seen in the mirrored preview, so
/// window `x` maps to camera `1 - x`.
pub struct SimLandmarkSource {
    rx:     Receiver<SimInput>,
    pose:   Option<Pose>,
    x:      f32,
    drift:  f32,
    rng:    StdRng,
    period: Duration,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimLandmarkSource {
            rx,
            pose:   None,
            x:      0.5,
            drift:  0.0,
            rng:    StdRng::from_entropy(),
            period: FRAME_PERIOD,
        }
    }

    pub fn pose(&self) -> Option<Pose> { self.pose }
    pub fn x(&self)    -> f32          { self.x }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::KeyDown(SimKey::OpenPalm)  => self.pose = Some(Pose::Open),
            SimInput::KeyDown(SimKey::Fist)      => self.pose = Some(Pose::Fist),
            SimInput::KeyDown(SimKey::Pinch)     => self.pose = Some(Pose::Pinch),
            SimInput::KeyDown(SimKey::Relax)     => self.pose = Some(Pose::Relaxed),
            SimInput::KeyDown(SimKey::HideHand)  => self.pose = None,
            SimInput::KeyDown(SimKey::Centre)    => self.x = 0.5,
            SimInput::KeyDown(SimKey::MoveLeft)  => self.drift =  SIM_DRIFT,
            SimInput::KeyDown(SimKey::MoveRight) => self.drift = -SIM_DRIFT,
            SimInput::KeyUp(SimKey::MoveLeft | SimKey::MoveRight) => self.drift = 0.0,
            SimInput::Pointer(x)                 => self.x = 1.0 - x.clamp(0.0, 1.0),
            SimInput::KeyUp(_)                   => {}
        }
    }

    /// Apply every pending window input without blocking.
    fn drain_inputs(&mut self) -> Result<(), SensorError> {
        loop {
            match self.rx.try_recv() {
                Ok(input)                       => self.apply(input),
                Err(TryRecvError::Empty)        => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(SensorError::Disconnected),
            }
        }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn name(&self) -> &'static str { "simulator" }

    fn open(&mut self) -> Result<(), SensorError> {
        log::info!("simulated hand: keys 1-4 pose, H hide, ←/→ or mouse move");
        Ok(())
    }

    fn next_detection(&mut self) -> Result<Detection, SensorError> {
        thread::sleep(self.period);
        self.drain_inputs()?;

        self.x = (self.x + self.drift * self.period.as_secs_f32()).clamp(0.0, 1.0);
        let Some(pose) = self.pose else { return Ok(Detection::NoHand) };

        let clean = HandFrame::synthetic(pose, self.x);
        let mut points = *clean.landmarks();
        for p in points.iter_mut() {
            p.x += self.rng.gen_range(-SIM_JITTER..SIM_JITTER);
            p.y += self.rng.gen_range(-SIM_JITTER..SIM_JITTER);
        }
        Ok(Detection::Hand(HandFrame::new(points)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource — fixed timeline
// ════════════════════════════════════════════════════════════════════════════

/// One segment of a scripted timeline: hold `pose` at wrist `x` for
/// `frames` sensor frames (`None` = no hand).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptStep {
    pub pose:   Option<Pose>,
    pub x:      f32,
    pub frames: u32,
}

impl ScriptStep {
    pub fn hand(pose: Pose, x: f32, frames: u32) -> Self {
        ScriptStep { pose: Some(pose), x, frames }
    }

    pub fn empty(frames: u32) -> Self {
        ScriptStep { pose: None, x: 0.5, frames }
    }
}

/// Plays its steps in order, looping when it reaches the end.
pub struct ScriptedSource {
    steps:  Vec<ScriptStep>,
    step:   usize,
    frame:  u32,
    period: Duration,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        ScriptedSource { steps, step: 0, frame: 0, period: FRAME_PERIOD }
    }

    /// Change the pause between frames (zero for tests).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Assemble, turn, focus a photo, then scatter.
    pub fn demo() -> Self {
        Self::new(vec![
            ScriptStep::empty(30),
            ScriptStep::hand(Pose::Fist, 0.5, 90),
            ScriptStep::hand(Pose::Relaxed, 0.9, 90),
            ScriptStep::hand(Pose::Pinch, 0.5, 60),
            ScriptStep::hand(Pose::Relaxed, 0.1, 60),
            ScriptStep::hand(Pose::Open, 0.5, 90),
        ])
    }

    fn current(&mut self) -> Option<ScriptStep> {
        let n = self.steps.len();
        for _ in 0..n {
            let step = self.steps[self.step];
            if self.frame < step.frames {
                self.frame += 1;
                return Some(step);
            }
            self.frame = 0;
            self.step = (self.step + 1) % n;
        }
        None
    }
}

impl LandmarkSource for ScriptedSource {
    fn name(&self) -> &'static str { "script" }

    fn open(&mut self) -> Result<(), SensorError> {
        if self.steps.iter().all(|s| s.frames == 0) {
            return Err(SensorError::Unavailable("empty script".into()));
        }
        Ok(())
    }

    fn next_detection(&mut self) -> Result<Detection, SensorError> {
        if !self.period.is_zero() {
            thread::sleep(self.period);
        }
        let step = self.current().ok_or(SensorError::Disconnected)?;
        Ok(match step.pose {
            Some(pose) => Detection::Hand(HandFrame::synthetic(pose, step.x)),
            None       => Detection::NoHand,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Landmarks from a LeapMotion controller.
///
/// Joint positions (mm, device space) are mapped onto the 21-point layout:
/// wrist from the middle finger's carpal end, then per finger the
/// knuckle, two interpolated joints and the tip. Millimetres are scaled
/// into the same normalized units a camera tracker reports.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource {
    connection: Option<leaprs::Connection>,
}

#[cfg(feature = "leap")]
impl LeapLandmarkSource {
    /// Device-space millimetres per normalized unit.
    const MM_PER_UNIT: f32 = 400.0;
    /// Device-space height that maps to the middle of the frame.
    const CENTRE_Y_MM: f32 = 250.0;

    pub fn new() -> Self {
        LeapLandmarkSource { connection: None }
    }

    fn normalize(x: f32, y: f32, z: f32) -> glam::Vec3 {
        glam::Vec3::new(
            0.5 + x / Self::MM_PER_UNIT,
            0.5 - (y - Self::CENTRE_Y_MM) / Self::MM_PER_UNIT,
            z / Self::MM_PER_UNIT,
        )
    }

    fn hand_frame(hand: &leaprs::Hand) -> Result<HandFrame, SensorError> {
        let digits: Vec<_> = hand.digits().collect();
        if digits.len() < 5 {
            return Err(SensorError::MalformedFrame { expected: 5, got: digits.len() });
        }

        let carpal = digits[2].metacarpal().prev_joint();
        let mut points = vec![Self::normalize(carpal.x, carpal.y, carpal.z)];
        for digit in &digits[..5] {
            let k = digit.metacarpal().next_joint();
            let d = digit.distal().prev_joint();
            let t = digit.distal().next_joint();
            let knuckle = Self::normalize(k.x, k.y, k.z);
            let dip     = Self::normalize(d.x, d.y, d.z);
            points.push(knuckle);
            points.push(knuckle.lerp(dip, 0.5));
            points.push(dip);
            points.push(Self::normalize(t.x, t.y, t.z));
        }
        HandFrame::from_slice(&points)
    }
}

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn name(&self) -> &'static str { "leap" }

    fn open(&mut self) -> Result<(), SensorError> {
        use leaprs::{Connection, ConnectionConfig};

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SensorError::Unavailable(format!("{:?}", e)))?;
        connection
            .open()
            .map_err(|e| SensorError::Unavailable(format!("{:?}", e)))?;
        self.connection = Some(connection);
        Ok(())
    }

    fn next_detection(&mut self) -> Result<Detection, SensorError> {
        use leaprs::Event;

        let connection = self.connection.as_mut().ok_or(SensorError::Disconnected)?;
        let msg = match connection.poll(33) {
            Ok(m)  => m,
            Err(_) => return Ok(Detection::NoHand),
        };
        if let Event::Tracking(frame) = msg.event() {
            if let Some(hand) = frame.hands().next() {
                return Self::hand_frame(&hand).map(Detection::Hand);
            }
        }
        Ok(Detection::NoHand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn sim_starts_without_a_hand() {
        let (_tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx);
        src.period = Duration::ZERO;
        assert_eq!(src.next_detection().unwrap(), Detection::NoHand);
    }

    #[test]
    fn sim_keys_pick_pose_and_hide() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx);
        src.period = Duration::ZERO;

        tx.send(SimInput::KeyDown(SimKey::Fist)).unwrap();
        assert!(src.next_detection().unwrap().hand().is_some());
        assert_eq!(src.pose(), Some(Pose::Fist));

        tx.send(SimInput::KeyDown(SimKey::HideHand)).unwrap();
        assert_eq!(src.next_detection().unwrap(), Detection::NoHand);
    }

    #[test]
    fn sim_pointer_moves_wrist() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx);
        src.period = Duration::ZERO;
        tx.send(SimInput::KeyDown(SimKey::OpenPalm)).unwrap();
        tx.send(SimInput::Pointer(0.9)).unwrap();
        let det = src.next_detection().unwrap();
        let wrist = det.hand().unwrap().wrist();
        assert!((wrist.x - 0.1).abs() <= SIM_JITTER);
    }

    #[test]
    fn sim_arrow_drift_follows_the_preview() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx);
        src.period = Duration::from_millis(1);
        tx.send(SimInput::KeyDown(SimKey::MoveLeft)).unwrap();
        src.next_detection().unwrap();
        assert!(src.x() > 0.5);
        tx.send(SimInput::KeyUp(SimKey::MoveLeft)).unwrap();
        let held = { src.next_detection().unwrap(); src.x() };
        src.next_detection().unwrap();
        assert_eq!(src.x(), held);
    }

    #[test]
    fn sim_reports_disconnect_when_window_is_gone() {
        let (tx, rx) = mpsc::channel::<SimInput>();
        let mut src = SimLandmarkSource::new(rx);
        src.period = Duration::ZERO;
        drop(tx);
        assert_eq!(src.next_detection().unwrap_err(), SensorError::Disconnected);
    }

    #[test]
    fn script_plays_in_order_and_loops() {
        let mut src = ScriptedSource::new(vec![
            ScriptStep::hand(Pose::Fist, 0.5, 2),
            ScriptStep::empty(1),
        ])
        .with_period(Duration::ZERO);
        src.open().unwrap();
        let got: Vec<bool> = (0..6).map(|_| src.next_detection().unwrap().hand().is_some()).collect();
        assert_eq!(got, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn empty_script_fails_to_open() {
        let mut src = ScriptedSource::new(vec![ScriptStep::empty(0)]);
        assert!(src.open().is_err());
        assert!(ScriptedSource::new(Vec::new()).open().is_err());
    }
}
