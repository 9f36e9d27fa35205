//! Gesture signal pipeline and its thread.
//!
//! The pipeline thread owns the landmark source. For every sensor frame it
//! classifies the hand, updates the smoothed control signal and publishes:
//!
//! * the control value through a [`ControlCell`] (lock-free, single
//!   writer, read by the render loop every frame);
//! * discrete results as [`PipelineEvent`]s over an `mpsc` channel, which
//!   the render loop drains without blocking.
//!
//! Dropping the [`PipelineHandle`] stops the thread and joins it. The
//! source is released on the pipeline thread before it exits and nothing
//! is published after that.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec3;

use tree_swarm::Gesture;

use crate::error::{AppError, SensorError};
use crate::gesture::{classify, GestureThresholds};
use crate::landmarks::Detection;
use crate::signal::{ControlSignal, ControlTuning};
use crate::source::LandmarkSource;

pub const STATUS_LOADING:   &str = "LOADING AI...";
pub const STATUS_REQUEST:   &str = "REQUESTING CAMERA...";
pub const STATUS_READY:     &str = "AI READY: SHOW HAND";
pub const STATUS_NO_HAND:   &str = "AI READY: NO HAND";

/// Pause after a failed poll before trying again.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);
/// Poll interval of the idle loop once the source failed to start.
const IDLE_POLL:     Duration = Duration::from_millis(20);

pub fn error_status(err: &SensorError) -> String {
    format!("ERROR: {}", err)
}

// ════════════════════════════════════════════════════════════════════════════
// ControlCell
// ════════════════════════════════════════════════════════════════════════════

/// An `f32` shared between one writer and any number of readers.
#[derive(Clone, Debug, Default)]
pub struct ControlCell(Arc<AtomicU32>);

impl ControlCell {
    pub fn new(value: f32) -> Self {
        ControlCell(Arc::new(AtomicU32::new(value.to_bits())))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PipelineEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// A newly recognised gesture.
    Gesture(Gesture),
    /// Replacement for the HUD status line.
    Status(String),
    /// Debug-mode landmarks; `None` once the hand leaves.
    Landmarks(Option<Vec<Vec3>>),
}

// ════════════════════════════════════════════════════════════════════════════
// GesturePipeline — pure per-frame processing
// ════════════════════════════════════════════════════════════════════════════

/// Result of processing one detection.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutput {
    /// Set only when the classified gesture changes.
    pub gesture:   Option<Gesture>,
    pub control:   f32,
    pub status:    Option<String>,
    pub landmarks: Option<Option<Vec<Vec3>>>,
}

impl FrameOutput {
    pub fn into_events(self) -> Vec<PipelineEvent> {
        let mut out = Vec::new();
        if let Some(g) = self.gesture     { out.push(PipelineEvent::Gesture(g)); }
        if let Some(s) = self.status      { out.push(PipelineEvent::Status(s)); }
        if let Some(l) = self.landmarks   { out.push(PipelineEvent::Landmarks(l)); }
        out
    }
}

pub struct GesturePipeline {
    thresholds: GestureThresholds,
    signal:     ControlSignal,
    /// Last gesture emitted; cleared once the hand has been without it
    /// for `rearm_frames` frames in a row.
    held:       Option<Gesture>,
    /// Consecutive frames with no gesture (no hand or in-band).
    quiet:      u32,
}

impl GesturePipeline {
    pub fn new(thresholds: GestureThresholds, tuning: ControlTuning) -> Self {
        GesturePipeline { thresholds, signal: ControlSignal::new(tuning), held: None, quiet: 0 }
    }

    pub fn control(&self) -> f32 { self.signal.output() }

    /// Process one detection, `dt` seconds after the previous one.
    ///
    /// A gesture is emitted once when it appears. The same gesture fires
    /// again only after `rearm_frames` consecutive frames without any
    /// gesture, so a held pinch that flickers out for a frame or two still
    /// focuses one card. A different gesture fires at once.
    pub fn process(&mut self, detection: &Detection, dt: f32, debug: bool) -> FrameOutput {
        let Some(hand) = detection.hand() else {
            self.settle(None);
            let control = self.signal.update(None, dt);
            return FrameOutput {
                gesture:   None,
                control,
                status:    debug.then(|| STATUS_NO_HAND.to_string()),
                landmarks: debug.then_some(None),
            };
        };

        let class = classify(hand, &self.thresholds);
        let fresh = self.settle(class.gesture);

        let x = hand.wrist().x;
        let control = self.signal.update(Some(x), dt);

        let status = debug.then(|| match fresh {
            Some(g) => format!("DETECTED: {}", g),
            None    => format!("SPEED: {:.3} | X: {:.2}", control, x),
        });

        log::trace!(
            "hand x={:.3} pinch={:.3} open={:.3} → {:?} control={:.4}",
            x, class.features.pinch_distance, class.features.openness, class.gesture, control,
        );

        FrameOutput {
            gesture:   fresh,
            control,
            status,
            landmarks: debug.then(|| Some(hand.landmarks().to_vec())),
        }
    }

    /// Debounce one frame's classification; returns the gesture to emit.
    fn settle(&mut self, gesture: Option<Gesture>) -> Option<Gesture> {
        match gesture {
            Some(g) => {
                self.quiet = 0;
                if self.held == Some(g) {
                    return None;
                }
                self.held = Some(g);
                Some(g)
            }
            None => {
                self.quiet = self.quiet.saturating_add(1);
                if self.quiet >= self.thresholds.rearm_frames {
                    self.held = None;
                }
                None
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PipelineHandle — the thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the pipeline thread. Dropping it stops and joins the thread.
pub struct PipelineHandle {
    stop:    Arc<AtomicBool>,
    debug:   Arc<AtomicBool>,
    control: ControlCell,
    events:  Receiver<PipelineEvent>,
    thread:  Option<JoinHandle<()>>,
}

/// Start the pipeline. `make_source` runs on the pipeline thread, so the
/// source itself never has to cross threads.
pub fn spawn_pipeline<F, S>(
    make_source: F,
    thresholds:  GestureThresholds,
    tuning:      ControlTuning,
    debug:       bool,
) -> Result<PipelineHandle, AppError>
where
    F: FnOnce() -> S + Send + 'static,
    S: LandmarkSource,
{
    let stop    = Arc::new(AtomicBool::new(false));
    let dbg     = Arc::new(AtomicBool::new(debug));
    let control = ControlCell::default();
    let (tx, rx) = mpsc::channel();

    let worker = Worker {
        stop:     Arc::clone(&stop),
        debug:    Arc::clone(&dbg),
        control:  control.clone(),
        tx,
        pipeline: GesturePipeline::new(thresholds, tuning),
    };

    let thread = thread::Builder::new()
        .name("gesture-pipeline".into())
        .spawn(move || worker.run(make_source()))
        .map_err(|e| AppError::Pipeline(e.to_string()))?;

    Ok(PipelineHandle { stop, debug: dbg, control, events: rx, thread: Some(thread) })
}

impl PipelineHandle {
    /// Current orbit control (rad/s).
    pub fn control(&self) -> f32 { self.control.load() }

    pub fn debug(&self) -> bool { self.debug.load(Ordering::Relaxed) }

    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
    }

    /// Drain any pending events (non-blocking).
    pub fn drain_events(&self) -> Vec<PipelineEvent> {
        let mut out = Vec::new();
        while let Ok(e) = self.events.try_recv() { out.push(e); }
        out
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Stop the thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("gesture pipeline thread panicked");
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    stop:     Arc<AtomicBool>,
    debug:    Arc<AtomicBool>,
    control:  ControlCell,
    tx:       Sender<PipelineEvent>,
    pipeline: GesturePipeline,
}

impl Worker {
    fn stopped(&self) -> bool { self.stop.load(Ordering::Acquire) }

    fn status(&self, s: impl Into<String>) {
        let _ = self.tx.send(PipelineEvent::Status(s.into()));
    }

    fn start<S: LandmarkSource>(&self, source: &mut S) -> Result<(), SensorError> {
        self.status(STATUS_LOADING);
        source.load()?;
        self.status(STATUS_REQUEST);
        source.open()?;
        self.status(STATUS_READY);
        Ok(())
    }

    fn run<S: LandmarkSource>(mut self, mut source: S) {
        log::info!("gesture pipeline starting ({})", source.name());

        if let Err(e) = self.start(&mut source) {
            log::warn!("landmark source `{}` failed to start: {}", source.name(), e);
            self.status(error_status(&e));
            drop(source);
            self.control.store(0.0);
            while !self.stopped() {
                thread::sleep(IDLE_POLL);
            }
            log::info!("gesture pipeline stopped");
            return;
        }

        let mut last = Instant::now();
        let mut last_error: Option<SensorError> = None;

        while !self.stopped() {
            let detection = match source.next_detection() {
                Ok(d) => {
                    if last_error.take().is_some() {
                        self.status(STATUS_READY);
                    }
                    d
                }
                Err(e) => {
                    if last_error.as_ref() != Some(&e) {
                        log::warn!("landmark source `{}`: {}", source.name(), e);
                        self.status(error_status(&e));
                        last_error = Some(e);
                    }
                    thread::sleep(ERROR_BACKOFF);
                    Detection::NoHand
                }
            };

            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;

            let out = self.pipeline.process(&detection, dt, self.debug.load(Ordering::Relaxed));
            if self.stopped() {
                break;
            }
            self.control.store(out.control);
            for event in out.into_events() {
                if let PipelineEvent::Gesture(g) = &event {
                    log::debug!("gesture {}", g);
                }
                if self.tx.send(event).is_err() {
                    log::debug!("event receiver gone; pipeline exiting");
                    return;
                }
            }
        }

        drop(source);
        log::info!("gesture pipeline stopped");
    }
}
