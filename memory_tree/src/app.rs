//! Top-level application loop.
//!
//! `SceneContext` owns the swarm and the HUD state. It consumes
//! [`PipelineEvent`]s and [`UiCommand`]s and produces one [`SceneFrame`]
//! per display refresh for whatever [`Renderer`] is attached.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use tree_swarm::{Choreographer, SceneEvent, SceneFrame, SceneState};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::pipeline::{spawn_pipeline, PipelineEvent, PipelineHandle};
use crate::source::{ScriptedSource, SimInput};
use crate::visualizer::Visualizer;

pub const STATUS_INIT: &str = "INITIALIZING...";

// ════════════════════════════════════════════════════════════════════════════
// UI surface
// ════════════════════════════════════════════════════════════════════════════

/// Commands coming from the window (or any other UI).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    /// Manual assemble / disperse.
    Toggle,
    ToggleDebug,
    Set(SceneState),
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow { Continue, Quit }

/// Anything that can show a [`SceneFrame`].
pub trait Renderer {
    fn is_open(&self) -> bool;

    /// Collect UI commands since the last call.
    fn poll(&mut self) -> Vec<UiCommand>;

    fn render(&mut self, frame: &SceneFrame) -> AppResult<()>;
}

/// Renderer for headless runs: draws nothing and closes after a fixed
/// number of frames, pacing itself to the configured frame rate.
pub struct NullRenderer {
    remaining:   usize,
    rendered:    usize,
    period:      Duration,
    last_state:  Option<SceneState>,
    last_status: String,
}

impl NullRenderer {
    pub fn new(frames: usize, fps: usize) -> Self {
        NullRenderer {
            remaining:   frames,
            rendered:    0,
            period:      Duration::from_secs_f32(1.0 / fps.max(1) as f32),
            last_state:  None,
            last_status: String::new(),
        }
    }

    pub fn rendered(&self)    -> usize              { self.rendered }
    pub fn last_state(&self)  -> Option<SceneState> { self.last_state }
    pub fn last_status(&self) -> &str               { &self.last_status }
}

impl Renderer for NullRenderer {
    fn is_open(&self) -> bool { self.remaining > 0 }

    fn poll(&mut self) -> Vec<UiCommand> { Vec::new() }

    fn render(&mut self, frame: &SceneFrame) -> AppResult<()> {
        if self.last_state != Some(frame.state) {
            log::info!("t={:.2}s state {} ({} agents)", frame.time, frame.state, frame.agent_count());
        }
        if self.last_status != frame.status {
            log::info!("status: {}", frame.status);
            self.last_status.clone_from(&frame.status);
        }
        self.last_state = Some(frame.state);
        self.rendered += 1;
        self.remaining = self.remaining.saturating_sub(1);
        thread::sleep(self.period);
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SceneContext
// ════════════════════════════════════════════════════════════════════════════

pub struct SceneContext {
    swarm:     Choreographer,
    status:    String,
    /// Latest debug landmarks; empty when hidden.
    landmarks: Vec<Vec3>,
    debug:     bool,
}

impl SceneContext {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let swarm = Choreographer::new(&config.swarm, config.photos.len(), config.seed)?;
        Ok(SceneContext {
            swarm,
            status:    STATUS_INIT.to_string(),
            landmarks: Vec::new(),
            debug:     config.debug,
        })
    }

    pub fn state(&self)  -> SceneState     { self.swarm.state() }
    pub fn status(&self) -> &str           { &self.status }
    pub fn debug(&self)  -> bool           { self.debug }
    pub fn swarm(&self)  -> &Choreographer { &self.swarm }

    // ── process one PipelineEvent ────────────────────────────────────────

    pub fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Gesture(g) => {
                let state = self.swarm.handle(SceneEvent::Gesture(g));
                log::debug!("gesture {} → {}", g, state);
            }
            PipelineEvent::Status(s) => self.status = s,
            PipelineEvent::Landmarks(points) => {
                self.landmarks = match points {
                    Some(p) if self.debug => p,
                    _                     => Vec::new(),
                };
            }
        }
    }

    // ── process one UiCommand ────────────────────────────────────────────

    pub fn handle_ui(&mut self, cmd: UiCommand) -> Flow {
        match cmd {
            UiCommand::Toggle => {
                let state = self.swarm.handle(SceneEvent::Toggle);
                log::info!("manual toggle → {}", state);
            }
            UiCommand::Set(s) => {
                self.swarm.handle(SceneEvent::Set(s));
            }
            UiCommand::ToggleDebug => {
                self.debug = !self.debug;
                if !self.debug {
                    self.landmarks.clear();
                }
                log::info!("debug {}", if self.debug { "on" } else { "off" });
            }
            UiCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    // ── per-frame ─────────────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32, control: f32) -> AppResult<()> {
        self.swarm.advance(dt, control)?;
        Ok(())
    }

    pub fn frame(&self) -> AppResult<SceneFrame> {
        let mut frame = self.swarm.snapshot()?;
        frame.status.clone_from(&self.status);
        if self.debug {
            frame.landmarks.clone_from(&self.landmarks);
        }
        Ok(frame)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Open a window; hands come from the simulator or the LeapMotion.
    Window,
    /// No window; a scripted hand plays for `frames` frames.
    Headless { frames: usize },
}

/// Run the full application.
///
/// This is the entry point called from `main.rs`. It builds the swarm,
/// starts the gesture pipeline and drives the event/render loop until the
/// renderer closes or the user quits.
pub fn run(config: AppConfig, mode: RunMode) -> AppResult<()> {
    let mut ctx = SceneContext::new(&config)?;

    match mode {
        RunMode::Window => {
            let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
            let mut vis = Visualizer::new(sim_tx, &config.window)?;
            let pipeline = spawn_live_pipeline(sim_rx, &config)?;
            drive(&mut vis, &mut ctx, &pipeline)
        }
        RunMode::Headless { frames } => {
            let mut null = NullRenderer::new(frames, config.window.fps);
            let pipeline = spawn_pipeline(
                ScriptedSource::demo,
                config.gesture,
                config.control,
                config.debug,
            )?;
            drive(&mut null, &mut ctx, &pipeline)?;
            log::info!(
                "headless run finished: {} frames, final state {}",
                null.rendered(),
                ctx.state(),
            );
            Ok(())
        }
    }
}

#[cfg(not(feature = "leap"))]
fn spawn_live_pipeline(sim_rx: Receiver<SimInput>, config: &AppConfig) -> AppResult<PipelineHandle> {
    use crate::source::SimLandmarkSource;
    spawn_pipeline(
        move || SimLandmarkSource::new(sim_rx),
        config.gesture,
        config.control,
        config.debug,
    )
}

#[cfg(feature = "leap")]
fn spawn_live_pipeline(_sim_rx: Receiver<SimInput>, config: &AppConfig) -> AppResult<PipelineHandle> {
    use crate::source::LeapLandmarkSource;
    spawn_pipeline(LeapLandmarkSource::new, config.gesture, config.control, config.debug)
}

/// One iteration per display refresh until the renderer closes.
pub fn drive<R: Renderer>(
    renderer: &mut R,
    ctx:      &mut SceneContext,
    pipeline: &PipelineHandle,
) -> AppResult<()> {
    let mut last = Instant::now();

    while renderer.is_open() {
        // 1. UI commands
        for cmd in renderer.poll() {
            if ctx.handle_ui(cmd) == Flow::Quit {
                return Ok(());
            }
            pipeline.set_debug(ctx.debug());
        }

        // 2. Drain pipeline events
        for event in pipeline.drain_events() {
            ctx.handle_event(event);
        }

        // 3. Per-frame logic
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;
        ctx.tick(dt, pipeline.control())?;

        // 4. Render
        renderer.render(&ctx.frame()?)?;
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
