//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌───────────────────────────────────────────────────┬──────────────┐
//! │ MEMORY TREE                                       │  landmark    │
//! │ STATE / AGENTS                                    │  inset       │
//! │                                                   │  (debug)     │
//! │                      ★                            └──────────────┤
//! │                 perspective swarm                                │
//! │                                                                  │
//! │ status bar                                                       │
//! │ key legend                                                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All drawing goes through [`Canvas`], a depth-tested ARGB framebuffer
//! that knows nothing about the window, so it can be exercised headless.

use std::sync::mpsc::Sender;
use std::time::Duration;

use glam::{Mat4, Vec3};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use tree_swarm::camera::CameraPose;
use tree_swarm::palette;
use tree_swarm::{AgentTransform, SceneFrame, Variant};

use crate::app::{Renderer, UiCommand};
use crate::config::WindowConfig;
use crate::error::{AppError, AppResult};
use crate::landmarks::CONNECTIONS;
use crate::source::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const BG_TOP:       u32 = 0xFF000000;
const BG_BOTTOM:    u32 = 0xFF00140C;
const TEXT_BG:      u32 = 0xFF0B1A12;
const TEXT_COLOR:   u32 = 0xFFEEEEEE;
const LEGEND_COLOR: u32 = 0xFF888888;
const INSET_BG:     u32 = 0xFF101010;
const BONE_COLOR:   u32 = palette::GOLD;
const JOINT_COLOR:  u32 = 0xFFFF0000;
const BLANK_PHOTO:  u32 = 0xFF303030;
const INSET_W:      usize = 200;
const INSET_H:      usize = 150;
const STATUS_H:     usize = 40;

/// Polaroid frame and photo window in card-local units.
const CARD_HALF_W:  f32 = 0.6;
const CARD_HALF_H:  f32 = 0.75;
const PHOTO_HALF:   f32 = 0.5;
const PHOTO_LIFT:   f32 = 0.15;

/// World-space radius of one foliage point at size 1.
const NEEDLE_SIZE:  f32 = 0.06;

/// Placeholder tint for photo `i`: golden-angle hue steps.
fn photo_tint(texture: Option<usize>) -> u32 {
    match texture {
        Some(i) => palette::hsv(i as f32 * 137.5, 0.35, 0.85),
        None    => BLANK_PHOTO,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Projector — world → screen
// ════════════════════════════════════════════════════════════════════════════

struct Projector {
    view_proj: Mat4,
    w:         f32,
    h:         f32,
    /// Pixels per world unit at distance 1.
    focal:     f32,
    near:      f32,
}

impl Projector {
    fn new(pose: &CameraPose, w: usize, h: usize) -> Self {
        let aspect = w as f32 / h.max(1) as f32;
        Projector {
            view_proj: pose.projection(aspect) * pose.view(),
            w:         w as f32,
            h:         h as f32,
            focal:     (h as f32 / 2.0) / (pose.fov_y / 2.0).tan(),
            near:      pose.near,
        }
    }

    /// Screen position with view depth in `z`, or `None` behind the lens.
    fn project(&self, p: Vec3) -> Option<Vec3> {
        let clip = self.view_proj * p.extend(1.0);
        if clip.w <= self.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec3::new(
            (ndc.x + 1.0) * 0.5 * self.w,
            (1.0 - ndc.y) * 0.5 * self.h,
            clip.w,
        ))
    }

    fn radius(&self, world: f32, depth: f32) -> f32 {
        world * self.focal / depth
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    w:     usize,
    h:     usize,
    buf:   Vec<u32>,
    depth: Vec<f32>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { w, h, buf: vec![BG_TOP; w * h], depth: vec![f32::INFINITY; w * h] }
    }

    pub fn width(&self)  -> usize  { self.w }
    pub fn height(&self) -> usize  { self.h }
    pub fn pixels(&self) -> &[u32] { &self.buf }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    /// Vertical night-sky gradient; resets the depth buffer.
    pub fn clear(&mut self) {
        for row in 0..self.h {
            let c = palette::blend(BG_TOP, BG_BOTTOM, row as f32 / self.h.max(1) as f32);
            self.buf[row * self.w..(row + 1) * self.w].fill(c);
        }
        self.depth.fill(f32::INFINITY);
    }

    /// Draw one frame of the scene plus the HUD.
    pub fn draw_scene(&mut self, frame: &SceneFrame) {
        self.clear();
        let proj = Projector::new(&frame.camera, self.w, self.h);

        let leaf = palette::scale(palette::EMERALD, frame.foliage_glow);
        for t in &frame.foliage {
            self.draw_needle(&proj, t, leaf);
        }
        for t in &frame.photos {
            self.draw_card(&proj, t);
        }
        for t in &frame.props {
            self.draw_prop(&proj, t);
        }
        for t in &frame.lights {
            self.draw_bulb(&proj, t);
        }
        for t in &frame.star {
            self.draw_star(&proj, t);
        }

        self.draw_hud(frame);
        if !frame.landmarks.is_empty() {
            self.draw_landmark_inset(&frame.landmarks);
        }
    }

    // ── Agents ────────────────────────────────────────────────────────────

    fn draw_needle(&mut self, proj: &Projector, t: &AgentTransform, color: u32) {
        let Some(s) = proj.project(t.position) else { return };
        let r = proj.radius(NEEDLE_SIZE * t.visual.size, s.z);
        if r < 0.75 {
            self.plot(s.x as isize, s.y as isize, s.z, color);
        } else {
            self.fill_disc(s.x, s.y, r, s.z, color);
        }
    }

    fn draw_card(&mut self, proj: &Projector, t: &AgentTransform) {
        let corner = |x: f32, y: f32, z: f32| {
            proj.project(t.position + t.rotation * (Vec3::new(x, y, z) * t.scale))
        };
        let quad = |x0: f32, y0: f32, x1: f32, y1: f32, z: f32| {
            Some([corner(x0, y0, z)?, corner(x1, y0, z)?, corner(x1, y1, z)?, corner(x0, y1, z)?])
        };

        let Some(frame) = quad(-CARD_HALF_W, -CARD_HALF_H, CARD_HALF_W, CARD_HALF_H, 0.0) else { return };
        self.fill_quad(frame, t.visual.color);

        // Photo window on both faces, nudged off the frame so it wins the
        // depth test from either side.
        let tint = photo_tint(t.visual.texture);
        let (y0, y1) = (PHOTO_LIFT - PHOTO_HALF, PHOTO_LIFT + PHOTO_HALF);
        for z in [0.02, -0.02] {
            if let Some(photo) = quad(-PHOTO_HALF, y0, PHOTO_HALF, y1, z) {
                self.fill_quad(photo, tint);
            }
        }
    }

    fn draw_prop(&mut self, proj: &Projector, t: &AgentTransform) {
        let Some(s) = proj.project(t.position) else { return };
        let r = proj.radius(0.5 * t.scale, s.z).max(1.0);
        let color = t.visual.color;
        match t.visual.variant {
            Variant::Gift => {
                let (x, y, side) = (s.x - r, s.y - r, (2.0 * r) as usize);
                self.fill_rect_depth(x as isize, y as isize, side, side, s.z, color);
                // Ribbon cross
                let ribbon = palette::GOLD;
                self.fill_rect_depth((s.x - r / 5.0) as isize, y as isize, (r / 2.5).max(1.0) as usize, side, s.z - 0.01, ribbon);
                self.fill_rect_depth(x as isize, (s.y - r / 5.0) as isize, side, (r / 2.5).max(1.0) as usize, s.z - 0.01, ribbon);
            }
            Variant::Cane => {
                let axis = t.rotation * Vec3::Y * t.scale * 0.6;
                for i in 0..6 {
                    let u = i as f32 / 5.0 * 2.0 - 1.0;
                    if let Some(p) = proj.project(t.position + axis * u) {
                        let stripe = if i % 2 == 0 { color } else { palette::WHITE };
                        self.fill_disc(p.x, p.y, r * 0.35, p.z, stripe);
                    }
                }
            }
            _ => {
                self.fill_disc(s.x, s.y, r, s.z, color);
                let shine = palette::blend(color, palette::WHITE, 0.6);
                self.fill_disc(s.x - r * 0.35, s.y - r * 0.35, r * 0.25, s.z - 0.01, shine);
            }
        }
    }

    fn draw_bulb(&mut self, proj: &Projector, t: &AgentTransform) {
        let Some(s) = proj.project(t.position) else { return };
        let r = proj.radius(t.scale, s.z).max(1.0);
        let glow = t.visual.emissive;
        if glow > 0.0 {
            self.glow_disc(s.x, s.y, r * (1.0 + glow * 0.4), palette::scale(t.visual.color, glow / 10.0));
            self.fill_disc(s.x, s.y, r, s.z, palette::blend(t.visual.color, palette::WHITE, 0.3));
        } else {
            self.fill_disc(s.x, s.y, r, s.z, palette::scale(t.visual.color, 0.35));
        }
    }

    fn draw_star(&mut self, proj: &Projector, t: &AgentTransform) {
        if t.scale <= 0.01 {
            return;
        }
        let Some(s) = proj.project(t.position) else { return };
        let r = proj.radius(1.2 * t.scale, s.z);
        self.glow_disc(s.x, s.y, r * 2.5, palette::scale(t.visual.color, 0.25 * t.visual.emissive));
        let spin = t.rotation.to_euler(glam::EulerRot::YXZ).0;
        self.fill_star(s.x, s.y, r, spin, s.z, t.visual.color);
    }

    // ── HUD ───────────────────────────────────────────────────────────────

    fn draw_hud(&mut self, frame: &SceneFrame) {
        self.draw_label("MEMORY TREE", 12, 12, palette::GOLD, 3);
        self.draw_label(&format!("STATE: {}", frame.state), 12, 36, TEXT_COLOR, 2);
        self.draw_label(&format!("AGENTS: {}", frame.agent_count()), 12, 52, LEGEND_COLOR, 1);
        if let Some(i) = frame.focused.filter(|_| frame.state == tree_swarm::SceneState::Focus) {
            self.draw_label(&format!("PHOTO {}", i + 1), 12, 62, LEGEND_COLOR, 1);
        }

        let status_y = self.h.saturating_sub(STATUS_H);
        self.fill_rect(0, status_y, self.w, STATUS_H, TEXT_BG);
        self.draw_label(&frame.status, 10, status_y + 8, TEXT_COLOR, 2);
        self.draw_label(
            "1=open 2=fist 3=pinch 4=relax  h=hide  arrows/mouse=move  space=toggle  g=debug  q=quit",
            10, status_y + 26, LEGEND_COLOR, 1,
        );
    }

    /// Mirrored, like looking into a webcam preview.
    fn draw_landmark_inset(&mut self, landmarks: &[Vec3]) {
        let x0 = self.w.saturating_sub(INSET_W + 10);
        let y0 = 10;
        self.fill_rect(x0, y0, INSET_W, INSET_H, INSET_BG);
        self.draw_border(x0, y0, INSET_W, INSET_H, BONE_COLOR);

        let to_px = |p: Vec3| {
            (
                x0 as isize + ((1.0 - p.x.clamp(0.0, 1.0)) * INSET_W as f32) as isize,
                y0 as isize + (p.y.clamp(0.0, 1.0) * INSET_H as f32) as isize,
            )
        };
        for &(a, b) in CONNECTIONS.iter() {
            if let (Some(&pa), Some(&pb)) = (landmarks.get(a), landmarks.get(b)) {
                let (ax, ay) = to_px(pa);
                let (bx, by) = to_px(pb);
                self.draw_line(ax, ay, bx, by, BONE_COLOR);
            }
        }
        for &p in landmarks {
            let (x, y) = to_px(p);
            self.fill_rect(x.max(1) as usize - 1, y.max(1) as usize - 1, 3, 3, JOINT_COLOR);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.w && y < self.h {
            self.buf[y * self.w + x] = color;
        }
    }

    /// Depth-tested pixel write.
    fn plot(&mut self, x: isize, y: isize, z: f32, color: u32) {
        if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
            return;
        }
        let i = y as usize * self.w + x as usize;
        if z < self.depth[i] {
            self.depth[i] = z;
            self.buf[i] = color;
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    fn fill_rect_depth(&mut self, x: isize, y: isize, w: usize, h: usize, z: f32, color: u32) {
        for row in y..y + h as isize {
            for col in x..x + w as isize {
                self.plot(col, row, z, color);
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 {
            return;
        }
        for col in x..(x + w).min(self.w) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y + h).min(self.h) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            if x >= 0 && y >= 0 {
                self.set_pixel(x as usize, y as usize, color);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    fn fill_disc(&mut self, cx: f32, cy: f32, r: f32, z: f32, color: u32) {
        let ri = r.ceil() as isize;
        let (x0, y0) = (cx as isize, cy as isize);
        for dy in -ri..=ri {
            for dx in -ri..=ri {
                if ((dx * dx + dy * dy) as f32) <= r * r {
                    self.plot(x0 + dx, y0 + dy, z, color);
                }
            }
        }
    }

    /// Additive halo fading out toward `r`; ignores depth.
    fn glow_disc(&mut self, cx: f32, cy: f32, r: f32, color: u32) {
        let ri = r.ceil() as isize;
        let (x0, y0) = (cx as isize, cy as isize);
        for dy in -ri..=ri {
            for dx in -ri..=ri {
                let (x, y) = (x0 + dx, y0 + dy);
                if x < 0 || y < 0 || x as usize >= self.w || y as usize >= self.h {
                    continue;
                }
                let d = ((dx * dx + dy * dy) as f32).sqrt() / r.max(1e-3);
                if d < 1.0 {
                    let i = y as usize * self.w + x as usize;
                    self.buf[i] = palette::add(self.buf[i], palette::scale(color, (1.0 - d).powi(2)));
                }
            }
        }
    }

    /// Filled triangle with per-pixel interpolated depth.
    fn fill_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: u32) {
        let area = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
        if area.abs() < 1e-6 {
            return;
        }
        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as isize;
        let max_x = a.x.max(b.x).max(c.x).ceil().min(self.w as f32 - 1.0) as isize;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as isize;
        let max_y = a.y.max(b.y).max(c.y).ceil().min(self.h as f32 - 1.0) as isize;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = ((b.x - px) * (c.y - py) - (c.x - px) * (b.y - py)) / area;
                let w1 = ((c.x - px) * (a.y - py) - (a.x - px) * (c.y - py)) / area;
                let w2 = 1.0 - w0 - w1;
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    self.plot(x, y, w0 * a.z + w1 * b.z + w2 * c.z, color);
                }
            }
        }
    }

    fn fill_quad(&mut self, q: [Vec3; 4], color: u32) {
        self.fill_triangle(q[0], q[1], q[2], color);
        self.fill_triangle(q[0], q[2], q[3], color);
    }

    /// Five-pointed star rotated by `spin`.
    fn fill_star(&mut self, cx: f32, cy: f32, r: f32, spin: f32, z: f32, color: u32) {
        let centre = Vec3::new(cx, cy, z);
        let point = |k: usize, radius: f32| {
            let a = spin - std::f32::consts::FRAC_PI_2 + k as f32 * std::f32::consts::PI / 5.0;
            Vec3::new(cx + radius * a.cos(), cy + radius * a.sin(), z)
        };
        for k in 0..10 {
            let (r0, r1) = if k % 2 == 0 { (r, r * 0.45) } else { (r * 0.45, r) };
            self.fill_triangle(centre, point(k, r0), point(k + 1, r1), color);
        }
    }

    /// 3×5 bitmap font, `scale` pixels per font pixel.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32, scale: usize) {
        let scale = scale.max(1);
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
            if cx + 4 * scale > self.w { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '|' => [0b010, 0b010, 0b010, 0b010, 0b010],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer — window + canvas
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:  Window,
    canvas:  Canvas,
    sim_tx:  Sender<SimInput>,
    pointer: Option<f32>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>, cfg: &WindowConfig) -> AppResult<Self> {
        let mut window = Window::new(
            "Memory Tree",
            cfg.width, cfg.height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32)));

        Ok(Visualizer {
            window,
            canvas: Canvas::new(cfg.width, cfg.height),
            sim_tx,
            pointer: None,
        })
    }

    fn send(&self, input: SimInput) {
        let _ = self.sim_tx.send(input);
    }
}

impl Renderer for Visualizer {
    fn is_open(&self) -> bool { self.window.is_open() }

    /// Scene keys become UI commands; hand keys go to the simulator.
    fn poll(&mut self) -> Vec<UiCommand> {
        let mut cmds = Vec::new();
        if !self.window.is_open() {
            return cmds;
        }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if one_shot(Key::Q) || one_shot(Key::Escape) { cmds.push(UiCommand::Quit); }
        if one_shot(Key::Space) { cmds.push(UiCommand::Toggle); }
        if one_shot(Key::G)     { cmds.push(UiCommand::ToggleDebug); }

        let hand_keys = [
            (Key::Key1, SimKey::OpenPalm),
            (Key::Key2, SimKey::Fist),
            (Key::Key3, SimKey::Pinch),
            (Key::Key4, SimKey::Relax),
            (Key::H,    SimKey::HideHand),
            (Key::C,    SimKey::Centre),
            (Key::Left, SimKey::MoveLeft),
            (Key::Right, SimKey::MoveRight),
        ];
        for (key, sim) in hand_keys {
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                self.send(SimInput::KeyDown(sim));
            }
            if self.window.is_key_released(key) {
                self.send(SimInput::KeyUp(sim));
            }
        }

        // Dragging with the left button moves the simulated wrist.
        if self.window.get_mouse_down(MouseButton::Left) {
            if let Some((mx, _)) = self.window.get_mouse_pos(MouseMode::Clamp) {
                let x = mx / self.canvas.width().max(1) as f32;
                if self.pointer != Some(x) {
                    self.pointer = Some(x);
                    self.send(SimInput::Pointer(x));
                }
            }
        }

        cmds
    }

    fn render(&mut self, frame: &SceneFrame) -> AppResult<()> {
        self.canvas.draw_scene(frame);
        self.window
            .update_with_buffer(self.canvas.pixels(), self.canvas.width(), self.canvas.height())
            .map_err(|e| AppError::Window(e.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use tree_swarm::{Choreographer, SceneEvent, SceneState, SwarmConfig};
    use tree_swarm::Gesture;

    fn swarm() -> Choreographer {
        let cfg = SwarmConfig { foliage: 500, photos: 10, props: 10, lights: 40, ..SwarmConfig::default() };
        Choreographer::new(&cfg, 4, Some(3)).unwrap()
    }

    fn lit_pixels(c: &Canvas) -> usize {
        let mut clean = Canvas::new(c.width(), c.height());
        clean.clear();
        c.pixels().iter().zip(clean.pixels()).filter(|(a, b)| a != b).count()
    }

    #[test]
    fn projector_centres_the_target() {
        let pose = swarm().camera().pose();
        let proj = Projector::new(&pose, 320, 240);
        let s = proj.project(pose.target).unwrap();
        assert!((s.x - 160.0).abs() < 0.5 && (s.y - 120.0).abs() < 0.5);
        assert!(proj.project(pose.eye - pose.forward() * 5.0).is_none());
    }

    #[test]
    fn scene_draws_something() {
        let mut c = Canvas::new(320, 240);
        let frame = swarm().snapshot().unwrap();
        c.draw_scene(&frame);
        assert!(lit_pixels(&c) > 500);
    }

    #[test]
    fn formed_tree_lights_up_the_star() {
        let mut s = swarm();
        s.handle(SceneEvent::Gesture(Gesture::Fist));
        for _ in 0..600 {
            s.advance(1.0 / 60.0, 0.0).unwrap();
        }
        let frame = s.snapshot().unwrap();
        assert_eq!(frame.state, SceneState::Formed);
        let mut c = Canvas::new(320, 240);
        c.draw_scene(&frame);
        let proj = Projector::new(&frame.camera, 320, 240);
        let top = proj.project(frame.star[0].position).unwrap();
        let mut sky = Canvas::new(320, 240);
        sky.clear();
        let (x, y) = (top.x as usize, top.y as usize);
        assert_ne!(c.pixel(x, y), sky.pixel(x, y));
    }

    #[test]
    fn landmark_inset_only_with_landmarks() {
        let mut s = swarm().snapshot().unwrap();
        let mut a = Canvas::new(400, 300);
        a.draw_scene(&s);
        let inset_corner = (400 - INSET_W - 10, 10);
        assert_ne!(a.pixel(inset_corner.0, inset_corner.1), Some(BONE_COLOR));

        s.landmarks = crate::landmarks::HandFrame::synthetic(crate::landmarks::Pose::Open, 0.5)
            .landmarks()
            .to_vec();
        let mut b = Canvas::new(400, 300);
        b.draw_scene(&s);
        assert_eq!(b.pixel(inset_corner.0, inset_corner.1), Some(BONE_COLOR));
    }

    #[test]
    fn photo_tints_differ_and_blank_without_texture() {
        assert_ne!(photo_tint(Some(0)), photo_tint(Some(1)));
        assert_eq!(photo_tint(None), BLANK_PHOTO);
    }

    #[test]
    fn lines_and_triangles_stay_in_bounds() {
        let mut c = Canvas::new(50, 40);
        c.draw_line(-20, -20, 100, 100, 0xFFFFFFFF);
        c.fill_triangle(Vec3::new(-50.0, -50.0, 1.0), Vec3::new(200.0, 0.0, 1.0), Vec3::new(0.0, 200.0, 1.0), 0xFF00FF00);
        c.draw_label("STATUS: OK (1/2)", 45, 35, 0xFFFFFFFF, 2);
        assert_eq!(c.pixel(0, 0), Some(0xFF00FF00));
    }
}
