//! Packed ARGB colors (`0xAARRGGBB`) used for agent visual tags.

use rand::Rng;

pub const EMERALD: u32 = 0xFF004225;
pub const GOLD:    u32 = 0xFFFFD700;
pub const RED:     u32 = 0xFFD32F2F;
pub const WHITE:   u32 = 0xFFFFFFFF;

/// Fairy-light bulb colors.
pub const LIGHTS: [u32; 4] = [0xFFFF0000, 0xFF00FF00, 0xFF0000FF, 0xFFFFFF00];

/// Polaroid border colors (soft retro tones).
pub const BORDERS: [u32; 7] = [
    0xFFFFFAF0, 0xFFF0E68C, 0xFFE6E6FA, 0xFFFFB6C1,
    0xFF98FB98, 0xFF87CEFA, 0xFFFFDAB9,
];

/// Gift-box and bauble colors.
pub const GIFTS: [u32; 4] = [0xFFD32F2F, 0xFFFFD700, 0xFF1976D2, 0xFF2E7D32];

/// Pick a uniformly random entry from a non-empty palette.
pub fn pick<R: Rng>(rng: &mut R, palette: &[u32]) -> u32 {
    palette[rng.gen_range(0..palette.len())]
}

/// Linear blend of two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t) as u32;
    let (ar, ag, ab) = channels(a);
    let (br, bg, bb) = channels(b);
    pack(lerp(ar, br), lerp(ag, bg), lerp(ab, bb))
}

/// Multiply each channel by `k` (saturating), e.g. for glow levels above 1.
pub fn scale(c: u32, k: f32) -> u32 {
    let k = k.max(0.0);
    let s = |ch: u32| ((ch as f32 * k).round() as u32).min(255);
    let (r, g, b) = channels(c);
    pack(s(r), s(g), s(b))
}

/// Saturating per-channel add, used for additive point sprites.
pub fn add(a: u32, b: u32) -> u32 {
    let (ar, ag, ab) = channels(a);
    let (br, bg, bb) = channels(b);
    pack((ar + br).min(255), (ag + bg).min(255), (ab + bb).min(255))
}

/// HSV → packed ARGB. Hue in degrees, saturation and value in 0–1.
pub fn hsv(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    pack((r * 255.0) as u32, (g * 255.0) as u32, (b * 255.0) as u32)
}

fn channels(c: u32) -> (u32, u32, u32) {
    ((c >> 16) & 0xFF, (c >> 8) & 0xFF, c & 0xFF)
}

fn pack(r: u32, g: u32, b: u32) -> u32 {
    0xFF000000 | (r << 16) | (g << 8) | b
}
