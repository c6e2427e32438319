use std::sync::Arc;

use crate::assets::Texture;

/// Heuristic depth priors: three alpha masks that split one image into
/// foreground, mid and background bands. Deterministic functions of the
/// image dimensions only, not content-aware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskKind {
    /// Radial gradient centered low in the frame; isolates near content.
    Foreground,
    /// Horizontal band across the middle of the frame.
    Mid,
    /// Top-heavy vertical gradient; isolates sky and distant content.
    Background,
}

impl MaskKind {
    pub const ALL: [MaskKind; 3] = [MaskKind::Foreground, MaskKind::Mid, MaskKind::Background];

    /// Mask opacity at normalized coordinates (0..1, y down).
    pub fn alpha_at(self, u: f64, v: f64) -> f64 {
        match self {
            MaskKind::Foreground => {
                // Radial falloff from (0.5, 0.85), opaque within 0.05 of
                // frame height, transparent beyond 0.6.
                // Distance in normalized frame units keeps the far corners
                // inside the falloff, so the three-mask union never drops
                // to zero anywhere in the frame.
                let dx = u - 0.5;
                let dy = v - 0.85;
                let dist = (dx * dx + dy * dy).sqrt();
                ramp_down(dist, 0.05, 0.6)
            }
            MaskKind::Mid => {
                if v <= 0.15 || v >= 0.75 {
                    0.0
                } else if v < 0.45 {
                    (v - 0.15) / 0.30
                } else {
                    1.0 - (v - 0.45) / 0.30
                }
            }
            MaskKind::Background => ramp_down(v, 0.0, 0.5),
        }
    }
}

fn ramp_down(x: f64, full_until: f64, zero_at: f64) -> f64 {
    if x <= full_until {
        1.0
    } else if x >= zero_at {
        0.0
    } else {
        1.0 - (x - full_until) / (zero_at - full_until)
    }
}

/// Produces three textures sharing the source's color data, each
/// alpha-multiplied by its mask (destination-in compositing: color and
/// alpha scale together, pixels stay premultiplied).
pub fn synthesize_depth_textures(source: &Texture) -> [Texture; 3] {
    MaskKind::ALL.map(|kind| apply_mask(source, kind))
}

fn apply_mask(source: &Texture, kind: MaskKind) -> Texture {
    let w = source.width;
    let h = source.height;
    let mut out = source.rgba8_premul.as_ref().clone();

    for y in 0..h {
        let v = if h > 1 {
            f64::from(y) / f64::from(h - 1)
        } else {
            0.0
        };
        for x in 0..w {
            let u = if w > 1 {
                f64::from(x) / f64::from(w - 1)
            } else {
                0.0
            };
            let m = kind.alpha_at(u, v);
            let q = (m * 255.0).round().clamp(0.0, 255.0) as u16;
            let idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                let p = u16::from(out[idx + c]);
                out[idx + c] = ((p * q + 127) / 255) as u8;
            }
        }
    }

    Texture {
        width: w,
        height: h,
        rgba8_premul: Arc::new(out),
    }
}

/// Synthetic vertical-gradient placeholder, used when the image source
/// fails to decode so the pipeline never renders nothing.
pub fn placeholder_texture(width: u32, height: u32) -> Texture {
    let width = width.max(1);
    let height = height.max(1);
    // #1f2937 at the top to #111827 at the bottom, fully opaque.
    let top = [0x1f_u8, 0x29, 0x37];
    let bottom = [0x11_u8, 0x18, 0x27];

    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        let t = if height > 1 {
            f64::from(y) / f64::from(height - 1)
        } else {
            0.0
        };
        let mut px = [0u8; 4];
        for c in 0..3 {
            let v = f64::from(top[c]) + (f64::from(bottom[c]) - f64::from(top[c])) * t;
            px[c] = v.round() as u8;
        }
        px[3] = 255;
        for _ in 0..width {
            data.extend_from_slice(&px);
        }
    }

    Texture {
        width,
        height,
        rgba8_premul: Arc::new(data),
    }
}

/// Per-pixel maximum of the three masks over a sampling grid; the minimum
/// of that maximum is the worst coverage anywhere in the frame.
pub fn min_combined_coverage(samples_x: u32, samples_y: u32) -> f64 {
    let mut worst = f64::MAX;
    for sy in 0..samples_y {
        let v = f64::from(sy) / f64::from(samples_y.max(2) - 1);
        for sx in 0..samples_x {
            let u = f64::from(sx) / f64::from(samples_x.max(2) - 1);
            let best = MaskKind::ALL
                .iter()
                .map(|k| k.alpha_at(u, v))
                .fold(0.0_f64, f64::max);
            worst = worst.min(best);
        }
    }
    worst
}
