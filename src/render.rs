use glam::DVec3;
use kurbo::{Affine, Point};

use crate::{
    camera::{CAMERA_FOV_DEG, CAMERA_REST_Z, CameraPose},
    composite::{additive, mix, over},
    error::{CinedriftError, CinedriftResult},
    layer::{DepthLayer, LAYER_HEIGHT, LAYER_WIDTH},
    particles::{PARTICLE_OPACITY, ParticleField},
};

/// Far plane used to normalize the depth map.
pub const FAR_PLANE: f64 = 100.0;

/// Linear fog band, matching the scene's atmosphere constants.
pub const FOG_NEAR: f64 = 8.0;
pub const FOG_FAR: f64 = 18.0;

/// Scene clear color, `#0b0b0b` opaque (doubles as the fog color).
pub const CLEAR_RGBA: [u8; 4] = [0x0b, 0x0b, 0x0b, 0xff];

/// Static scene lighting: a 0.8 ambient term plus a 0.4 directional light
/// from (-2, 3, 2). The layer quads all face the camera (the wobble
/// rotation is in-plane), so the Lambert term collapses to one constant:
/// `0.8 + 0.4 * (2 / sqrt(17))` ~= 0.994, here in 0..255 fixed point.
/// Particle sprites are emissive and take no shading.
const LAYER_SHADE: u16 = 253;

/// One rendered output frame, premultiplied RGBA8, row-major.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl Frame {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(px_count * 4);
        for _ in 0..px_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Per-pixel scene depth, normalized by the far plane (1.0 where nothing
/// was drawn). Feeds the depth-of-field pass.
#[derive(Clone, Debug)]
pub struct DepthMap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl DepthMap {
    fn far(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![1.0; (width * height) as usize],
        }
    }
}

/// Pinhole projection with a look-at recentering term: the camera's target
/// always lands at the frame center, which is what turns the camera's
/// drift into parallax between the depth layers.
struct Projector {
    width: f64,
    height: f64,
    focal_px: f64,
    camera: CameraPose,
    recenter_x: f64,
    recenter_y: f64,
}

impl Projector {
    fn new(camera: &CameraPose, width: u32, height: u32) -> Self {
        let height_f = f64::from(height);
        let focal_px = (height_f * 0.5) / (CAMERA_FOV_DEG.to_radians() * 0.5).tan();
        let dz = camera.position.z - camera.target.z;
        let (recenter_x, recenter_y) = if dz > f64::EPSILON {
            (
                focal_px * (camera.target.x - camera.position.x) / dz,
                focal_px * (camera.target.y - camera.position.y) / dz,
            )
        } else {
            (0.0, 0.0)
        };
        Self {
            width: f64::from(width),
            height: height_f,
            focal_px,
            camera: *camera,
            recenter_x,
            recenter_y,
        }
    }

    fn depth_of(&self, z: f64) -> f64 {
        self.camera.position.z - z
    }

    /// Screen position and camera depth of a world point; `None` behind
    /// the near limit.
    fn project(&self, p: DVec3) -> Option<(f64, f64, f64)> {
        let depth = self.depth_of(p.z);
        if depth < 0.1 {
            return None;
        }
        let sx = self.width * 0.5 + self.focal_px * (p.x - self.camera.position.x) / depth
            - self.recenter_x;
        let sy = self.height * 0.5
            - (self.focal_px * (p.y - self.camera.position.y) / depth - self.recenter_y);
        Some((sx, sy, depth))
    }
}

/// Rasterizes the layer stack and particle field for one frame.
///
/// Layers composite back-to-front in stack order (the stack is stored
/// farthest-first) and write the depth map; particles blend additively on
/// top without touching depth, matching their depth-write-off material.
pub fn render_scene(
    layers: &[DepthLayer],
    particles: &ParticleField,
    camera: &CameraPose,
    width: u32,
    height: u32,
) -> CinedriftResult<(Frame, DepthMap)> {
    if width == 0 || height == 0 {
        return Err(CinedriftError::render("render surface must be at least 1x1"));
    }

    let mut frame = Frame::solid(width, height, CLEAR_RGBA);
    let mut depth_map = DepthMap::far(width, height);
    let projector = Projector::new(camera, width, height);

    for layer in layers {
        draw_layer(&mut frame, &mut depth_map, &projector, layer)?;
    }
    draw_particles(&mut frame, &projector, particles);

    Ok((frame, depth_map))
}

fn draw_layer(
    frame: &mut Frame,
    depth_map: &mut DepthMap,
    projector: &Projector,
    layer: &DepthLayer,
) -> CinedriftResult<()> {
    let Some((cx, cy, depth)) = projector.project(layer.position) else {
        return Ok(());
    };
    let scale = projector.focal_px / depth;

    // Local quad coordinates (x right, y up, origin at the quad center)
    // to screen pixels.
    let to_screen = Affine::translate((cx, cy))
        * Affine::FLIP_Y
        * Affine::rotate(layer.rotation_z)
        * Affine::scale(scale);
    if to_screen.determinant().abs() < 1e-12 {
        return Err(CinedriftError::render("layer transform is not invertible"));
    }
    let to_local = to_screen.inverse();

    let hw = LAYER_WIDTH * 0.5;
    let hh = LAYER_HEIGHT * 0.5;
    let corners = [
        Point::new(-hw, -hh),
        Point::new(hw, -hh),
        Point::new(hw, hh),
        Point::new(-hw, hh),
    ]
    .map(|p| to_screen * p);

    let min_x = corners.iter().map(|p| p.x).fold(f64::MAX, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::MIN, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::MAX, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::MIN, f64::max);

    let x0 = min_x.floor().max(0.0) as u32;
    let y0 = min_y.floor().max(0.0) as u32;
    let x1 = (max_x.ceil().min(f64::from(frame.width)) as u32).min(frame.width);
    let y1 = (max_y.ceil().min(f64::from(frame.height)) as u32).min(frame.height);

    let fog_t = ((depth - FOG_NEAR) / (FOG_FAR - FOG_NEAR)).clamp(0.0, 1.0) as f32;
    let depth_norm = (depth / FAR_PLANE).clamp(0.0, 1.0) as f32;

    for y in y0..y1 {
        for x in x0..x1 {
            let local = to_local * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            if local.x.abs() > hw || local.y.abs() > hh {
                continue;
            }
            let u = local.x / LAYER_WIDTH + 0.5;
            let v = 0.5 - local.y / LAYER_HEIGHT;
            let mut src = layer.texture.sample_bilinear(u, v);
            if src[3] == 0 {
                continue;
            }
            for c in 0..3 {
                src[c] = crate::composite::mul_div255(u16::from(src[c]), LAYER_SHADE);
            }
            if fog_t > 0.0 {
                let fog = [
                    crate::composite::mul_div255(u16::from(CLEAR_RGBA[0]), u16::from(src[3])),
                    crate::composite::mul_div255(u16::from(CLEAR_RGBA[1]), u16::from(src[3])),
                    crate::composite::mul_div255(u16::from(CLEAR_RGBA[2]), u16::from(src[3])),
                    src[3],
                ];
                src = mix(src, fog, fog_t);
            }

            let idx = ((y * frame.width + x) as usize) * 4;
            let dst = [
                frame.data[idx],
                frame.data[idx + 1],
                frame.data[idx + 2],
                frame.data[idx + 3],
            ];
            let out = over(dst, src, 1.0);
            frame.data[idx..idx + 4].copy_from_slice(&out);

            if src[3] >= 32 {
                depth_map.data[(y * frame.width + x) as usize] = depth_norm;
            }
        }
    }
    Ok(())
}

fn draw_particles(frame: &mut Frame, projector: &Projector, particles: &ParticleField) {
    let height_scale = projector.height / 900.0;

    for p in particles.particles() {
        let Some((sx, sy, depth)) = projector.project(p.position) else {
            continue;
        };
        // Depth-based size attenuation relative to the resting camera
        // distance, scaled with the output height.
        let radius = (p.size * 0.5) * (CAMERA_REST_Z / depth) * height_scale;
        if radius < 0.5 {
            continue;
        }

        let x0 = (sx - radius).floor().max(0.0) as u32;
        let y0 = (sy - radius).floor().max(0.0) as u32;
        let x1 = ((sx + radius).ceil().min(f64::from(frame.width)) as u32).min(frame.width);
        let y1 = ((sy + radius).ceil().min(f64::from(frame.height)) as u32).min(frame.height);

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = f64::from(x) + 0.5 - sx;
                let dy = f64::from(y) + 0.5 - sy;
                let d = (dx * dx + dy * dy).sqrt();
                if d >= radius {
                    continue;
                }
                // Soft circular sprite: 0.9 alpha at the center fading to 0.
                let falloff = (0.9 * (1.0 - d / radius)) as f32;
                let a = (falloff * 255.0).round().clamp(0.0, 255.0) as u8;
                let src = [a, a, a, a];

                let idx = ((y * frame.width + x) as usize) * 4;
                let dst = [
                    frame.data[idx],
                    frame.data[idx + 1],
                    frame.data[idx + 2],
                    frame.data[idx + 3],
                ];
                let out = additive(dst, src, PARTICLE_OPACITY);
                frame.data[idx..idx + 4].copy_from_slice(&out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Settings,
        layer::build_depth_layers,
        mask::{placeholder_texture, synthesize_depth_textures},
    };

    fn scene() -> (Vec<DepthLayer>, ParticleField) {
        let source = placeholder_texture(64, 36);
        let layers = build_depth_layers(synthesize_depth_textures(&source), 1.0);
        let particles = ParticleField::new(0.05, 1);
        (layers, particles)
    }

    #[test]
    fn render_fills_every_pixel() {
        let (layers, particles) = scene();
        let camera = CameraPose::at(0.0, &Settings::default());
        let (frame, depth) = render_scene(&layers, &particles, &camera, 160, 90).unwrap();
        assert_eq!(frame.data.len(), 160 * 90 * 4);
        assert_eq!(depth.data.len(), 160 * 90);
        // Composited over an opaque clear, the whole frame stays opaque.
        assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn layers_write_depth_in_the_frame_center() {
        let (layers, particles) = scene();
        let camera = CameraPose::at(0.0, &Settings::default());
        let (_, depth) = render_scene(&layers, &particles, &camera, 160, 90).unwrap();
        let center = depth.data[(45 * 160 + 80) as usize];
        assert!(center < 1.0, "center depth {center}");
        // Layer depths sit near the camera relative to the far plane.
        assert!(center < 0.12);
    }

    #[test]
    fn zero_size_surface_is_rejected() {
        let (layers, particles) = scene();
        let camera = CameraPose::at(0.0, &Settings::default());
        assert!(render_scene(&layers, &particles, &camera, 0, 90).is_err());
    }

    #[test]
    fn identical_inputs_render_identical_frames() {
        let (layers, particles) = scene();
        let camera = CameraPose::at(1.25, &Settings::default());
        let (a, _) = render_scene(&layers, &particles, &camera, 96, 54).unwrap();
        let (b, _) = render_scene(&layers, &particles, &camera, 96, 54).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn layers_take_the_static_shading_factor() {
        let data = [200u8, 200, 200, 255].repeat(16);
        let tex = crate::assets::Texture::from_premul(4, 4, data).unwrap();
        let layers = crate::layer::placeholder_layer(tex);
        let particles = ParticleField::new(0.0, 1);
        let settings = Settings {
            pan: 0.0,
            push_in: 0.0,
            ..Settings::default()
        };
        let camera = CameraPose::at(0.0, &settings);
        let (frame, _) = render_scene(&layers, &particles, &camera, 96, 54).unwrap();
        let center = frame.pixel(48, 27);
        // 200 lit by the 0.8 ambient plus the directional contribution.
        assert_eq!(center[0], 198);
        assert_eq!(center[3], 255);
    }

    #[test]
    fn particles_brighten_pixels() {
        let source = placeholder_texture(8, 8);
        let layers = build_depth_layers(synthesize_depth_textures(&source), 1.0);
        let empty = ParticleField::new(0.0, 1);
        let full = ParticleField::new(1.0, 1);
        let camera = CameraPose::at(0.0, &Settings::default());

        let (plain, _) = render_scene(&layers, &empty, &camera, 96, 54).unwrap();
        let (dusty, _) = render_scene(&layers, &full, &camera, 96, 54).unwrap();

        let sum = |f: &Frame| -> u64 { f.data.iter().map(|&b| u64::from(b)).sum() };
        assert!(sum(&dusty) > sum(&plain));
    }
}
