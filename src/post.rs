use rayon::prelude::*;

use crate::{
    blur::gaussian_blur_premul,
    composite::mix,
    error::{CinedriftError, CinedriftResult},
    fx::FxChain,
    render::{DepthMap, Frame},
};

/// Converts the normalized depth distance from the focal plane into a blur
/// mix weight. Tuned so the layer stack spans noticeably different weights.
const DOF_DEPTH_SCALE: f64 = 8.0;

/// Fixed blur footprint of the bloom's bright pass.
const BLOOM_BLUR_RADIUS: u32 = 8;

/// Applies the fixed effects chain in order: antialias, then depth of
/// field, bloom, vignette and brightness/contrast.
pub fn apply_chain(frame: &mut Frame, depth: &DepthMap, chain: &FxChain) -> CinedriftResult<()> {
    if frame.width != depth.width || frame.height != depth.height {
        return Err(CinedriftError::render(
            "frame and depth map dimensions must match",
        ));
    }

    if chain.antialias {
        antialias_pass(frame);
    }
    dof_pass(frame, depth, chain)?;
    bloom_pass(frame, chain)?;
    vignette_pass(frame, chain);
    brightness_contrast_pass(frame, chain);
    Ok(())
}

/// Luma-adaptive 3x3 smoothing; blends toward the neighborhood average
/// only where the local contrast is high, standing in for SMAA.
pub fn antialias_pass(frame: &mut Frame) {
    let w = frame.width as usize;
    let h = frame.height as usize;
    if w < 3 || h < 3 {
        return;
    }
    let src = frame.data.clone();
    let row_bytes = w * 4;

    frame
        .data
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, drow)| {
            if y == 0 || y == h - 1 {
                return;
            }
            for x in 1..w - 1 {
                let center = px(&src, w, x, y);
                let mut avg = [0u32; 4];
                let mut min_l = u32::MAX;
                let mut max_l = 0u32;
                for dy in 0..3 {
                    for dx in 0..3 {
                        let p = px(&src, w, x + dx - 1, y + dy - 1);
                        let l = luma(p);
                        min_l = min_l.min(l);
                        max_l = max_l.max(l);
                        for c in 0..4 {
                            avg[c] += u32::from(p[c]);
                        }
                    }
                }
                let contrast = (max_l - min_l) as f32 / 255.0;
                if contrast < 0.1 {
                    continue;
                }
                let t = (contrast * 0.6).min(0.5);
                let averaged = [
                    (avg[0] / 9) as u8,
                    (avg[1] / 9) as u8,
                    (avg[2] / 9) as u8,
                    (avg[3] / 9) as u8,
                ];
                let out = mix(center, averaged, t);
                drow[x * 4..x * 4 + 4].copy_from_slice(&out);
            }
        });
}

/// Mixes a gaussian-blurred copy back in per pixel, weighted by how far the
/// pixel's scene depth sits from the focal plane.
pub fn dof_pass(frame: &mut Frame, depth: &DepthMap, chain: &FxChain) -> CinedriftResult<()> {
    let radius = (chain.dof.bokeh_scale * 2.0).round().max(0.0) as u32;
    if radius == 0 {
        return Ok(());
    }
    let sigma = (radius as f32 / 2.0).max(0.5);
    let blurred = gaussian_blur_premul(&frame.data, frame.width, frame.height, radius, sigma)?;

    let focus = chain.dof.focus_distance;
    frame
        .data
        .par_chunks_exact_mut(4)
        .zip(blurred.par_chunks_exact(4))
        .zip(depth.data.par_iter())
        .for_each(|((d, b), &z)| {
            let t = ((f64::from(z) - focus).abs() * DOF_DEPTH_SCALE).clamp(0.0, 1.0) as f32;
            let out = mix([d[0], d[1], d[2], d[3]], [b[0], b[1], b[2], b[3]], t);
            d.copy_from_slice(&out);
        });
    Ok(())
}

/// Threshold-extracts bright pixels, blurs them, and adds them back scaled
/// by the bloom intensity.
pub fn bloom_pass(frame: &mut Frame, chain: &FxChain) -> CinedriftResult<()> {
    let threshold = chain.bloom.luminance_threshold;
    let smoothing = chain.bloom.luminance_smoothing.max(1e-4);

    let mut bright = vec![0u8; frame.data.len()];
    for (b, s) in bright
        .chunks_exact_mut(4)
        .zip(frame.data.chunks_exact(4))
    {
        let l = luma([s[0], s[1], s[2], s[3]]) as f32 / 255.0;
        let k = smoothstep(threshold, threshold + smoothing, l);
        if k <= 0.0 {
            continue;
        }
        for c in 0..4 {
            b[c] = (f32::from(s[c]) * k).round().min(255.0) as u8;
        }
    }

    let halo = gaussian_blur_premul(
        &bright,
        frame.width,
        frame.height,
        BLOOM_BLUR_RADIUS,
        BLOOM_BLUR_RADIUS as f32 / 2.0,
    )?;

    let intensity = chain.bloom.intensity;
    for (d, h) in frame.data.chunks_exact_mut(4).zip(halo.chunks_exact(4)) {
        for c in 0..3 {
            let add = (f32::from(h[c]) * intensity).round() as u16;
            d[c] = (u16::from(d[c]) + add).min(255) as u8;
        }
    }
    Ok(())
}

/// Radial darkening toward the frame corners.
pub fn vignette_pass(frame: &mut Frame, chain: &FxChain) {
    let w = frame.width as f32;
    let h = frame.height as f32;
    let cx = w * 0.5;
    let cy = h * 0.5;
    let max_dist = (cx * cx + cy * cy).sqrt();
    let darkness = chain.vignette.darkness;
    let offset = chain.vignette.offset;
    let row_bytes = (frame.width as usize) * 4;

    frame
        .data
        .par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = y as f32 + 0.5 - cy;
            for (x, p) in row.chunks_exact_mut(4).enumerate() {
                let dx = x as f32 + 0.5 - cx;
                let r = (dx * dx + dy * dy).sqrt() / max_dist;
                let factor = 1.0 - darkness * smoothstep(offset, 1.0, r);
                for c in 0..3 {
                    p[c] = (f32::from(p[c]) * factor).round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}

/// Brightness offset plus a slight fixed contrast expansion. The frame is
/// opaque by this point in the chain, so channels are treated as straight.
pub fn brightness_contrast_pass(frame: &mut Frame, chain: &FxChain) {
    let brightness = chain.brightness_contrast.brightness;
    let contrast = chain.brightness_contrast.contrast;
    let gain = 1.0 + contrast;

    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        let v = (i as f32 / 255.0 - 0.5) * gain + 0.5 + brightness;
        *slot = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    for p in frame.data.chunks_exact_mut(4) {
        for c in 0..3 {
            p[c] = lut[p[c] as usize];
        }
    }
}

fn px(data: &[u8], w: usize, x: usize, y: usize) -> [u8; 4] {
    let idx = (y * w + x) * 4;
    [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
}

fn luma(p: [u8; 4]) -> u32 {
    (77 * u32::from(p[0]) + 150 * u32::from(p[1]) + 29 * u32::from(p[2])) >> 8
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
