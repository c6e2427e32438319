use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::error::{CinedriftError, CinedriftResult};

/// An opaque reference to raster pixel data supplied by the caller.
///
/// The engine performs no validation on the referenced bytes; decoding
/// happens once per (re)initialization and a decode failure falls back to
/// the synthetic placeholder layer.
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Encoded image bytes already in memory (upload path).
    Bytes(Arc<[u8]>),
    /// Encoded image on disk.
    Path(PathBuf),
}

impl ImageSource {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }
}

/// Decoded raster data, premultiplied RGBA8, row-major, tightly packed.
///
/// Pixel data is shared; masking clones the `Arc`d bytes only where a
/// distinct alpha channel has to be written.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl Texture {
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> CinedriftResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| CinedriftError::resource("texture size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(CinedriftError::resource(
                "texture buffer must be width*height*4 bytes",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Bilinear sample at normalized coordinates (0..1, y down).
    /// Out-of-range coordinates return transparent black.
    pub fn sample_bilinear(&self, u: f64, v: f64) -> [u8; 4] {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return [0, 0, 0, 0];
        }
        let fx = u * (self.width.saturating_sub(1)) as f64;
        let fy = v * (self.height.saturating_sub(1)) as f64;
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f64;
        let ty = fy - y0 as f64;

        let px = |x: u32, y: u32| -> [f64; 4] {
            let idx = ((y * self.width + x) as usize) * 4;
            let p = &self.rgba8_premul[idx..idx + 4];
            [
                f64::from(p[0]),
                f64::from(p[1]),
                f64::from(p[2]),
                f64::from(p[3]),
            ]
        };

        let p00 = px(x0, y0);
        let p10 = px(x1, y0);
        let p01 = px(x0, y1);
        let p11 = px(x1, y1);

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = p00[c] + (p10[c] - p00[c]) * tx;
            let bot = p01[c] + (p11[c] - p01[c]) * tx;
            out[c] = (top + (bot - top) * ty).round().clamp(0.0, 255.0) as u8;
        }
        out
    }
}

/// Decodes an image source into a premultiplied RGBA8 texture.
pub fn decode_texture(source: &ImageSource) -> CinedriftResult<Texture> {
    let dyn_img = match source {
        ImageSource::Bytes(bytes) => {
            image::load_from_memory(bytes).context("decode image from memory")?
        }
        ImageSource::Path(path) => {
            image::open(path).with_context(|| format!("decode image at {}", path.display()))?
        }
    };
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(CinedriftError::resource("image has zero dimensions"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(Texture {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
