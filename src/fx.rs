use crate::{camera::LoopPhase, config::Settings};

/// Depth-of-field parameters, in the normalized depth space of the
/// renderer's depth map (0 at the camera, 1 at the far plane).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DofParams {
    /// Blur magnitude; drives the gaussian radius of the out-of-focus copy.
    pub bokeh_scale: f64,
    /// Normalized distance of the in-focus plane; breathes with the loop.
    pub focus_distance: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomParams {
    pub intensity: f32,
    pub luminance_threshold: f32,
    pub luminance_smoothing: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VignetteParams {
    pub darkness: f32,
    pub offset: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrightnessContrastParams {
    /// Additive brightness offset, `settings.brightness - 1.0`.
    pub brightness: f32,
    pub contrast: f32,
}

/// The fixed, ordered post-processing chain: antialiasing first, then
/// depth of field, bloom, vignette and brightness/contrast in one stage.
///
/// Bloom and vignette are configured once at construction; depth of field
/// and brightness are rewritten from the live settings snapshot every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FxChain {
    pub antialias: bool,
    pub dof: DofParams,
    pub bloom: BloomParams,
    pub vignette: VignetteParams,
    pub brightness_contrast: BrightnessContrastParams,
}

impl FxChain {
    pub fn new(settings: &Settings) -> Self {
        let mut chain = Self {
            antialias: true,
            dof: DofParams {
                bokeh_scale: 1.4,
                focus_distance: 0.015,
            },
            bloom: BloomParams {
                intensity: 0.2,
                luminance_threshold: 0.6,
                luminance_smoothing: 0.2,
            },
            vignette: VignetteParams {
                darkness: 0.6,
                offset: 0.2,
            },
            brightness_contrast: BrightnessContrastParams {
                brightness: (settings.brightness - 1.0) as f32,
                contrast: 0.02,
            },
        };
        chain.update_live(settings, &LoopPhase::at(0.0, settings));
        chain
    }

    /// Per-frame update of the live effect values. The focal plane
    /// oscillates with the loop phase so it repeats exactly with the camera.
    pub fn update_live(&mut self, settings: &Settings, phase: &LoopPhase) {
        self.dof.bokeh_scale = 1.2 + settings.dof_intensity * 0.9;
        self.dof.focus_distance = 0.012 + 0.01 * settings.dof_intensity * phase.angle().sin();
        self.brightness_contrast.brightness = (settings.brightness - 1.0) as f32;
    }
}
