use glam::DVec3;

use crate::{assets::Texture, camera::CameraPose, config::Settings, mask::MaskKind};

/// World-space size of a layer quad; matches the 16:9 output frame.
pub const LAYER_WIDTH: f64 = 16.0;
pub const LAYER_HEIGHT: f64 = 9.0;

/// Which depth band a layer belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthIndex {
    Foreground,
    Mid,
    Background,
}

impl DepthIndex {
    pub const ALL: [DepthIndex; 3] = [
        DepthIndex::Foreground,
        DepthIndex::Mid,
        DepthIndex::Background,
    ];

    /// Unscaled z of the band; with the camera on the positive z axis,
    /// more negative means farther away.
    pub fn base_depth(self) -> f64 {
        match self {
            DepthIndex::Foreground => -1.5,
            DepthIndex::Mid => 0.0,
            DepthIndex::Background => 1.2,
        }
    }

    /// Layer ordinal used by the sway/wobble phase terms.
    pub fn ordinal(self) -> usize {
        match self {
            DepthIndex::Foreground => 0,
            DepthIndex::Mid => 1,
            DepthIndex::Background => 2,
        }
    }

    /// Parallax coupling between camera displacement and layer offset.
    pub fn depth_factor(self, parallax_depth: f64) -> f64 {
        (self.ordinal() as f64 - 1.0) * 0.6 * parallax_depth
    }

    pub fn mask_kind(self) -> MaskKind {
        match self {
            DepthIndex::Foreground => MaskKind::Foreground,
            DepthIndex::Mid => MaskKind::Mid,
            DepthIndex::Background => MaskKind::Background,
        }
    }
}

/// One alpha-masked copy of the source image at a simulated distance.
///
/// `z_offset` is baked at build time; `position` and `rotation_z` are
/// rewritten every tick by the scene composer.
#[derive(Clone, Debug)]
pub struct DepthLayer {
    pub index: DepthIndex,
    pub texture: Texture,
    pub z_offset: f64,
    pub position: DVec3,
    pub rotation_z: f64,
}

impl DepthLayer {
    fn new(index: DepthIndex, texture: Texture, parallax_depth: f64) -> Self {
        let z_offset = index.base_depth() * (parallax_depth * 0.8 + 0.2);
        Self {
            index,
            texture,
            z_offset,
            position: DVec3::new(0.0, 0.0, z_offset),
            rotation_z: 0.0,
        }
    }

    /// Repositions the layer for elapsed time `t` given the current camera.
    /// Parallax offset follows the camera scaled by the depth factor; wind
    /// adds a slow vertical sway and a faint rotational wobble.
    pub fn reposition(&mut self, t_secs: f64, camera: &CameraPose, settings: &Settings) {
        let i = self.index.ordinal() as f64;
        let factor = self.index.depth_factor(settings.parallax_depth);
        self.position.x = factor * camera.position.x * 0.8;
        self.position.y = factor * camera.position.y * 0.8
            + (t_secs * 0.2 + i).sin() * 0.02 * settings.wind;
        self.position.z = self.z_offset;
        self.rotation_z = (t_secs * 0.05 + i).sin() * 0.002;
    }
}

/// Builds the three-layer stack from the masked textures, farthest first.
pub fn build_depth_layers(textures: [Texture; 3], parallax_depth: f64) -> Vec<DepthLayer> {
    let [fg, mid, bg] = textures;
    vec![
        DepthLayer::new(DepthIndex::Foreground, fg, parallax_depth),
        DepthLayer::new(DepthIndex::Mid, mid, parallax_depth),
        DepthLayer::new(DepthIndex::Background, bg, parallax_depth),
    ]
}

/// Single flat layer at the origin; stands in for the stack when the image
/// fails to load.
pub fn placeholder_layer(texture: Texture) -> Vec<DepthLayer> {
    vec![DepthLayer {
        index: DepthIndex::Mid,
        texture,
        z_offset: 0.0,
        position: DVec3::ZERO,
        rotation_z: 0.0,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::placeholder_texture;

    fn tex() -> Texture {
        placeholder_texture(8, 8)
    }

    #[test]
    fn z_offsets_follow_base_depth_and_parallax() {
        let layers = build_depth_layers([tex(), tex(), tex()], 1.0);
        let expected = [-1.5, 0.0, 1.2];
        for (layer, base) in layers.iter().zip(expected) {
            assert!((layer.z_offset - base * (1.0 * 0.8 + 0.2)).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_parallax_keeps_residual_separation() {
        // The 0.2 offset term keeps layers ordered even at depth 0.
        let layers = build_depth_layers([tex(), tex(), tex()], 0.0);
        assert!((layers[0].z_offset - -0.3).abs() < 1e-12);
        assert!((layers[2].z_offset - 0.24).abs() < 1e-12);
    }

    #[test]
    fn mid_layer_never_offsets_with_camera() {
        let settings = Settings {
            wind: 0.0,
            ..Settings::default()
        };
        let camera = CameraPose::at(2.0, &settings);
        let mut layers = build_depth_layers([tex(), tex(), tex()], 1.0);
        for layer in &mut layers {
            layer.reposition(2.0, &camera, &settings);
        }
        assert_eq!(layers[1].position.x, 0.0);
        assert_eq!(layers[1].position.y, 0.0);
        // Foreground and background move in opposite directions.
        assert!(layers[0].position.x * layers[2].position.x <= 0.0);
    }

    #[test]
    fn wind_sways_layers_vertically() {
        let settings = Settings {
            pan: 0.0,
            wind: 1.0,
            ..Settings::default()
        };
        let camera = CameraPose::at(3.0, &settings);
        let mut layer = build_depth_layers([tex(), tex(), tex()], 1.0).remove(1);
        layer.reposition(3.0, &camera, &settings);
        let expected = (3.0f64 * 0.2 + 1.0).sin() * 0.02;
        assert!((layer.position.y - expected).abs() < 1e-12);
    }

    #[test]
    fn wobble_stays_faint() {
        let settings = Settings::default();
        let camera = CameraPose::at(100.0, &settings);
        let mut layers = build_depth_layers([tex(), tex(), tex()], 1.5);
        for layer in &mut layers {
            layer.reposition(100.0, &camera, &settings);
            assert!(layer.rotation_z.abs() <= 0.002);
        }
    }

    #[test]
    fn placeholder_is_a_single_flat_layer() {
        let layers = placeholder_layer(tex());
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].z_offset, 0.0);
    }
}
