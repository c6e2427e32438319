use crate::{
    assets::Texture,
    camera::{CameraPose, LoopPhase},
    config::Settings,
    fx::FxChain,
    layer::{DepthLayer, build_depth_layers, placeholder_layer},
    mask::{placeholder_texture, synthesize_depth_textures},
    particles::ParticleField,
};

/// Placeholder dimensions match the output aspect so the fallback layer
/// fills the frame edge to edge.
const PLACEHOLDER_W: u32 = 1600;
const PLACEHOLDER_H: u32 = 900;

/// The owned scene aggregate for one generation: depth layers, particle
/// pool and effects chain. Mutated only from inside the frame tick.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    pub layers: Vec<DepthLayer>,
    pub particles: ParticleField,
    pub fx: FxChain,
}

impl SceneGraph {
    /// Scene without layers, built the moment the engine starts: the
    /// particle field and effects chain need no texture, so the dust and
    /// post chain animate while the image decode is still in flight.
    pub fn preload(settings: &Settings, seed: u64) -> Self {
        Self {
            layers: Vec::new(),
            particles: ParticleField::new(settings.particle_density, seed),
            fx: FxChain::new(settings),
        }
    }

    /// Attaches the three-layer parallax stack built from a decoded image.
    /// Particles and effects keep their state.
    pub fn attach_texture(&mut self, texture: &Texture, parallax_depth: f64) {
        let textures = synthesize_depth_textures(texture);
        self.layers = build_depth_layers(textures, parallax_depth);
    }

    /// Attaches the fallback for a failed image load: one flat gradient
    /// layer, with camera motion and particles animating normally.
    pub fn attach_placeholder(&mut self) {
        let texture = placeholder_texture(PLACEHOLDER_W, PLACEHOLDER_H);
        self.layers = placeholder_layer(texture);
    }

    /// Complete scene from a decoded image.
    pub fn from_texture(texture: &Texture, settings: &Settings, seed: u64) -> Self {
        let mut scene = Self::preload(settings, seed);
        scene.attach_texture(texture, settings.parallax_depth);
        scene
    }

    /// Complete scene with the placeholder layer.
    pub fn placeholder(settings: &Settings, seed: u64) -> Self {
        let mut scene = Self::preload(settings, seed);
        scene.attach_placeholder();
        scene
    }

    /// Advances the scene to elapsed time `t`: camera pose, layer
    /// parallax offsets, particle drift and live effect values, in the
    /// fixed per-tick order.
    pub fn advance(&mut self, t_secs: f64, settings: &Settings) -> CameraPose {
        let phase = LoopPhase::at(t_secs, settings);
        let camera = CameraPose::at_phase(&phase, settings);

        for layer in &mut self.layers {
            layer.reposition(t_secs, &camera, settings);
        }
        self.particles.drift(t_secs, settings.wind);
        self.fx.update_live(settings, &phase);

        camera
    }
}
