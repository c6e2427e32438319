use std::sync::{Arc, Mutex};

use crate::{
    assets::ImageSource,
    config::{Settings, requires_rebuild},
    error::CinedriftResult,
    loader::{Generation, ImageLoader, LoadOutcome},
    post::apply_chain,
    render::{Frame, render_scene},
    scene::SceneGraph,
    viewport::{ViewportRect, fit_viewport},
};

/// Fixed seed for particle placement so identical settings always produce
/// the identical animation across reinitializations.
const SCENE_SEED: u64 = 0xD1F7_5EED;

/// The display side of the engine: exactly one render surface attached to
/// a host container. The engine sizes it per the 16:9 lock, presents one
/// frame per tick, and detaches it on dispose.
pub trait HostSurface {
    fn container_size(&self) -> (u32, u32);
    /// Creates the render surface. A failure here is fatal to this
    /// initialization generation and is surfaced to the caller.
    fn attach(&mut self, viewport: ViewportRect) -> CinedriftResult<()>;
    fn resize(&mut self, viewport: ViewportRect);
    fn present(&mut self, frame: &Frame);
    fn detach(&mut self);
}

/// Shared observable state of a [`HeadlessHost`].
#[derive(Debug, Default)]
pub struct HostState {
    pub attached: bool,
    pub viewport: Option<ViewportRect>,
    pub frames_presented: u64,
    pub last_frame: Option<Frame>,
}

/// In-memory host for headless use and tests; keeps the most recent
/// presented frame.
pub struct HeadlessHost {
    container: (u32, u32),
    state: Arc<Mutex<HostState>>,
}

impl HeadlessHost {
    pub fn new(container_w: u32, container_h: u32) -> (Self, Arc<Mutex<HostState>>) {
        let state = Arc::new(Mutex::new(HostState::default()));
        (
            Self {
                container: (container_w, container_h),
                state: Arc::clone(&state),
            },
            state,
        )
    }

    fn state(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl HostSurface for HeadlessHost {
    fn container_size(&self) -> (u32, u32) {
        self.container
    }

    fn attach(&mut self, viewport: ViewportRect) -> CinedriftResult<()> {
        let mut state = self.state();
        state.attached = true;
        state.viewport = Some(viewport);
        Ok(())
    }

    fn resize(&mut self, viewport: ViewportRect) {
        self.state().viewport = Some(viewport);
    }

    fn present(&mut self, frame: &Frame) {
        let mut state = self.state();
        state.frames_presented += 1;
        state.last_frame = Some(frame.clone());
    }

    fn detach(&mut self) {
        let mut state = self.state();
        state.attached = false;
        state.viewport = None;
    }
}

/// The scene composer and frame scheduler.
///
/// Owns the scene graph, the loader and the render surface for the
/// lifetime of one generation. The caller drives it by invoking
/// [`Engine::tick`] once per display frame with a monotonic clock value;
/// everything inside a tick runs in a fixed order on the calling thread.
pub struct Engine {
    host: Box<dyn HostSurface>,
    source: ImageSource,
    settings: Arc<Settings>,
    viewport: ViewportRect,
    scene: SceneGraph,
    loader: ImageLoader,
    generation: Generation,
    loop_start: Option<f64>,
    disposed: bool,
}

impl Engine {
    /// Creates the render surface, builds the textureless part of the scene
    /// (particles and effects animate right away) and starts the
    /// asynchronous image load; layers attach once the load resolves or
    /// fails over to the placeholder.
    #[tracing::instrument(skip_all)]
    pub fn initialize(
        source: ImageSource,
        settings: Settings,
        mut host: Box<dyn HostSurface>,
    ) -> CinedriftResult<Self> {
        settings.validate()?;
        let settings = settings.clamped();

        let (w, h) = host.container_size();
        let viewport = fit_viewport(w, h);
        host.attach(viewport)?;

        let scene = SceneGraph::preload(&settings, SCENE_SEED);
        let loader = ImageLoader::new();
        let generation = Generation(1);
        loader.request(generation, source.clone());
        tracing::debug!(?viewport, "engine initialized, image load started");

        Ok(Self {
            host,
            source,
            settings: Arc::new(settings),
            viewport,
            scene,
            loader,
            generation,
            loop_start: None,
            disposed: false,
        })
    }

    /// One frame of the continuous loop: drain load outcomes, advance the
    /// scene to the elapsed time, rasterize, run the effects chain and
    /// present. A no-op after dispose.
    pub fn tick(&mut self, now_secs: f64) -> CinedriftResult<()> {
        if self.disposed {
            return Ok(());
        }
        while let Some(outcome) = self.loader.try_recv() {
            self.apply_outcome(outcome);
        }

        let t0 = *self.loop_start.get_or_insert(now_secs);
        let t = now_secs - t0;
        let settings = *self.settings;

        // While the image decode is in flight the layer list is empty;
        // the dust field and post chain render and animate regardless.
        let camera = self.scene.advance(t, &settings);
        let (mut frame, depth) = render_scene(
            &self.scene.layers,
            &self.scene.particles,
            &camera,
            self.viewport.width,
            self.viewport.height,
        )?;
        apply_chain(&mut frame, &depth, &self.scene.fx)?;

        self.host.present(&frame);
        Ok(())
    }

    /// Applies a new settings record. Live-class changes swap the snapshot
    /// read by the next tick; geometry-class changes rebuild the scene.
    pub fn update_settings(&mut self, settings: Settings) -> CinedriftResult<()> {
        settings.validate()?;
        let new = settings.clamped();
        let rebuild = requires_rebuild(&self.settings, &new);
        self.settings = Arc::new(new);
        if rebuild {
            self.rebuild();
        }
        Ok(())
    }

    /// Swaps the image source; always rebuilds.
    pub fn update_image(&mut self, source: ImageSource) {
        self.source = source;
        self.rebuild();
    }

    /// Refits the 16:9 surface to a changed container. Does not touch the
    /// loop's timing base.
    pub fn resize(&mut self, container_w: u32, container_h: u32) {
        self.viewport = fit_viewport(container_w, container_h);
        self.host.resize(self.viewport);
    }

    /// Tears the engine down. Idempotent, and safe while a load is still
    /// in flight: bumping the generation turns the pending outcome stale.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.generation = Generation(self.generation.0 + 1);
        self.scene.layers.clear();
        self.host.detach();
        tracing::debug!("engine disposed");
    }

    /// Blocks until the pending image load has been applied; headless
    /// convenience so callers can sequence deterministically. Only valid
    /// while a load is actually in flight.
    pub fn wait_for_scene(&mut self) {
        while self.scene.layers.is_empty() && !self.disposed {
            match self.loader.recv_blocking() {
                Some(outcome) => self.apply_outcome(outcome),
                None => break,
            }
        }
    }

    pub fn settings(&self) -> Settings {
        *self.settings
    }

    pub fn viewport(&self) -> ViewportRect {
        self.viewport
    }

    /// Whether the depth layers (or the placeholder) have attached yet.
    pub fn layers_ready(&self) -> bool {
        !self.scene.layers.is_empty()
    }

    pub fn layer_count(&self) -> usize {
        self.scene.layers.len()
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!(
                stale = outcome.generation.0,
                live = self.generation.0,
                "dropping stale load outcome"
            );
            return;
        }
        match outcome.result {
            Ok(texture) => {
                self.scene
                    .attach_texture(&texture, self.settings.parallax_depth);
                tracing::debug!(
                    width = texture.width,
                    height = texture.height,
                    "depth layers built"
                );
            }
            Err(err) => {
                tracing::warn!(%err, "image load failed, using placeholder layer");
                self.scene.attach_placeholder();
            }
        }
    }

    fn rebuild(&mut self) {
        self.generation = Generation(self.generation.0 + 1);
        self.scene = SceneGraph::preload(&self.settings, SCENE_SEED);
        self.loop_start = None;
        self.loader.request(self.generation, self.source.clone());
        tracing::debug!(generation = self.generation.0, "scene rebuild started");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([90, 120, 150, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn engine_with_host(container: (u32, u32)) -> (Engine, Arc<Mutex<HostState>>) {
        let (host, state) = HeadlessHost::new(container.0, container.1);
        let engine = Engine::initialize(
            ImageSource::from_bytes(png_bytes(64, 36)),
            Settings::default(),
            Box::new(host),
        )
        .unwrap();
        (engine, state)
    }

    #[test]
    fn initialize_attaches_a_16_9_surface() {
        let (_engine, state) = engine_with_host((400, 400));
        let state = state.lock().unwrap();
        assert!(state.attached);
        let vp = state.viewport.unwrap();
        assert_eq!((vp.width, vp.height), (400, 225));
    }

    #[test]
    fn successful_load_builds_three_layers() {
        let (mut engine, _) = engine_with_host((320, 180));
        engine.wait_for_scene();
        assert_eq!(engine.layer_count(), 3);
    }

    #[test]
    fn failed_load_falls_back_to_single_placeholder_layer() {
        let (host, _) = HeadlessHost::new(320, 180);
        let mut engine = Engine::initialize(
            ImageSource::from_bytes(vec![0u8; 12]),
            Settings::default(),
            Box::new(host),
        )
        .unwrap();
        engine.wait_for_scene();
        assert_eq!(engine.layer_count(), 1);
        // Animation still runs on the placeholder scene.
        engine.tick(0.0).unwrap();
        engine.tick(0.016).unwrap();
    }

    #[test]
    fn tick_presents_frames_even_before_load_resolves() {
        let (mut engine, state) = engine_with_host((320, 180));
        engine.tick(0.0).unwrap();
        let state = state.lock().unwrap();
        assert_eq!(state.frames_presented, 1);
        let frame = state.last_frame.as_ref().unwrap();
        assert_eq!((frame.width, frame.height), (320, 180));
    }

    #[test]
    fn live_settings_change_keeps_the_scene() {
        let (mut engine, _) = engine_with_host((320, 180));
        engine.wait_for_scene();
        let mut settings = engine.settings();
        settings.brightness = 1.3;
        settings.pan = 0.9;
        engine.update_settings(settings).unwrap();
        assert!(engine.layers_ready());
        assert_eq!(engine.settings().brightness, 1.3);
    }

    #[test]
    fn geometry_settings_change_rebuilds() {
        let (mut engine, _) = engine_with_host((320, 180));
        engine.wait_for_scene();
        let mut settings = engine.settings();
        settings.particle_density = 0.1;
        engine.update_settings(settings).unwrap();
        assert!(!engine.layers_ready());
        engine.wait_for_scene();
        assert_eq!(engine.layer_count(), 3);
        assert_eq!(engine.scene().particles.len(), 200);
    }

    #[test]
    fn load_window_frame_is_never_the_bare_clear_color() {
        use crate::render::CLEAR_RGBA;

        let (host, state) = HeadlessHost::new(320, 180);
        let settings = Settings {
            particle_density: 1.0,
            ..Settings::default()
        };
        let mut engine = Engine::initialize(
            ImageSource::from_bytes(png_bytes(1600, 900)),
            settings,
            Box::new(host),
        )
        .unwrap();
        // Whether or not the decode resolves before the first tick, the
        // presented frame must carry content: the dust field and post
        // chain render from the very first frame of the load window.
        engine.tick(0.0).unwrap();
        let state = state.lock().unwrap();
        let frame = state.last_frame.as_ref().unwrap();
        assert!(frame.data.chunks_exact(4).any(|px| px != CLEAR_RGBA));
    }

    #[test]
    fn dispose_is_idempotent_and_detaches() {
        let (mut engine, state) = engine_with_host((320, 180));
        engine.dispose();
        engine.dispose();
        assert!(!state.lock().unwrap().attached);
        // Ticking a disposed engine is a no-op, not a panic.
        engine.tick(1.0).unwrap();
        assert_eq!(state.lock().unwrap().frames_presented, 0);
    }

    #[test]
    fn stale_load_outcome_is_dropped() {
        let (mut engine, _) = engine_with_host((320, 180));
        // Swap the image before the first load has been drained; the
        // eventual generation-1 outcome must not build a scene for it.
        engine.update_image(ImageSource::from_bytes(png_bytes(32, 18)));
        engine.wait_for_scene();
        assert_eq!(engine.layer_count(), 3);
        // Drain anything left over; the scene must survive unchanged.
        engine.tick(0.0).unwrap();
        assert_eq!(engine.layer_count(), 3);
    }

    #[test]
    fn resize_refits_without_resetting_the_loop() {
        let (mut engine, state) = engine_with_host((320, 180));
        engine.wait_for_scene();
        engine.tick(0.0).unwrap();
        engine.resize(640, 480);
        engine.tick(0.016).unwrap();
        let state = state.lock().unwrap();
        let vp = state.viewport.unwrap();
        assert_eq!((vp.width, vp.height), (640, 360));
        let frame = state.last_frame.as_ref().unwrap();
        assert_eq!((frame.width, frame.height), (640, 360));
    }

    #[test]
    fn rejects_non_finite_settings() {
        let (host, _) = HeadlessHost::new(320, 180);
        let settings = Settings {
            wind: f64::INFINITY,
            ..Settings::default()
        };
        assert!(
            Engine::initialize(
                ImageSource::from_bytes(png_bytes(8, 8)),
                settings,
                Box::new(host),
            )
            .is_err()
        );
    }
}
