#![forbid(unsafe_code)]

//! cinedrift: a depth-layered parallax engine that turns a still photo
//! into a seamlessly looping cinematic scene.
//!
//! The image is split into synthetic foreground, mid and background
//! layers, placed at different depths in front of a slowly drifting
//! camera, and rasterized on the CPU with an atmospheric particle field
//! and a depth-of-field, bloom and vignette chain on top. All motion is
//! periodic in the loop duration, so the last frame flows back into the
//! first without a seam.

pub mod assets;
pub mod blur;
pub mod camera;
pub mod composite;
pub mod config;
pub mod engine;
pub mod error;
pub mod fx;
pub mod layer;
pub mod loader;
pub mod mask;
pub mod particles;
pub mod post;
pub mod render;
pub mod scene;
pub mod viewport;

pub use assets::{ImageSource, Texture};
pub use camera::{CameraPose, LoopPhase};
pub use config::Settings;
pub use engine::{Engine, HeadlessHost, HostSurface};
pub use error::{CinedriftError, CinedriftResult};
pub use render::{DepthMap, Frame};
pub use scene::SceneGraph;
pub use viewport::{ViewportRect, fit_viewport};
