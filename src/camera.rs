use std::f64::consts::TAU;

use glam::DVec3;

use crate::config::Settings;

/// Resting camera distance from the layer stack.
pub const CAMERA_REST_Z: f64 = 8.0;

/// Vertical field of view of the virtual camera, degrees.
pub const CAMERA_FOV_DEG: f64 = 50.0;

/// Normalized position inside the motion loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopPhase {
    /// Elapsed seconds since loop start.
    pub t_secs: f64,
    /// Loop period in seconds (duration clamped to its bounds).
    pub period_secs: f64,
    /// `(t mod period) / period`, in `[0, 1)`.
    pub phase: f64,
}

impl LoopPhase {
    pub fn at(t_secs: f64, settings: &Settings) -> Self {
        let period_secs = settings.period_secs();
        let phase = (t_secs.rem_euclid(period_secs)) / period_secs;
        Self {
            t_secs,
            period_secs,
            phase,
        }
    }

    /// Angle of the loop in radians, `phase * 2pi`.
    pub fn angle(&self) -> f64 {
        self.phase * TAU
    }
}

/// Camera pose for one frame: position plus a fixed look-at target.
///
/// Recomputed every frame from elapsed time; never persisted. Because the
/// motion is built entirely from `sin`/`cos` of the loop angle, poses at
/// `t` and `t + k * period` coincide, which is what makes the loop seamless.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: DVec3,
    pub target: DVec3,
}

impl CameraPose {
    /// Pure function of elapsed time and settings.
    pub fn at(t_secs: f64, settings: &Settings) -> Self {
        let phase = LoopPhase::at(t_secs, settings);
        Self::at_phase(&phase, settings)
    }

    pub fn at_phase(phase: &LoopPhase, settings: &Settings) -> Self {
        let angle = phase.angle();
        let push = settings.push_in * 0.4;
        let pan = settings.pan * 0.4;

        let position = DVec3::new(
            pan * angle.sin(),
            0.15 * pan * angle.cos(),
            CAMERA_REST_Z - push * angle.sin(),
        );

        Self {
            position,
            target: DVec3::ZERO,
        }
    }
}
