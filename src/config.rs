use crate::error::{CinedriftError, CinedriftResult};

/// Where a settings change takes effect.
///
/// `Live` parameters are read from the current snapshot at the top of every
/// frame tick; `Rebuild` parameters bake into scene geometry (layer depth
/// offsets, particle pool size) and require a full reinitialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamClass {
    Live,
    Rebuild,
}

/// The full parameter record driving one scene.
///
/// Every field is a bounded real number; `clamped()` folds out-of-range
/// values back into bounds. The engine itself never mutates a `Settings`
/// value, it only swaps whole snapshots.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    /// Camera push-in amplitude, 0..=1.
    pub push_in: f64,
    /// Horizontal pan amplitude, 0..=1 (vertical pan is 0.15x of this).
    pub pan: f64,
    /// Depth separation between layers, 0..=1.5.
    pub parallax_depth: f64,
    /// Fraction of the maximum particle pool, 0..=1.
    pub particle_density: f64,
    /// Reserved; carried through the record but not wired to an effect yet.
    pub light_rays: f64,
    /// Depth-of-field strength, 0..=1.
    pub dof_intensity: f64,
    /// Loop period in seconds, 8..=15.
    pub duration_secs: f64,
    /// Breeze strength for layer sway and particle drift, 0..=1.
    pub wind: f64,
    /// Output brightness, 0.6..=1.4 (1.0 is neutral).
    pub brightness: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            push_in: 0.4,
            pan: 0.25,
            parallax_depth: 0.8,
            particle_density: 0.7,
            light_rays: 0.35,
            dof_intensity: 0.6,
            duration_secs: 12.0,
            wind: 0.35,
            brightness: 1.0,
        }
    }
}

impl Settings {
    pub const DURATION_MIN: f64 = 8.0;
    pub const DURATION_MAX: f64 = 15.0;

    /// Returns a copy with every field folded into its declared bounds.
    pub fn clamped(self) -> Self {
        Self {
            push_in: self.push_in.clamp(0.0, 1.0),
            pan: self.pan.clamp(0.0, 1.0),
            parallax_depth: self.parallax_depth.clamp(0.0, 1.5),
            particle_density: self.particle_density.clamp(0.0, 1.0),
            light_rays: self.light_rays.clamp(0.0, 1.0),
            dof_intensity: self.dof_intensity.clamp(0.0, 1.0),
            duration_secs: self
                .duration_secs
                .clamp(Self::DURATION_MIN, Self::DURATION_MAX),
            wind: self.wind.clamp(0.0, 1.0),
            brightness: self.brightness.clamp(0.6, 1.4),
        }
    }

    pub fn validate(&self) -> CinedriftResult<()> {
        let fields = [
            ("push_in", self.push_in),
            ("pan", self.pan),
            ("parallax_depth", self.parallax_depth),
            ("particle_density", self.particle_density),
            ("light_rays", self.light_rays),
            ("dof_intensity", self.dof_intensity),
            ("duration_secs", self.duration_secs),
            ("wind", self.wind),
            ("brightness", self.brightness),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(CinedriftError::validation(format!(
                    "settings field '{name}' must be finite"
                )));
            }
        }
        Ok(())
    }

    /// Loop period in seconds, clamped to the valid range.
    pub fn period_secs(&self) -> f64 {
        self.duration_secs
            .clamp(Self::DURATION_MIN, Self::DURATION_MAX)
    }
}

/// Whether moving from `old` to `new` invalidates baked scene state.
///
/// Only `parallax_depth` (layer depth geometry) and `particle_density`
/// (pool cardinality) are rebuild-class. Everything else, `brightness`
/// included, is applied live from the snapshot each tick.
pub fn requires_rebuild(old: &Settings, new: &Settings) -> bool {
    old.parallax_depth != new.parallax_depth || old.particle_density != new.particle_density
}

pub fn classify_change(old: &Settings, new: &Settings) -> ParamClass {
    if requires_rebuild(old, new) {
        ParamClass::Rebuild
    } else {
        ParamClass::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_folds_every_field_into_bounds() {
        let s = Settings {
            push_in: 2.0,
            pan: -1.0,
            parallax_depth: 9.0,
            particle_density: 1.5,
            light_rays: -0.5,
            dof_intensity: 7.0,
            duration_secs: 3.0,
            wind: 100.0,
            brightness: 0.0,
        }
        .clamped();
        assert_eq!(s.push_in, 1.0);
        assert_eq!(s.pan, 0.0);
        assert_eq!(s.parallax_depth, 1.5);
        assert_eq!(s.particle_density, 1.0);
        assert_eq!(s.light_rays, 0.0);
        assert_eq!(s.dof_intensity, 1.0);
        assert_eq!(s.duration_secs, 8.0);
        assert_eq!(s.wind, 1.0);
        assert_eq!(s.brightness, 0.6);
    }

    #[test]
    fn validate_rejects_non_finite() {
        let s = Settings {
            pan: f64::NAN,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn brightness_change_is_live() {
        let old = Settings::default();
        let new = Settings {
            brightness: 1.3,
            ..old
        };
        assert_eq!(classify_change(&old, &new), ParamClass::Live);
    }

    #[test]
    fn geometry_change_requires_rebuild() {
        let old = Settings::default();
        for new in [
            Settings {
                parallax_depth: 1.2,
                ..old
            },
            Settings {
                particle_density: 0.1,
                ..old
            },
        ] {
            assert!(requires_rebuild(&old, &new));
        }
    }

    #[test]
    fn identical_record_never_rebuilds() {
        let s = Settings::default();
        assert!(!requires_rebuild(&s, &s));
    }
}
