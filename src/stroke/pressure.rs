use crate::config::Preferences;
use crate::input::PointerType;

/// Smallest spacing allowed between stamps, in world pixels.
pub const MIN_SPACING: f32 = 0.5;

/// Maps raw pressure and tool settings to stamp size and spacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeDynamics {
    /// Base stamp radius from the tool settings
    pub base_size: f32,
    /// Spacing setting, as a percentage of the stamp diameter
    pub spacing_percent: f32,
    /// Tool declares pressure sensitivity and the user enabled it
    pub pressure_sensitive: bool,
    /// User preference in 0..=1
    pub sensitivity: f32,
    pub clamp: bool,
}

impl StrokeDynamics {
    pub fn new(base_size: f32, spacing_percent: f32, pressure_sensitive: bool, prefs: &Preferences) -> Self {
        Self {
            base_size,
            spacing_percent,
            pressure_sensitive: pressure_sensitive && prefs.use_pressure,
            sensitivity: prefs.pressure_sensitivity,
            clamp: prefs.clamp_pressure,
        }
    }

    /// Effective stamp size for a sample.
    ///
    /// Pen input eases the base size by `base * k * (1 - p) / (1 + k)` with
    /// `k = 10 * sensitivity`. Other pointer types always get the base size.
    pub fn size_at(&self, pressure: f32, pointer_type: PointerType) -> f32 {
        let base = self.base_size;
        if !self.pressure_sensitive || pointer_type != PointerType::Pen {
            return base;
        }
        let k = 10.0 * self.sensitivity;
        let pressure = pressure.clamp(0.0, 1.0);
        let scaled = base - base * k * (1.0 - pressure) / (1.0 + k);
        if self.clamp {
            scaled * 0.9 + base * 0.1
        } else {
            scaled
        }
    }

    /// Distance between consecutive stamps for a stamp of `size`.
    pub fn spacing_for(&self, size: f32) -> f32 {
        (size * 2.0 * (self.spacing_percent / 100.0)).max(MIN_SPACING)
    }

    pub fn spacing_at(&self, pressure: f32, pointer_type: PointerType) -> f32 {
        self.spacing_for(self.size_at(pressure, pointer_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamics(sensitivity: f32, clamp: bool) -> StrokeDynamics {
        StrokeDynamics {
            base_size: 10.0,
            spacing_percent: 25.0,
            pressure_sensitive: true,
            sensitivity,
            clamp,
        }
    }

    #[test]
    fn test_full_pressure_keeps_base_size() {
        let d = dynamics(0.5, false);
        assert_eq!(d.size_at(1.0, PointerType::Pen), 10.0);
    }

    #[test]
    fn test_pressure_easing_formula() {
        let d = dynamics(0.5, false);
        // k = 5: 10 - 10 * 5 * 0.5 / 6
        let expected = 10.0 - 10.0 * 5.0 * 0.5 / 6.0;
        assert!((d.size_at(0.5, PointerType::Pen) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_keeps_a_tenth_at_zero_pressure() {
        let d = dynamics(1.0, true);
        let scaled = 10.0 - 10.0 * 10.0 / 11.0;
        let expected = scaled * 0.9 + 1.0;
        assert!((d.size_at(0.0, PointerType::Pen) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_mouse_ignores_pressure() {
        let d = dynamics(1.0, false);
        assert_eq!(d.size_at(0.1, PointerType::Mouse), 10.0);
        assert_eq!(d.size_at(0.1, PointerType::Touch), 10.0);
    }

    #[test]
    fn test_spacing_has_lower_bound() {
        let d = dynamics(0.0, false);
        assert_eq!(d.spacing_for(10.0), 5.0);
        assert_eq!(d.spacing_for(0.1), MIN_SPACING);
    }

    #[test]
    fn test_use_pressure_preference_disables_easing() {
        let prefs = Preferences {
            use_pressure: false,
            ..Default::default()
        };
        let d = StrokeDynamics::new(8.0, 25.0, true, &prefs);
        assert_eq!(d.size_at(0.0, PointerType::Pen), 8.0);
    }
}
