use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// User preferences that drive input filtering and pressure response.
///
/// Values are re-read on every sample, so edits take effect mid-stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Steepness of the pressure easing curve, 0..=1
    pub pressure_sensitivity: f32,
    /// Exponential smoothing factor for positions, (0, 1]
    pub position_filtering: f32,
    /// Exponential smoothing factor for pressure, (0, 1]
    pub pressure_filtering: f32,
    /// Drag-lag toward the previous committed point, 0..1
    pub mouse_smoothing: f32,
    pub use_pressure: bool,
    /// Keep 10% of the base size at zero pressure
    pub clamp_pressure: bool,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Number of 100ms idle ticks before the render loop pauses
    pub idle_pause_ticks: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            pressure_sensitivity: 0.5,
            position_filtering: 0.6,
            pressure_filtering: 0.4,
            mouse_smoothing: 0.3,
            use_pressure: true,
            clamp_pressure: true,
            min_zoom: 0.05,
            max_zoom: 64.0,
            idle_pause_ticks: 20,
        }
    }
}

impl Preferences {
    /// Parse preferences from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let prefs: Self = serde_json::from_str(json)?;
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("pressure_sensitivity", self.pressure_sensitivity, 0.0, 1.0),
            ("mouse_smoothing", self.mouse_smoothing, 0.0, 0.99),
        ];
        for (name, value, min, max) in unit {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("position_filtering", self.position_filtering),
            ("pressure_filtering", self.pressure_filtering),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        if !(self.min_zoom > 0.0 && self.min_zoom < self.max_zoom) {
            return Err(ConfigError::OutOfRange {
                name: "min_zoom",
                value: self.min_zoom,
            });
        }
        Ok(())
    }

    /// Smoothing factor for the exponential filters at the given zoom.
    ///
    /// Lower zoom means coarser effective resolution, so the factor is
    /// adjusted by `(1 - zoom) / 3` and clamped to `0.1..=1.0`.
    pub fn effective_alpha(alpha: f32, zoom: f32) -> f32 {
        (alpha - (1.0 - zoom) / 3.0).clamp(0.1, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let prefs = Preferences::from_json(r#"{ "pressure_sensitivity": 0.2 }"#).unwrap();
        assert_eq!(prefs.pressure_sensitivity, 0.2);
        assert_eq!(prefs.position_filtering, Preferences::default().position_filtering);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = Preferences::from_json(r#"{ "position_filtering": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "position_filtering", .. }));
    }

    #[test]
    fn test_effective_alpha() {
        assert!((Preferences::effective_alpha(0.6, 1.0) - 0.6).abs() < 1e-6);
        assert!((Preferences::effective_alpha(0.6, 0.4) - 0.4).abs() < 1e-6);
        assert_eq!(Preferences::effective_alpha(0.2, 0.1), 0.1);
        assert_eq!(Preferences::effective_alpha(0.9, 4.0), 1.0);
    }

    #[test]
    fn test_json_roundtrip_keeps_values() {
        let prefs = Preferences {
            use_pressure: false,
            ..Default::default()
        };
        let json = prefs.to_json().unwrap();
        assert_eq!(Preferences::from_json(&json).unwrap(), prefs);
    }
}
