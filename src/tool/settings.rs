use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Accepted range of each numeric setting
pub mod ranges {
    pub const SIZE: (f32, f32) = (1.0, 500.0);
    pub const FLOW: (f32, f32) = (0.0, 1.0);
    pub const OPACITY: (f32, f32) = (0.0, 1.0);
    pub const HARDNESS: (f32, f32) = (0.0, 1.0);
    /// Percent of the stamp diameter
    pub const SPACING: (f32, f32) = (1.0, 200.0);
    pub const SAMPLE_SIZE: (f32, f32) = (1.0, 31.0);
}

/// A single setting update sent from the UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ToolSetting {
    Size(f32),
    Flow(f32),
    Opacity(f32),
    Hardness(f32),
    Spacing(f32),
    SampleSize(f32),
    PressureSensitive(bool),
}

impl ToolSetting {
    pub fn name(&self) -> &'static str {
        match self {
            ToolSetting::Size(_) => "size",
            ToolSetting::Flow(_) => "flow",
            ToolSetting::Opacity(_) => "opacity",
            ToolSetting::Hardness(_) => "hardness",
            ToolSetting::Spacing(_) => "spacing",
            ToolSetting::SampleSize(_) => "sample size",
            ToolSetting::PressureSensitive(_) => "pressure sensitivity",
        }
    }

    fn range(&self) -> Option<(f32, f32)> {
        match self {
            ToolSetting::Size(_) => Some(ranges::SIZE),
            ToolSetting::Flow(_) => Some(ranges::FLOW),
            ToolSetting::Opacity(_) => Some(ranges::OPACITY),
            ToolSetting::Hardness(_) => Some(ranges::HARDNESS),
            ToolSetting::Spacing(_) => Some(ranges::SPACING),
            ToolSetting::SampleSize(_) => Some(ranges::SAMPLE_SIZE),
            ToolSetting::PressureSensitive(_) => None,
        }
    }

    /// Returns the numeric value if it lies inside the setting's range.
    pub fn validated(&self) -> Result<f32, ToolError> {
        let value = match *self {
            ToolSetting::Size(v)
            | ToolSetting::Flow(v)
            | ToolSetting::Opacity(v)
            | ToolSetting::Hardness(v)
            | ToolSetting::Spacing(v)
            | ToolSetting::SampleSize(v) => v,
            ToolSetting::PressureSensitive(on) => return Ok(if on { 1.0 } else { 0.0 }),
        };
        let Some((min, max)) = self.range() else {
            return Ok(value);
        };
        if !value.is_finite() || value < min || value > max {
            return Err(ToolError::InvalidSetting {
                setting: self.name(),
                value,
                min,
                max,
            });
        }
        Ok(value)
    }

    pub(crate) fn unsupported(&self, tool: &'static str) -> ToolError {
        ToolError::UnsupportedSetting {
            tool,
            setting: self.name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Stamp radius in world pixels
    pub size: f32,
    /// Alpha of each stamp
    pub flow: f32,
    /// Alpha cap of the whole stroke, applied on commit
    pub opacity: f32,
    pub hardness: f32,
    pub spacing: f32,
    pub pressure_sensitive: bool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 10.0,
            flow: 1.0,
            opacity: 1.0,
            hardness: 0.8,
            spacing: 25.0,
            pressure_sensitive: true,
        }
    }
}

impl BrushSettings {
    pub fn apply(&mut self, setting: ToolSetting, tool: &'static str) -> Result<(), ToolError> {
        let value = setting.validated()?;
        match setting {
            ToolSetting::Size(_) => self.size = value,
            ToolSetting::Flow(_) => self.flow = value,
            ToolSetting::Opacity(_) => self.opacity = value,
            ToolSetting::Hardness(_) => self.hardness = value,
            ToolSetting::Spacing(_) => self.spacing = value,
            ToolSetting::PressureSensitive(on) => self.pressure_sensitive = on,
            ToolSetting::SampleSize(_) => return Err(setting.unsupported(tool)),
        }
        Ok(())
    }
}

/// Pencil strokes are always hard edged, so there is no hardness or flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PencilSettings {
    pub size: f32,
    pub opacity: f32,
    pub spacing: f32,
    pub pressure_sensitive: bool,
}

impl Default for PencilSettings {
    fn default() -> Self {
        Self {
            size: 2.0,
            opacity: 1.0,
            spacing: 15.0,
            pressure_sensitive: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EraserSettings {
    pub size: f32,
    pub flow: f32,
    pub hardness: f32,
    pub spacing: f32,
    pub pressure_sensitive: bool,
}

impl Default for EraserSettings {
    fn default() -> Self {
        Self {
            size: 20.0,
            flow: 1.0,
            hardness: 0.5,
            spacing: 25.0,
            pressure_sensitive: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillSettings {
    pub opacity: f32,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyedropperSettings {
    /// Side of the square window averaged around the sample point
    pub sample_size: u32,
}

impl Default for EyedropperSettings {
    fn default() -> Self {
        Self { sample_size: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_rejected() {
        let err = ToolSetting::Flow(1.5).validated().unwrap_err();
        assert_eq!(
            err,
            ToolError::InvalidSetting {
                setting: "flow",
                value: 1.5,
                min: 0.0,
                max: 1.0
            }
        );
        assert!(ToolSetting::Size(f32::NAN).validated().is_err());
    }

    #[test]
    fn test_brush_rejects_sample_size() {
        let mut settings = BrushSettings::default();
        assert!(matches!(
            settings.apply(ToolSetting::SampleSize(3.0), "Brush"),
            Err(ToolError::UnsupportedSetting { tool: "Brush", .. })
        ));
        settings.apply(ToolSetting::Size(42.0), "Brush").unwrap();
        assert_eq!(settings.size, 42.0);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: BrushSettings = serde_json::from_str(r#"{ "size": 3.0 }"#).unwrap();
        assert_eq!(settings.size, 3.0);
        assert_eq!(settings.spacing, BrushSettings::default().spacing);
    }
}
