use crate::config::Preferences;
use crate::error::{RenderError, ToolError};
use crate::gpu::{BlendState, Device};
use crate::stroke::{PointStore, StampCursor, StrokeDynamics};

use super::super::settings::{BrushSettings, PencilSettings, ToolSetting};
use super::super::trait_def::{StrokeContext, StrokeOutput, StrokeTool, Tool};
use super::brush::BrushTool;
use super::ToolKind;

/// Hard-edged brush. Owns a [`BrushTool`] built with a binary coverage
/// program and writes every accepted setting through to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PencilTool {
    settings: PencilSettings,
    brush: BrushTool,
}

impl PencilTool {
    pub fn new(device: &Device) -> Result<Self, RenderError> {
        let program = device.create_program("pencil", BlendState::SRC_OVER, true)?;
        let settings = PencilSettings::default();
        let brush = BrushTool::with_program(Self::brush_settings(&settings), program);
        Ok(Self { settings, brush })
    }

    fn brush_settings(settings: &PencilSettings) -> BrushSettings {
        BrushSettings {
            size: settings.size,
            flow: 1.0,
            opacity: settings.opacity,
            hardness: 1.0,
            spacing: settings.spacing,
            pressure_sensitive: settings.pressure_sensitive,
        }
    }

    pub fn settings(&self) -> &PencilSettings {
        &self.settings
    }

    pub fn brush(&self) -> &BrushTool {
        &self.brush
    }
}

impl Tool for PencilTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Pencil
    }

    fn name(&self) -> &'static str {
        "Pencil"
    }

    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        let value = setting.validated()?;
        match setting {
            ToolSetting::Size(_) => self.settings.size = value,
            ToolSetting::Opacity(_) => self.settings.opacity = value,
            ToolSetting::Spacing(_) => self.settings.spacing = value,
            ToolSetting::PressureSensitive(on) => self.settings.pressure_sensitive = on,
            ToolSetting::Flow(_) | ToolSetting::Hardness(_) | ToolSetting::SampleSize(_) => {
                return Err(setting.unsupported(self.name()));
            }
        }
        self.brush.apply_setting(setting)
    }
}

impl StrokeTool for PencilTool {
    fn dynamics(&self, prefs: &Preferences) -> StrokeDynamics {
        self.brush.dynamics(prefs)
    }

    fn opacity(&self) -> f32 {
        self.brush.opacity()
    }

    fn draw(&mut self, points: &mut PointStore, cursor: &mut StampCursor, ctx: StrokeContext<'_>) -> StrokeOutput {
        self.brush.draw(points, cursor, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Capabilities;

    #[test]
    fn test_settings_forward_to_brush() {
        let device = Device::new(Capabilities::default()).unwrap();
        let mut pencil = PencilTool::new(&device).unwrap();
        pencil.apply_setting(ToolSetting::Size(7.0)).unwrap();
        pencil.apply_setting(ToolSetting::Opacity(0.4)).unwrap();
        assert_eq!(pencil.brush().settings.size, 7.0);
        assert_eq!(pencil.opacity(), 0.4);
        assert!(pencil.brush().program().hard_edge());
    }

    #[test]
    fn test_hardness_is_fixed() {
        let device = Device::new(Capabilities::default()).unwrap();
        let mut pencil = PencilTool::new(&device).unwrap();
        assert!(pencil.apply_setting(ToolSetting::Hardness(0.2)).is_err());
        assert_eq!(pencil.brush().settings.hardness, 1.0);
    }
}
