use crate::config::Preferences;
use crate::error::{RenderError, ToolError};
use crate::gpu::{BlendState, Device, StampProgram, StampUniforms};
use crate::stroke::{PointStore, StampCursor, StrokeDynamics};

use super::super::settings::{EraserSettings, ToolSetting};
use super::super::trait_def::{StrokeContext, StrokeOutput, StrokeTool, Tool};
use super::brush::stamp_stroke;
use super::ToolKind;

/// Removes coverage from the target layer using the brush stamping geometry.
///
/// The blend equation is reverse-subtract with a zero constant alpha as the
/// source factor, so each stamp only scales the destination by
/// `1 - coverage`. Color channels shrink with alpha and hue is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct EraserTool {
    pub settings: EraserSettings,
    program: StampProgram,
}

impl EraserTool {
    pub fn new(device: &Device) -> Result<Self, RenderError> {
        let program = device.create_program("eraser", BlendState::erase(0.0), false)?;
        Ok(Self {
            settings: EraserSettings::default(),
            program,
        })
    }
}

impl Tool for EraserTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eraser
    }

    fn name(&self) -> &'static str {
        "Eraser"
    }

    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        let value = setting.validated()?;
        match setting {
            ToolSetting::Size(_) => self.settings.size = value,
            ToolSetting::Flow(_) => self.settings.flow = value,
            ToolSetting::Hardness(_) => self.settings.hardness = value,
            ToolSetting::Spacing(_) => self.settings.spacing = value,
            ToolSetting::PressureSensitive(on) => self.settings.pressure_sensitive = on,
            ToolSetting::Opacity(_) | ToolSetting::SampleSize(_) => {
                return Err(setting.unsupported(self.name()));
            }
        }
        Ok(())
    }
}

impl StrokeTool for EraserTool {
    fn dynamics(&self, prefs: &Preferences) -> StrokeDynamics {
        StrokeDynamics::new(
            self.settings.size,
            self.settings.spacing,
            self.settings.pressure_sensitive,
            prefs,
        )
    }

    fn writes_live(&self) -> bool {
        true
    }

    fn draw(&mut self, points: &mut PointStore, cursor: &mut StampCursor, ctx: StrokeContext<'_>) -> StrokeOutput {
        let dynamics = self.dynamics(ctx.prefs);
        let uniforms = StampUniforms {
            color: [0.0; 3],
            flow: self.settings.flow,
            hardness: self.settings.hardness,
        };
        stamp_stroke(&self.program, &uniforms, &dynamics, points, cursor, ctx.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{premultiplied, Capabilities};
    use crate::input::PointerType;
    use crate::stroke::Point;
    use egui::Pos2;

    #[test]
    fn test_erasing_keeps_hue() {
        let device = Device::new(Capabilities::default()).unwrap();
        let mut eraser = EraserTool::new(&device).unwrap();
        eraser.settings.flow = 0.3;
        eraser.settings.hardness = 0.0;
        let mut target = device.create_surface(32, 32).unwrap();
        target.fill(premultiplied([200, 100, 50], 1.0));

        let mut points = PointStore::new();
        points.commit(Point::new(Pos2::new(16.0, 16.0), 0.5, PointerType::Mouse));
        let prefs = Preferences::default();
        eraser.draw(
            &mut points,
            &mut StampCursor::default(),
            StrokeContext {
                prefs: &prefs,
                color: [0, 255, 0],
                target: &mut target,
            },
        );

        let [r, g, b, a] = target.unmultiplied(18, 16);
        assert!(a < 1.0 && a > 0.0);
        assert!((r - 200.0 / 255.0).abs() < 1e-3);
        assert!((g - 100.0 / 255.0).abs() < 1e-3);
        assert!((b - 50.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_opacity_not_supported() {
        let device = Device::new(Capabilities::default()).unwrap();
        let mut eraser = EraserTool::new(&device).unwrap();
        assert!(matches!(
            eraser.apply_setting(ToolSetting::Opacity(0.5)),
            Err(ToolError::UnsupportedSetting { tool: "Eraser", .. })
        ));
    }
}
