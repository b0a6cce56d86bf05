use crate::config::Preferences;
use crate::error::{RenderError, ToolError};
use crate::gpu::{BlendState, BoundingBox, Device, StampProgram, StampUniforms, Surface};
use crate::stroke::{plan_stamps, redistribute, PointStore, StampCursor, StrokeDynamics};

use super::super::settings::{BrushSettings, ToolSetting};
use super::super::trait_def::{StrokeContext, StrokeOutput, StrokeTool, Tool};
use super::ToolKind;

/// Redistributes the newest window, plans the stamps for the stroke added
/// since the last draw and rasterizes them.
///
/// Shared by every stamping tool; they differ only in program and uniforms.
pub(crate) fn stamp_stroke(
    program: &StampProgram,
    uniforms: &StampUniforms,
    dynamics: &StrokeDynamics,
    points: &mut PointStore,
    cursor: &mut StampCursor,
    target: &mut Surface,
) -> StrokeOutput {
    redistribute(points);
    let stamps = plan_stamps(points, dynamics, cursor);
    let mut dirty: Option<BoundingBox> = None;
    for stamp in &stamps {
        if let Some(region) = program.draw(target, stamp, uniforms) {
            dirty = Some(dirty.map_or(region, |d| d.union(&region)));
        }
    }
    log::trace!("{}: {} stamps", program.label(), stamps.len());
    StrokeOutput { stamps, dirty }
}

pub(crate) fn normalized(color: [u8; 3]) -> [f32; 3] {
    color.map(|c| c as f32 / 255.0)
}

/// The brush tool for freehand painting
#[derive(Debug, Clone, PartialEq)]
pub struct BrushTool {
    pub settings: BrushSettings,
    program: StampProgram,
}

impl BrushTool {
    pub fn new(device: &Device) -> Result<Self, RenderError> {
        let program = device.create_program("brush", BlendState::SRC_OVER, false)?;
        Ok(Self::with_program(BrushSettings::default(), program))
    }

    pub(crate) fn with_program(settings: BrushSettings, program: StampProgram) -> Self {
        Self { settings, program }
    }

    pub fn program(&self) -> &StampProgram {
        &self.program
    }

    fn uniforms(&self, color: [u8; 3]) -> StampUniforms {
        StampUniforms {
            color: normalized(color),
            flow: self.settings.flow,
            hardness: self.settings.hardness,
        }
    }
}

impl Tool for BrushTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Brush
    }

    fn name(&self) -> &'static str {
        "Brush"
    }

    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        self.settings.apply(setting, self.name())
    }
}

impl StrokeTool for BrushTool {
    fn dynamics(&self, prefs: &Preferences) -> StrokeDynamics {
        StrokeDynamics::new(
            self.settings.size,
            self.settings.spacing,
            self.settings.pressure_sensitive,
            prefs,
        )
    }

    fn opacity(&self) -> f32 {
        self.settings.opacity
    }

    fn draw(&mut self, points: &mut PointStore, cursor: &mut StampCursor, ctx: StrokeContext<'_>) -> StrokeOutput {
        let dynamics = self.dynamics(ctx.prefs);
        let uniforms = self.uniforms(ctx.color);
        stamp_stroke(&self.program, &uniforms, &dynamics, points, cursor, ctx.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Capabilities;
    use crate::input::PointerType;
    use crate::stroke::Point;
    use egui::Pos2;

    fn brush() -> (Device, BrushTool) {
        let device = Device::new(Capabilities::default()).unwrap();
        let brush = BrushTool::new(&device).unwrap();
        (device, brush)
    }

    #[test]
    fn test_draw_paints_scratch() {
        let (device, mut brush) = brush();
        let mut target = device.create_surface(64, 16).unwrap();
        let mut points = PointStore::new();
        points.commit(Point::new(Pos2::new(4.0, 8.0), 1.0, PointerType::Pen));
        points.commit(Point::new(Pos2::new(40.0, 8.0), 1.0, PointerType::Pen));

        let prefs = Preferences::default();
        let output = brush.draw(
            &mut points,
            &mut StampCursor::default(),
            StrokeContext {
                prefs: &prefs,
                color: [255, 0, 0],
                target: &mut target,
            },
        );
        assert!(output.stamps.len() > 2);
        let dirty = output.dirty.unwrap();
        assert!(dirty.contains(20, 8));
        let [r, g, _, a] = target.unmultiplied(20, 8);
        assert!(a > 0.99);
        assert!(r > 0.99 && g < 0.01);
    }

    #[test]
    fn test_settings_validated() {
        let (_device, mut brush) = brush();
        assert!(brush.apply_setting(ToolSetting::Size(0.0)).is_err());
        brush.apply_setting(ToolSetting::Opacity(0.5)).unwrap();
        assert_eq!(brush.opacity(), 0.5);
    }
}
