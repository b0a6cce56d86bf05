use crate::compositor::Compositor;
use crate::error::{LayerError, ToolError};
use crate::layer::LayerId;
use crate::stroke::Point;

use super::super::settings::{EyedropperSettings, ToolSetting};
use super::super::trait_def::{PointOutcome, PointTool, Tool};
use super::ToolKind;

/// Picks a color from the composited image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EyedropperTool {
    pub settings: EyedropperSettings,
}

impl Tool for EyedropperTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Eyedropper
    }

    fn name(&self) -> &'static str {
        "Eyedropper"
    }

    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        match setting {
            ToolSetting::SampleSize(_) => {
                self.settings.sample_size = setting.validated()?.round() as u32;
                Ok(())
            }
            _ => Err(setting.unsupported(self.name())),
        }
    }
}

impl PointTool for EyedropperTool {
    fn use_at(
        &mut self,
        point: &Point,
        compositor: &mut Compositor,
        _layer: LayerId,
        _color: [u8; 3],
    ) -> Result<PointOutcome, LayerError> {
        Ok(match compositor.sample(point.pos, self.settings.sample_size) {
            Some(rgb) => PointOutcome::Picked(rgb),
            None => PointOutcome::Missed,
        })
    }
}
