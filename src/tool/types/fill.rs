use crate::compositor::Compositor;
use crate::error::{LayerError, ToolError};
use crate::layer::LayerId;
use crate::stroke::Point;

use super::super::settings::{FillSettings, ToolSetting};
use super::super::trait_def::{PointOutcome, PointTool, Tool};
use super::ToolKind;

/// Fills the whole target layer with the current color, bounded by the
/// clipping base when the layer is a clipping mask.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillTool {
    pub settings: FillSettings,
}

impl Tool for FillTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Fill
    }

    fn name(&self) -> &'static str {
        "Fill"
    }

    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        match setting {
            ToolSetting::Opacity(_) => {
                self.settings.opacity = setting.validated()?;
                Ok(())
            }
            _ => Err(setting.unsupported(self.name())),
        }
    }
}

impl PointTool for FillTool {
    fn use_at(
        &mut self,
        _point: &Point,
        compositor: &mut Compositor,
        layer: LayerId,
        color: [u8; 3],
    ) -> Result<PointOutcome, LayerError> {
        let region = compositor.fill(layer, color, self.settings.opacity)?;
        Ok(PointOutcome::Filled { layer, region })
    }
}
