pub mod brush;
pub mod eraser;
pub mod eyedropper;
pub mod fill;
pub mod pencil;

pub use brush::BrushTool;
pub use eraser::EraserTool;
pub use eyedropper::EyedropperTool;
pub use fill::FillTool;
pub use pencil::PencilTool;

use serde::{Deserialize, Serialize};
use std::fmt;

use super::settings::ToolSetting;
use super::trait_def::{PointTool, StrokeTool, Tool};
use crate::error::{RenderError, ToolError};
use crate::gpu::Device;

/// Tool selection as sent by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Pencil,
    Fill,
    Eyedropper,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Brush,
            ToolKind::Pencil,
            ToolKind::Eraser,
            ToolKind::Fill,
            ToolKind::Eyedropper,
        ]
    }

    /// Continuous tools sample the whole drag; the rest act once per interaction.
    pub fn is_stroke(&self) -> bool {
        matches!(self, ToolKind::Brush | ToolKind::Eraser | ToolKind::Pencil)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Pencil => "Pencil",
            ToolKind::Fill => "Fill",
            ToolKind::Eyedropper => "Eyedropper",
        };
        f.write_str(name)
    }
}

/// Enum over all tool implementations
#[derive(Debug, Clone)]
pub enum ToolType {
    Brush(BrushTool),
    Eraser(EraserTool),
    Pencil(PencilTool),
    Fill(FillTool),
    Eyedropper(EyedropperTool),
}

impl Tool for ToolType {
    fn kind(&self) -> ToolKind {
        match self {
            Self::Brush(tool) => tool.kind(),
            Self::Eraser(tool) => tool.kind(),
            Self::Pencil(tool) => tool.kind(),
            Self::Fill(tool) => tool.kind(),
            Self::Eyedropper(tool) => tool.kind(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Brush(tool) => tool.name(),
            Self::Eraser(tool) => tool.name(),
            Self::Pencil(tool) => tool.name(),
            Self::Fill(tool) => tool.name(),
            Self::Eyedropper(tool) => tool.name(),
        }
    }

    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError> {
        match self {
            Self::Brush(tool) => tool.apply_setting(setting),
            Self::Eraser(tool) => tool.apply_setting(setting),
            Self::Pencil(tool) => tool.apply_setting(setting),
            Self::Fill(tool) => tool.apply_setting(setting),
            Self::Eyedropper(tool) => tool.apply_setting(setting),
        }
    }

    fn switch_to(&mut self) {
        match self {
            Self::Brush(tool) => tool.switch_to(),
            Self::Eraser(tool) => tool.switch_to(),
            Self::Pencil(tool) => tool.switch_to(),
            Self::Fill(tool) => tool.switch_to(),
            Self::Eyedropper(tool) => tool.switch_to(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Brush(tool) => tool.reset(),
            Self::Eraser(tool) => tool.reset(),
            Self::Pencil(tool) => tool.reset(),
            Self::Fill(tool) => tool.reset(),
            Self::Eyedropper(tool) => tool.reset(),
        }
    }
}

// Helper methods for ToolType
impl ToolType {
    pub fn as_stroke_tool(&self) -> Option<&dyn StrokeTool> {
        match self {
            Self::Brush(tool) => Some(tool),
            Self::Eraser(tool) => Some(tool),
            Self::Pencil(tool) => Some(tool),
            Self::Fill(_) | Self::Eyedropper(_) => None,
        }
    }

    pub fn as_stroke_tool_mut(&mut self) -> Option<&mut dyn StrokeTool> {
        match self {
            Self::Brush(tool) => Some(tool),
            Self::Eraser(tool) => Some(tool),
            Self::Pencil(tool) => Some(tool),
            Self::Fill(_) | Self::Eyedropper(_) => None,
        }
    }

    pub fn as_point_tool_mut(&mut self) -> Option<&mut dyn PointTool> {
        match self {
            Self::Fill(tool) => Some(tool),
            Self::Eyedropper(tool) => Some(tool),
            Self::Brush(_) | Self::Eraser(_) | Self::Pencil(_) => None,
        }
    }
}

/// One initialized instance of every tool, owned for the session
#[derive(Debug, Clone)]
pub struct ToolBox {
    tools: Vec<ToolType>,
}

impl ToolBox {
    /// Creates every tool and its GPU resources.
    pub fn new(device: &Device) -> Result<Self, RenderError> {
        Ok(Self {
            tools: vec![
                ToolType::Brush(BrushTool::new(device)?),
                ToolType::Eraser(EraserTool::new(device)?),
                ToolType::Pencil(PencilTool::new(device)?),
                ToolType::Fill(FillTool::default()),
                ToolType::Eyedropper(EyedropperTool::default()),
            ],
        })
    }

    pub fn get(&self, kind: ToolKind) -> Option<&ToolType> {
        self.tools.iter().find(|tool| tool.kind() == kind)
    }

    pub fn get_mut(&mut self, kind: ToolKind) -> Option<&mut ToolType> {
        self.tools.iter_mut().find(|tool| tool.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolType> {
        self.tools.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Capabilities;

    #[test]
    fn test_toolbox_has_every_kind() {
        let device = Device::new(Capabilities::default()).unwrap();
        let tools = ToolBox::new(&device).unwrap();
        for kind in ToolKind::all() {
            assert_eq!(tools.get(*kind).map(|t| t.kind()), Some(*kind));
        }
    }

    #[test]
    fn test_capabilities_match_kind() {
        let device = Device::new(Capabilities::default()).unwrap();
        let mut tools = ToolBox::new(&device).unwrap();
        for kind in ToolKind::all() {
            let tool = tools.get_mut(*kind).unwrap();
            assert_eq!(tool.as_stroke_tool_mut().is_some(), kind.is_stroke());
            assert_eq!(tool.as_point_tool_mut().is_some(), !kind.is_stroke());
        }
    }

    #[test]
    fn test_toolbox_fails_on_lost_device() {
        let mut device = Device::new(Capabilities::default()).unwrap();
        device.lose();
        assert!(ToolBox::new(&device).is_err());
    }
}
