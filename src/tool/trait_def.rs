use crate::compositor::Compositor;
use crate::config::Preferences;
use crate::error::{LayerError, ToolError};
use crate::gpu::{BoundingBox, Surface};
use crate::layer::LayerId;
use crate::stroke::{Point, PointStore, Stamp, StampCursor, StrokeDynamics};

use super::settings::ToolSetting;
use super::types::ToolKind;

/// What a stroke tool needs for one draw call
#[derive(Debug)]
pub struct StrokeContext<'a> {
    pub prefs: &'a Preferences,
    /// Current color, RGB 0..=255
    pub color: [u8; 3],
    /// Scratch surface, or the layer itself for tools that write live
    pub target: &'a mut Surface,
}

/// Stamps placed by one draw call and the region they touched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeOutput {
    pub stamps: Vec<Stamp>,
    pub dirty: Option<BoundingBox>,
}

/// Result of a discrete tool use
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointOutcome {
    Filled {
        layer: LayerId,
        region: Option<BoundingBox>,
    },
    Picked([u8; 3]),
    /// The sample fell outside the canvas
    Missed,
}

/// Phases every tool implements. Continuous drawing and discrete use are
/// separate capabilities, reached through `ToolType::as_stroke_tool_mut`
/// and `ToolType::as_point_tool_mut`.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    fn name(&self) -> &'static str;

    /// Validates and stores a setting update.
    fn apply_setting(&mut self, setting: ToolSetting) -> Result<(), ToolError>;

    /// Called when the tool becomes the active tool
    fn switch_to(&mut self) {}

    /// Called at the end of every interaction
    fn reset(&mut self) {}
}

/// A tool that turns a stream of committed points into stamps.
pub trait StrokeTool: Tool {
    fn dynamics(&self, prefs: &Preferences) -> StrokeDynamics;

    /// Alpha cap applied when the scratch surface is committed
    fn opacity(&self) -> f32 {
        1.0
    }

    /// Stamps straight into the target layer instead of the scratch surface
    fn writes_live(&self) -> bool {
        false
    }

    fn draw(&mut self, points: &mut PointStore, cursor: &mut StampCursor, ctx: StrokeContext<'_>) -> StrokeOutput;
}

/// A tool applied once per interaction at a single point.
pub trait PointTool: Tool {
    fn use_at(
        &mut self,
        point: &Point,
        compositor: &mut Compositor,
        layer: LayerId,
        color: [u8; 3],
    ) -> Result<PointOutcome, LayerError>;
}
