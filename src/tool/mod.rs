pub mod settings;
pub mod types;
mod trait_def;

pub use settings::{
    BrushSettings, EraserSettings, EyedropperSettings, FillSettings, PencilSettings, ToolSetting,
};
pub use trait_def::{PointOutcome, PointTool, StrokeContext, StrokeOutput, StrokeTool, Tool};
pub use types::{ToolBox, ToolKind, ToolType};

// Re-export specific tool implementations
pub use types::brush::BrushTool;
pub use types::eraser::EraserTool;
pub use types::eyedropper::EyedropperTool;
pub use types::fill::FillTool;
pub use types::pencil::PencilTool;
