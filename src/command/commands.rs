use serde::{Deserialize, Serialize};

use super::CommandResult;
use crate::config::Preferences;
use crate::layer::LayerId;
use crate::state::EditorContext;
use crate::tool::{ToolKind, ToolSetting};

/// Requests from the UI layer to the editor core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Change the active tool
    SelectTool(ToolKind),

    /// Change one setting of a tool; the tool need not be active
    UpdateToolSetting { tool: ToolKind, setting: ToolSetting },

    /// Target subsequent strokes at another layer
    SetActiveLayer(LayerId),

    /// Set the shared drawing color, RGB 0..=255
    SetColor([u8; 3]),

    SetPreferences(Preferences),

    /// Undo the last commit on the active layer
    Undo,

    /// Redo on the active layer
    Redo,
}

impl Command {
    pub fn execute(self, ctx: &mut EditorContext) -> CommandResult {
        match self {
            Command::SelectTool(tool) => ctx.select_tool(tool),
            Command::UpdateToolSetting { tool, setting } => ctx.update_tool_setting(tool, setting),
            Command::SetActiveLayer(layer) => ctx.set_active_layer(layer),
            Command::SetColor(color) => {
                ctx.set_color(color);
                Ok(())
            }
            Command::SetPreferences(prefs) => ctx.set_preferences(prefs),
            Command::Undo => ctx.undo(),
            Command::Redo => ctx.redo(),
        }
    }

    /// Whether the command changes layer pixels
    pub fn modifies_pixels(&self) -> bool {
        matches!(self, Command::Undo | Command::Redo)
    }
}
