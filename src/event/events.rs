use egui::Pos2;

use crate::error::ReadbackError;
use crate::layer::LayerId;
use crate::state::InteractionState;
use crate::tool::ToolKind;

/// Notifications broadcast from the editor core to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ToolChanged {
        old: ToolKind,
        new: ToolKind,
    },
    InteractionChanged {
        old: InteractionState,
        new: InteractionState,
    },
    /// The view moved or zoomed; UI overlays should follow
    CameraChanged {
        zoom: f32,
        position: Pos2,
    },
    StrokeStarted {
        layer: LayerId,
    },
    /// Pixels were committed to a layer and an undo snapshot pushed
    StrokeCommitted {
        layer: LayerId,
    },
    StrokeCancelled {
        layer: LayerId,
    },
    ColorPicked([u8; 3]),
    LayerUndone {
        layer: LayerId,
    },
    LayerRedone {
        layer: LayerId,
    },
    ReadbackFailed(ReadbackError),
}

impl EditorEvent {
    /// The layer whose pixels the event concerns, if any
    pub fn layer(&self) -> Option<LayerId> {
        match self {
            EditorEvent::StrokeStarted { layer }
            | EditorEvent::StrokeCommitted { layer }
            | EditorEvent::StrokeCancelled { layer }
            | EditorEvent::LayerUndone { layer }
            | EditorEvent::LayerRedone { layer } => Some(*layer),
            _ => None,
        }
    }

    /// Whether the layer's pixels changed, so its thumbnail is out of date
    pub fn changes_pixels(&self) -> bool {
        matches!(
            self,
            EditorEvent::StrokeCommitted { .. } | EditorEvent::LayerUndone { .. } | EditorEvent::LayerRedone { .. }
        )
    }
}
