/// Classifies what the pointer is currently doing on the canvas.
///
/// Every interaction starts from and returns to `Idle`; there are no direct
/// edges between the active states. Switching from a stroke to a pinch goes
/// through `Idle` so the stroke is always ended (and cancelled) first.
///
/// # State Transitions
///
/// ```text
///                 ┌──────────────┐
///           ┌─────►     Pan      ├─────┐
///           │     └──────────────┘     │
///           │     ┌──────────────┐     │
///           ├─────►  Zoom (wheel)├─────┤
/// ┌──────┐  │     └──────────────┘     │  ┌──────┐
/// │ Idle ├──┤     ┌──────────────┐     ├──► Idle │
/// └──────┘  ├─────► TouchPanZoom ├─────┤  └──────┘
///           │     └──────────────┘     │
///           │     ┌──────────────┐     │
///           └─────►   UseTool    ├─────┘
///                 └──────────────┘
/// ```
///
/// `Zoom` is transient: a wheel event enters it, applies the zoom and
/// leaves it within the same call.
use egui::Pos2;

use crate::tool::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Dragging the view with the pan modifier or middle button held
    Pan {
        /// Screen position of the previous pan sample
        last: Pos2,
    },
    /// Applying a wheel zoom
    Zoom,
    /// Two-finger pan and pinch-zoom
    TouchPanZoom,
    /// Drawing or applying a point tool
    UseTool { tool: ToolKind },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "Idle",
            InteractionState::Pan { .. } => "Pan",
            InteractionState::Zoom => "Zoom",
            InteractionState::TouchPanZoom => "TouchPanZoom",
            InteractionState::UseTool { .. } => "UseTool",
        }
    }

    /// Validates whether a transition to the new state is allowed
    pub fn can_transition_to(&self, new_state: &InteractionState) -> bool {
        match (self, new_state) {
            // Idle -> Idle is a no-op, not a transition
            (InteractionState::Idle, InteractionState::Idle) => false,
            (InteractionState::Idle, _) => true,
            (_, InteractionState::Idle) => true,
            _ => false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn is_using_tool(&self) -> bool {
        matches!(self, InteractionState::UseTool { .. })
    }

    /// Returns true while the camera is being driven by the pointer
    pub fn is_navigating(&self) -> bool {
        matches!(
            self,
            InteractionState::Pan { .. } | InteractionState::Zoom | InteractionState::TouchPanZoom
        )
    }

    /// The tool in use, if any
    pub fn tool(&self) -> Option<ToolKind> {
        match self {
            InteractionState::UseTool { tool } => Some(*tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for InteractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_reaches_every_state() {
        let idle = InteractionState::Idle;
        assert!(idle.can_transition_to(&InteractionState::Pan { last: Pos2::ZERO }));
        assert!(idle.can_transition_to(&InteractionState::Zoom));
        assert!(idle.can_transition_to(&InteractionState::TouchPanZoom));
        assert!(idle.can_transition_to(&InteractionState::UseTool { tool: ToolKind::Brush }));
    }

    #[test]
    fn test_active_states_only_return_to_idle() {
        let drawing = InteractionState::UseTool { tool: ToolKind::Brush };
        assert!(drawing.can_transition_to(&InteractionState::Idle));
        assert!(!drawing.can_transition_to(&InteractionState::TouchPanZoom));
        assert!(!InteractionState::TouchPanZoom.can_transition_to(&drawing));
        assert!(!InteractionState::Zoom.can_transition_to(&InteractionState::Pan { last: Pos2::ZERO }));
    }

    #[test]
    fn test_queries() {
        let drawing = InteractionState::UseTool { tool: ToolKind::Eraser };
        assert_eq!(drawing.tool(), Some(ToolKind::Eraser));
        assert!(drawing.is_using_tool());
        assert!(InteractionState::TouchPanZoom.is_navigating());
        assert_eq!(InteractionState::Zoom.to_string(), "Zoom");
    }
}
