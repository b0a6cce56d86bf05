use egui::Pos2;
use serde::{Deserialize, Serialize};

mod gestures;
mod handler;

pub use gestures::{PinchUpdate, TouchTracker};
pub use handler::InputHandler;

/// Button bits, matching the DOM `buttons` bitmask
pub mod buttons {
    pub const PRIMARY: u8 = 1;
    pub const SECONDARY: u8 = 2;
    pub const MIDDLE: u8 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// A sub-frame pointer sample delivered alongside a move event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub pos: Pos2,
    pub pressure: f32,
}

/// A pointer event in canvas-local screen coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: u64,
    pub pointer_type: PointerType,
    pub pos: Pos2,
    /// Pressure between 0.0 and 1.0
    pub pressure: f32,
    pub buttons: u8,
    /// The pan modifier key is held
    pub pan_modifier: bool,
    /// Coalesced samples in temporal order; empty when the platform has none
    pub coalesced: Vec<PointerSample>,
}

impl PointerEvent {
    pub fn new(pointer_type: PointerType, pos: Pos2, pressure: f32) -> Self {
        Self {
            pointer_id: 0,
            pointer_type,
            pos,
            pressure,
            buttons: buttons::PRIMARY,
            pan_modifier: false,
            coalesced: Vec::new(),
        }
    }

    pub fn mouse(pos: Pos2) -> Self {
        Self::new(PointerType::Mouse, pos, 0.5)
    }

    pub fn pen(pos: Pos2, pressure: f32) -> Self {
        Self::new(PointerType::Pen, pos, pressure)
    }

    pub fn touch(pointer_id: u64, pos: Pos2) -> Self {
        Self {
            pointer_id,
            ..Self::new(PointerType::Touch, pos, 1.0)
        }
    }

    pub fn with_buttons(mut self, buttons: u8) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_pan_modifier(mut self, held: bool) -> Self {
        self.pan_modifier = held;
        self
    }

    pub fn with_coalesced(mut self, samples: Vec<PointerSample>) -> Self {
        self.coalesced = samples;
        self
    }

    /// Samples to feed through the sampling pipeline, oldest first.
    pub fn samples(&self) -> Vec<PointerSample> {
        if self.coalesced.is_empty() {
            vec![PointerSample {
                pos: self.pos,
                pressure: self.pressure,
            }]
        } else {
            self.coalesced.clone()
        }
    }
}

/// Raw input delivered to the interaction state machine
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    PointerCancel(PointerEvent),
    PointerLeave(PointerEvent),
    /// Wheel with DOM sign convention: positive `delta_y` zooms out
    Wheel { pos: Pos2, delta_y: f32 },
}

impl InputEvent {
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match self {
            InputEvent::PointerDown(e)
            | InputEvent::PointerMove(e)
            | InputEvent::PointerUp(e)
            | InputEvent::PointerCancel(e)
            | InputEvent::PointerLeave(e) => Some(e),
            InputEvent::Wheel { .. } => None,
        }
    }

    /// Up, cancel and leave all end the active interaction
    pub fn ends_interaction(&self) -> bool {
        matches!(
            self,
            InputEvent::PointerUp(_) | InputEvent::PointerCancel(_) | InputEvent::PointerLeave(_)
        )
    }
}
