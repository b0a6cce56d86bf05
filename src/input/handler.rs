use egui::{Context, Key, PointerButton, Pos2, Rect, TouchPhase};

use super::{buttons, InputEvent, PointerEvent, PointerType};

/// Pixels of DOM wheel delta per egui scroll point
const WHEEL_SCALE: f32 = 2.0;

/// Handles converting raw egui input into canvas-local `InputEvent`s
pub struct InputHandler {
    canvas_rect: Rect,
    last_pointer_pos: Option<Pos2>,
}

impl InputHandler {
    pub fn new(canvas_rect: Rect) -> Self {
        Self {
            canvas_rect,
            last_pointer_pos: None,
        }
    }

    /// Update the canvas rectangle (e.g. if window is resized)
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    fn local(&self, pos: Pos2) -> Pos2 {
        (pos - self.canvas_rect.min).to_pos2()
    }

    fn held_buttons(input: &egui::InputState) -> u8 {
        let mut held = 0;
        for (button, bit) in [
            (PointerButton::Primary, buttons::PRIMARY),
            (PointerButton::Secondary, buttons::SECONDARY),
            (PointerButton::Middle, buttons::MIDDLE),
        ] {
            if input.pointer.button_down(button) {
                held |= bit;
            }
        }
        held
    }

    /// Process raw egui input and generate our InputEvents
    pub fn process_input(&mut self, ctx: &Context) -> Vec<InputEvent> {
        let mut events = Vec::new();

        ctx.input(|input| {
            let pan_modifier = input.key_down(Key::Space);
            // Touch screens also emit emulated pointer events; keep the touch ones.
            let touching = input.any_touches();

            for event in &input.raw.events {
                match event {
                    egui::Event::Touch { id, phase, pos, force, .. } => {
                        let pointer = PointerEvent {
                            pointer_id: id.0,
                            pressure: force.unwrap_or(1.0),
                            pan_modifier,
                            ..PointerEvent::new(PointerType::Touch, self.local(*pos), 1.0)
                        };
                        events.push(match phase {
                            TouchPhase::Start => InputEvent::PointerDown(pointer),
                            TouchPhase::Move => InputEvent::PointerMove(pointer),
                            TouchPhase::End => InputEvent::PointerUp(pointer.with_buttons(0)),
                            TouchPhase::Cancel => InputEvent::PointerCancel(pointer.with_buttons(0)),
                        });
                    }
                    egui::Event::PointerMoved(pos) if !touching => {
                        self.last_pointer_pos = Some(*pos);
                        let pointer = PointerEvent::mouse(self.local(*pos))
                            .with_buttons(Self::held_buttons(input))
                            .with_pan_modifier(pan_modifier);
                        events.push(InputEvent::PointerMove(pointer));
                    }
                    egui::Event::PointerButton {
                        pos,
                        button,
                        pressed,
                        ..
                    } if !touching => {
                        let bit = match button {
                            PointerButton::Primary => buttons::PRIMARY,
                            PointerButton::Secondary => buttons::SECONDARY,
                            PointerButton::Middle => buttons::MIDDLE,
                            _ => continue,
                        };
                        // Middle drag pans like the modifier key
                        let pointer = PointerEvent::mouse(self.local(*pos))
                            .with_buttons(if *pressed { bit } else { 0 })
                            .with_pan_modifier(pan_modifier || bit == buttons::MIDDLE);
                        if !self.canvas_rect.contains(*pos) && *pressed {
                            continue;
                        }
                        events.push(if *pressed {
                            InputEvent::PointerDown(pointer)
                        } else {
                            InputEvent::PointerUp(pointer)
                        });
                    }
                    egui::Event::PointerGone => {
                        if let Some(pos) = self.last_pointer_pos.take() {
                            events.push(InputEvent::PointerLeave(
                                PointerEvent::mouse(self.local(pos)).with_buttons(0),
                            ));
                        }
                    }
                    _ => {}
                }
            }

            let scroll = input.raw_scroll_delta;
            if scroll.y != 0.0 {
                if let Some(pos) = input.pointer.hover_pos() {
                    if self.canvas_rect.contains(pos) {
                        events.push(InputEvent::Wheel {
                            pos: self.local(pos),
                            delta_y: -scroll.y * WHEEL_SCALE,
                        });
                    }
                }
            }
        });

        events
    }
}
