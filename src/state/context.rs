/// The session context: owns the device, camera, tools, compositor and the
/// in-flight operation, and runs the interaction state machine over them.
///
/// The `EditorContext` is created once per canvas session and torn down
/// with it. Nothing in it is global; the host passes it by reference into
/// its render loop.
///
/// # Input
///
/// Raw pointer, touch and wheel events go through [`EditorContext::handle_event`]:
/// - a wheel event zooms around the pointer (only from `Idle`)
/// - a pointer down with the pan modifier or middle button pans
/// - a second simultaneous touch cancels any stroke and starts a pinch;
///   a third ends the interaction without saving
/// - any other primary pointer down starts the active tool
/// - up, cancel and leave end the interaction, saving strokes
///
/// # Frames
///
/// The host calls [`EditorContext::tick`] once per frame. It flushes the
/// device, which signals readback fences, and recomposites when a camera,
/// tool or layer change requested a redraw.
///
/// # Example
///
/// ```rust,no_run
/// use egui::{Pos2, Vec2};
/// use stroke_canvas::gpu::Capabilities;
/// use stroke_canvas::input::{InputEvent, PointerEvent};
/// use stroke_canvas::state::EditorContext;
///
/// let mut ctx = EditorContext::new(Capabilities::default(), 640, 480, Vec2::new(640.0, 480.0))?;
/// ctx.handle_event(InputEvent::PointerDown(PointerEvent::pen(Pos2::new(10.0, 10.0), 0.8)))?;
/// ctx.handle_event(InputEvent::PointerMove(PointerEvent::pen(Pos2::new(60.0, 40.0), 0.9)))?;
/// ctx.handle_event(InputEvent::PointerUp(PointerEvent::pen(Pos2::new(60.0, 40.0), 0.9)))?;
/// ctx.tick(1.0 / 60.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
use egui::{Pos2, Vec2};

use super::InteractionState;
use crate::camera::Camera;
use crate::command::{Command, CommandError, CommandResult};
use crate::compositor::Compositor;
use crate::config::Preferences;
use crate::error::{LayerError, ReadbackError, RenderError, TransitionError};
use crate::event::{EditorEvent, EventBus};
use crate::gpu::{Capabilities, ColorDepth, Device, Readback};
use crate::input::{buttons, InputEvent, PointerEvent, PointerType, TouchTracker};
use crate::layer::LayerId;
use crate::operation::Operation;
use crate::scheduler::FrameScheduler;
use crate::stroke::Point;
use crate::tool::{PointOutcome, StrokeContext, Tool, ToolBox, ToolKind, ToolSetting};

#[derive(Debug)]
pub struct EditorContext {
    state: InteractionState,
    device: Device,
    camera: Camera,
    operation: Operation,
    tools: ToolBox,
    compositor: Compositor,
    scheduler: FrameScheduler,
    prefs: Preferences,
    /// Shared drawing color, RGB 0..=255
    color: [u8; 3],
    active_layer: LayerId,
    touches: TouchTracker,
    /// Pointer that started the current tool interaction
    active_pointer: Option<u64>,
    /// The event bus for broadcasting editor events
    pub event_bus: EventBus,
}

impl EditorContext {
    /// Creates the device and every tool, and a canvas of `width` x `height`
    /// pixels with one empty layer.
    ///
    /// # Errors
    ///
    /// Fails with [`RenderError::MissingCapability`] when the device has
    /// neither float nor half-float color buffers, or with
    /// [`RenderError::ResourceCreation`] when a surface or program cannot be
    /// created.
    pub fn new(capabilities: Capabilities, width: usize, height: usize, viewport: Vec2) -> Result<Self, RenderError> {
        Self::with_preferences(capabilities, width, height, viewport, Preferences::default())
    }

    pub fn with_preferences(
        capabilities: Capabilities,
        width: usize,
        height: usize,
        viewport: Vec2,
        prefs: Preferences,
    ) -> Result<Self, RenderError> {
        let device = Device::new(capabilities)?;
        let tools = ToolBox::new(&device)?;
        let mut compositor = Compositor::new(&device, width, height)?;
        let active_layer = compositor.ensure_layer(&device, None)?;

        let mut camera = Camera::new(viewport);
        camera.set_zoom_bounds(prefs.min_zoom, prefs.max_zoom);

        log::info!("canvas session started: {width}x{height}");
        Ok(Self {
            state: InteractionState::Idle,
            device,
            camera,
            operation: Operation::new(ToolKind::default()),
            tools,
            compositor,
            scheduler: FrameScheduler::new(prefs.idle_pause_ticks),
            prefs,
            color: [0, 0, 0],
            active_layer,
            touches: TouchTracker::new(),
            active_pointer: None,
            event_bus: EventBus::new(),
        })
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn tools(&self) -> &ToolBox {
        &self.tools
    }

    pub fn active_tool(&self) -> ToolKind {
        self.operation.tool()
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Layer stack access for the host, e.g. to add layers or change blend modes.
    pub fn compositor_mut(&mut self) -> &mut Compositor {
        self.scheduler.request_redraw();
        &mut self.compositor
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    /// Creates a layer on top of the stack and makes it active.
    pub fn add_layer(&mut self, name: &str) -> Result<LayerId, RenderError> {
        let id = self.compositor.add_layer(&self.device, name)?;
        self.active_layer = id;
        self.scheduler.request_redraw();
        Ok(id)
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        if viewport != self.camera.viewport() {
            self.camera.set_viewport(viewport);
            self.scheduler.request_redraw();
        }
    }

    /// Attempts to transition to a new state, validating the transition and emitting
    /// an `InteractionChanged` event.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::InvalidStateTransition` if the requested transition
    /// is not allowed from the current state.
    pub fn transition_to(&mut self, new_state: InteractionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(&new_state) {
            return Err(TransitionError::InvalidStateTransition {
                from: self.state.name(),
                to: new_state.name(),
            });
        }
        let old = self.state;
        self.state = new_state;
        log::debug!("interaction {old} -> {new_state}");
        self.event_bus.emit(EditorEvent::InteractionChanged { old, new: new_state });
        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> CommandResult {
        log::debug!("executing {command:?}");
        command.execute(self)
    }

    /// Feeds one raw input event through the interaction state machine.
    pub fn handle_event(&mut self, event: InputEvent) -> CommandResult {
        self.scheduler.note_input();
        match event {
            InputEvent::Wheel { pos, delta_y } => self.on_wheel(pos, delta_y),
            InputEvent::PointerDown(e) => self.on_pointer_down(e),
            InputEvent::PointerMove(e) => self.on_pointer_move(e),
            InputEvent::PointerUp(e) | InputEvent::PointerCancel(e) | InputEvent::PointerLeave(e) => {
                self.on_pointer_end(e)
            }
        }
    }

    fn on_wheel(&mut self, pos: Pos2, delta_y: f32) -> CommandResult {
        if !self.state.is_idle() {
            log::trace!("wheel ignored during {}", self.state);
            return Ok(());
        }
        self.transition_to(InteractionState::Zoom)?;
        self.camera.wheel_zoom(pos, delta_y);
        self.camera_changed();
        self.transition_to(InteractionState::Idle)?;
        Ok(())
    }

    fn on_pointer_down(&mut self, e: PointerEvent) -> CommandResult {
        if e.pointer_type == PointerType::Touch {
            let count = self.touches.down(e.pointer_id, e.pos);
            if count >= 3 {
                log::debug!("third touch, abandoning interaction");
                return self.end_interaction(false);
            }
            if count == 2 {
                if !self.state.is_idle() {
                    self.end_interaction(false)?;
                }
                self.touches.begin_gesture();
                self.transition_to(InteractionState::TouchPanZoom)?;
                return Ok(());
            }
        }

        if !self.state.is_idle() {
            return Ok(());
        }
        if e.pan_modifier || e.buttons & buttons::MIDDLE != 0 {
            self.transition_to(InteractionState::Pan { last: e.pos })?;
            return Ok(());
        }
        if e.buttons & buttons::PRIMARY != 0 {
            return self.begin_tool(&e);
        }
        Ok(())
    }

    fn begin_tool(&mut self, e: &PointerEvent) -> CommandResult {
        let tool = self.operation.tool();
        let layer = self.active_layer;
        if self.compositor.layer(layer).is_none() {
            return Err(LayerError::UnknownLayer(layer).into());
        }

        self.operation.reset();
        self.transition_to(InteractionState::UseTool { tool })?;
        self.active_pointer = Some(e.pointer_id);

        let stroke = self
            .tools
            .get(tool)
            .and_then(|t| t.as_stroke_tool())
            .map(|t| (t.opacity(), t.writes_live()));
        if let Some((opacity, live)) = stroke {
            self.compositor.begin_stroke(layer, opacity, live)?;
            self.event_bus.emit(EditorEvent::StrokeStarted { layer });
        }
        self.feed(e)
    }

    fn on_pointer_move(&mut self, e: PointerEvent) -> CommandResult {
        if e.pointer_type == PointerType::Touch {
            self.touches.moved(e.pointer_id, e.pos);
        }
        match self.state {
            InteractionState::Pan { last } => {
                self.camera.pan_by(e.pos - last);
                self.state = InteractionState::Pan { last: e.pos };
                self.camera_changed();
            }
            InteractionState::TouchPanZoom => {
                if let Some(update) = self.touches.update() {
                    self.camera.pan_by(update.pan);
                    let zoom = self.camera.zoom() * update.scale;
                    self.camera.zoom_at(update.anchor, zoom);
                    self.camera_changed();
                }
            }
            InteractionState::UseTool { .. } => {
                if self.active_pointer == Some(e.pointer_id) {
                    self.feed(&e)?;
                }
            }
            InteractionState::Idle | InteractionState::Zoom => {}
        }
        Ok(())
    }

    fn on_pointer_end(&mut self, e: PointerEvent) -> CommandResult {
        let remaining = if e.pointer_type == PointerType::Touch {
            self.touches.up(e.pointer_id)
        } else {
            0
        };
        match self.state {
            InteractionState::UseTool { .. } => {
                if self.active_pointer == Some(e.pointer_id) {
                    self.end_interaction(true)?;
                }
            }
            InteractionState::Pan { .. } => self.end_interaction(false)?,
            InteractionState::TouchPanZoom => {
                if remaining < 2 {
                    self.end_interaction(false)?;
                }
            }
            InteractionState::Idle | InteractionState::Zoom => {}
        }
        Ok(())
    }

    /// Runs every sample of a pointer event through the sampling pipeline
    /// in temporal order.
    fn feed(&mut self, e: &PointerEvent) -> CommandResult {
        let tool = self.operation.tool();
        for sample in e.samples() {
            let world = self.camera.screen_to_world(sample.pos);
            let dynamics = self
                .tools
                .get(tool)
                .and_then(|t| t.as_stroke_tool())
                .map(|t| t.dynamics(&self.prefs));
            let committed = self.operation.prepare(
                world,
                sample.pressure,
                e.pointer_type,
                &self.prefs,
                self.camera.zoom(),
                dynamics.as_ref(),
            );
            match (committed, dynamics) {
                (Some(_), Some(_)) => self.draw_pending(),
                (Some(point), None) => self.use_point_tool(&point)?,
                (None, _) => {}
            }
        }
        Ok(())
    }

    /// Stamps the stroke added since the last draw when the operation is ready.
    fn draw_pending(&mut self) {
        if !self.operation.is_ready_to_draw() {
            return;
        }
        let Some(tool) = self
            .tools
            .get_mut(self.operation.tool())
            .and_then(|t| t.as_stroke_tool_mut())
        else {
            return;
        };
        let Some(target) = self.compositor.stroke_surface() else {
            return;
        };
        let (points, cursor) = self.operation.draw_parts();
        let output = tool.draw(
            points,
            cursor,
            StrokeContext {
                prefs: &self.prefs,
                color: self.color,
                target,
            },
        );
        self.compositor.mark_stroke_dirty(output.dirty);
        self.operation.finish_draw(output.stamps);
        self.scheduler.request_redraw();
    }

    fn use_point_tool(&mut self, point: &Point) -> CommandResult {
        let Some(tool) = self
            .tools
            .get_mut(self.operation.tool())
            .and_then(|t| t.as_point_tool_mut())
        else {
            return Ok(());
        };
        let outcome = tool.use_at(point, &mut self.compositor, self.active_layer, self.color)?;
        self.operation.finish_draw(Vec::new());
        match outcome {
            PointOutcome::Picked(color) => {
                self.color = color;
                self.event_bus.emit(EditorEvent::ColorPicked(color));
            }
            PointOutcome::Filled { layer, region: Some(_) } => {
                self.event_bus.emit(EditorEvent::StrokeCommitted { layer });
                self.scheduler.request_redraw();
            }
            PointOutcome::Filled { layer, region: None } => log::trace!("fill left layer {layer} unchanged"),
            PointOutcome::Missed => log::trace!("point tool missed the canvas at {:?}", point.pos),
        }
        Ok(())
    }

    /// Ends the active interaction and returns to `Idle`.
    ///
    /// With `save`, an in-flight stroke is committed to its layer and an
    /// undo snapshot pushed; otherwise it is discarded and the layer is left
    /// exactly as it was before the stroke.
    pub fn end_interaction(&mut self, save: bool) -> CommandResult {
        if let InteractionState::UseTool { tool } = self.state {
            if tool.is_stroke() {
                if save {
                    self.operation.finish_stroke();
                }
                self.draw_pending();
                if save {
                    if let Some(layer) = self.compositor.commit_stroke()? {
                        self.event_bus.emit(EditorEvent::StrokeCommitted { layer });
                    }
                } else if let Some(layer) = self.compositor.stroke_target() {
                    self.compositor.cancel_stroke();
                    self.event_bus.emit(EditorEvent::StrokeCancelled { layer });
                }
            }
            if let Some(t) = self.tools.get_mut(tool) {
                t.reset();
            }
        }
        self.operation.reset();
        self.active_pointer = None;
        if !self.state.is_idle() {
            self.transition_to(InteractionState::Idle)?;
        }
        self.scheduler.request_redraw();
        Ok(())
    }

    fn camera_changed(&mut self) {
        self.scheduler.request_redraw();
        self.event_bus.emit(EditorEvent::CameraChanged {
            zoom: self.camera.zoom(),
            position: self.camera.position(),
        });
    }

    pub(crate) fn select_tool(&mut self, tool: ToolKind) -> CommandResult {
        if self.state.is_using_tool() {
            self.end_interaction(true)?;
        }
        let old = self.operation.tool();
        self.operation.set_tool(tool);
        if let Some(t) = self.tools.get_mut(tool) {
            t.switch_to();
        }
        if old != tool {
            self.event_bus.emit(EditorEvent::ToolChanged { old, new: tool });
        }
        self.scheduler.request_redraw();
        Ok(())
    }

    pub(crate) fn update_tool_setting(&mut self, tool: ToolKind, setting: ToolSetting) -> CommandResult {
        let t = self
            .tools
            .get_mut(tool)
            .ok_or(CommandError::InvalidState("tool is not loaded"))?;
        t.apply_setting(setting)?;
        self.scheduler.request_redraw();
        Ok(())
    }

    pub(crate) fn set_active_layer(&mut self, layer: LayerId) -> CommandResult {
        if self.compositor.layer(layer).is_none() {
            return Err(LayerError::UnknownLayer(layer).into());
        }
        self.active_layer = layer;
        Ok(())
    }

    pub(crate) fn set_color(&mut self, color: [u8; 3]) {
        self.color = color;
    }

    pub(crate) fn set_preferences(&mut self, prefs: Preferences) -> CommandResult {
        prefs.validate()?;
        self.camera.set_zoom_bounds(prefs.min_zoom, prefs.max_zoom);
        self.scheduler.set_idle_pause_ticks(prefs.idle_pause_ticks);
        self.prefs = prefs;
        self.scheduler.request_redraw();
        Ok(())
    }

    pub(crate) fn undo(&mut self) -> CommandResult {
        if self.state.is_using_tool() {
            return Err(CommandError::InvalidState("cannot undo while a stroke is in flight"));
        }
        let layer = self.active_layer;
        if self.compositor.undo(layer)? {
            self.event_bus.emit(EditorEvent::LayerUndone { layer });
            self.scheduler.request_redraw();
        } else {
            log::warn!("nothing to undo on layer {layer}");
        }
        Ok(())
    }

    pub(crate) fn redo(&mut self) -> CommandResult {
        if self.state.is_using_tool() {
            return Err(CommandError::InvalidState("cannot redo while a stroke is in flight"));
        }
        let layer = self.active_layer;
        if self.compositor.redo(layer)? {
            self.event_bus.emit(EditorEvent::LayerRedone { layer });
            self.scheduler.request_redraw();
        } else {
            log::warn!("nothing to redo on layer {layer}");
        }
        Ok(())
    }

    /// Runs one frame. Returns true when the framebuffer was recomposited.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.device.flush();
        self.draw_pending();
        self.scheduler.advance_idle(dt);
        if !self.scheduler.take_frame() {
            return false;
        }
        let stale = self.compositor.is_stale();
        self.compositor.composite();
        stale
    }

    /// Starts an asynchronous readback of the composited image, e.g. for export.
    pub fn request_readback(&mut self, depth: ColorDepth) -> Readback {
        self.compositor.request_readback(&mut self.device, depth)
    }

    /// Starts an asynchronous readback of one layer, e.g. for its thumbnail.
    pub fn request_layer_readback(&mut self, layer: LayerId, depth: ColorDepth) -> Result<Readback, LayerError> {
        self.compositor.request_layer_readback(&mut self.device, layer, depth)
    }

    /// Reports a failed readback to the UI. Stroke state is left untouched.
    pub fn report_readback_failure(&self, error: ReadbackError) {
        log::warn!("readback failed: {error}");
        self.event_bus.emit(EditorEvent::ReadbackFailed(error));
    }

    /// Simulates a lost device, failing every pending readback.
    pub fn lose_device(&mut self) {
        log::warn!("device lost");
        self.device.lose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use crate::input::PointerSample;

    fn context() -> EditorContext {
        let prefs = Preferences {
            position_filtering: 1.0,
            pressure_filtering: 1.0,
            mouse_smoothing: 0.0,
            ..Preferences::default()
        };
        EditorContext::with_preferences(Capabilities::default(), 64, 64, Vec2::new(64.0, 64.0), prefs).unwrap()
    }

    fn down(pos: Pos2) -> InputEvent {
        InputEvent::PointerDown(PointerEvent::pen(pos, 1.0))
    }

    fn moved(pos: Pos2) -> InputEvent {
        InputEvent::PointerMove(PointerEvent::pen(pos, 1.0))
    }

    fn up(pos: Pos2) -> InputEvent {
        InputEvent::PointerUp(PointerEvent::pen(pos, 1.0))
    }

    #[test]
    fn test_missing_capability_is_fatal() {
        let caps = Capabilities {
            float_color_buffer: false,
            half_float_color_buffer: false,
            ..Capabilities::default()
        };
        let err = EditorContext::new(caps, 8, 8, Vec2::splat(8.0)).unwrap_err();
        assert!(matches!(err, RenderError::MissingCapability(_)));
    }

    #[test]
    fn test_stroke_lifecycle_emits_events() {
        let mut ctx = context();
        let log = EventLog::new();
        ctx.event_bus.subscribe(Box::new(log.clone()));
        let layer = ctx.active_layer();

        ctx.handle_event(down(Pos2::new(10.0, 10.0))).unwrap();
        assert!(ctx.state().is_using_tool());
        ctx.handle_event(moved(Pos2::new(30.0, 10.0))).unwrap();
        ctx.handle_event(up(Pos2::new(30.0, 10.0))).unwrap();
        assert!(ctx.state().is_idle());

        let events = log.events();
        assert!(events.contains(&EditorEvent::StrokeStarted { layer }));
        assert!(events.contains(&EditorEvent::StrokeCommitted { layer }));
        assert_eq!(ctx.compositor().layer(layer).unwrap().history().undo_len(), 1);
    }

    #[test]
    fn test_pan_moves_camera() {
        let mut ctx = context();
        let start = Pos2::new(20.0, 20.0);
        ctx.handle_event(InputEvent::PointerDown(PointerEvent::mouse(start).with_pan_modifier(true)))
            .unwrap();
        assert!(matches!(ctx.state(), InteractionState::Pan { .. }));
        ctx.handle_event(InputEvent::PointerMove(PointerEvent::mouse(Pos2::new(30.0, 25.0))))
            .unwrap();
        assert_eq!(ctx.camera().position(), Pos2::new(-10.0, -5.0));
        ctx.handle_event(InputEvent::PointerUp(PointerEvent::mouse(Pos2::new(30.0, 25.0))))
            .unwrap();
        assert!(ctx.state().is_idle());
        assert!(ctx.compositor().layer(ctx.active_layer()).unwrap().bounding_box().is_none());
    }

    #[test]
    fn test_wheel_ignored_while_drawing() {
        let mut ctx = context();
        ctx.handle_event(down(Pos2::new(5.0, 5.0))).unwrap();
        ctx.handle_event(InputEvent::Wheel {
            pos: Pos2::new(5.0, 5.0),
            delta_y: -100.0,
        })
        .unwrap();
        assert_eq!(ctx.camera().zoom(), 1.0);
    }

    #[test]
    fn test_coalesced_samples_are_all_used() {
        let mut ctx = context();
        ctx.handle_event(down(Pos2::new(0.0, 0.0))).unwrap();
        let samples = (1..=4)
            .map(|i| PointerSample {
                pos: Pos2::new(i as f32 * 10.0, 0.0),
                pressure: 1.0,
            })
            .collect();
        let event = PointerEvent::pen(Pos2::new(40.0, 0.0), 1.0).with_coalesced(samples);
        ctx.handle_event(InputEvent::PointerMove(event)).unwrap();
        // down stamps once, then four 10px segments at spacing 5
        assert!(ctx.operation().stamp_count() >= 1 + 4 * 2);
    }

    #[test]
    fn test_undo_rejected_mid_stroke() {
        let mut ctx = context();
        ctx.handle_event(down(Pos2::new(5.0, 5.0))).unwrap();
        let err = ctx.execute(Command::Undo).unwrap_err();
        assert!(matches!(err, CommandError::InvalidState(_)));
    }

    #[test]
    fn test_tool_switch_mid_stroke_commits() {
        let mut ctx = context();
        let layer = ctx.active_layer();
        ctx.handle_event(down(Pos2::new(5.0, 5.0))).unwrap();
        ctx.execute(Command::SelectTool(ToolKind::Pencil)).unwrap();
        assert!(ctx.state().is_idle());
        assert_eq!(ctx.active_tool(), ToolKind::Pencil);
        assert!(ctx.compositor().layer(layer).unwrap().bounding_box().is_some());
    }

    #[test]
    fn test_eyedropper_picks_color() {
        let mut ctx = context();
        ctx.execute(Command::SetColor([200, 10, 10])).unwrap();
        ctx.execute(Command::SelectTool(ToolKind::Fill)).unwrap();
        ctx.handle_event(down(Pos2::new(3.0, 3.0))).unwrap();
        ctx.handle_event(up(Pos2::new(3.0, 3.0))).unwrap();

        ctx.execute(Command::SetColor([0, 0, 0])).unwrap();
        ctx.execute(Command::SelectTool(ToolKind::Eyedropper)).unwrap();
        ctx.handle_event(down(Pos2::new(3.0, 3.0))).unwrap();
        assert_eq!(ctx.color(), [200, 10, 10]);
    }

    #[test]
    fn test_tick_composites_once_per_request() {
        let mut ctx = context();
        assert!(ctx.tick(0.016));
        assert!(!ctx.tick(0.016));
        ctx.handle_event(down(Pos2::new(5.0, 5.0))).unwrap();
        assert!(ctx.tick(0.016));
    }
}
