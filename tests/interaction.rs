use egui::{Pos2, Vec2};
use stroke_canvas::event::{EditorEvent, EventLog};
use stroke_canvas::gpu::Capabilities;
use stroke_canvas::input::{InputEvent, PointerEvent};
use stroke_canvas::state::{EditorContext, InteractionState};

fn context() -> EditorContext {
    EditorContext::new(Capabilities::default(), 800, 600, Vec2::new(800.0, 600.0)).unwrap()
}

#[test]
fn test_wheel_zoom_keeps_point_under_cursor() {
    let mut ctx = context();
    let anchor = Pos2::new(400.0, 300.0);
    let before = ctx.camera().screen_to_world(anchor);

    ctx.handle_event(InputEvent::Wheel {
        pos: anchor,
        delta_y: -100.0,
    })
    .unwrap();

    assert!((ctx.camera().zoom() - 2f32.powf(0.1)).abs() < 1e-5);
    let after = ctx.camera().screen_to_world(anchor);
    assert!(before.distance(after) < 1e-3, "{before:?} drifted to {after:?}");
    assert!(ctx.state().is_idle());
}

#[test]
fn test_three_touches_discard_stroke() {
    let mut ctx = context();
    let layer = ctx.active_layer();
    let log = EventLog::new();
    ctx.event_bus.subscribe(Box::new(log.clone()));

    ctx.handle_event(InputEvent::PointerDown(PointerEvent::touch(1, Pos2::new(100.0, 100.0))))
        .unwrap();
    assert!(ctx.state().is_using_tool());
    ctx.handle_event(InputEvent::PointerMove(PointerEvent::touch(1, Pos2::new(160.0, 120.0))))
        .unwrap();
    ctx.handle_event(InputEvent::PointerDown(PointerEvent::touch(2, Pos2::new(300.0, 300.0))))
        .unwrap();
    ctx.handle_event(InputEvent::PointerDown(PointerEvent::touch(3, Pos2::new(400.0, 300.0))))
        .unwrap();

    assert!(ctx.state().is_idle());
    let layer_state = ctx.compositor().layer(layer).unwrap();
    assert!(layer_state.bounding_box().is_none());
    assert_eq!(layer_state.history().undo_len(), 0);

    let events = log.events();
    assert!(events.contains(&EditorEvent::StrokeCancelled { layer }));
    assert!(!events.contains(&EditorEvent::StrokeCommitted { layer }));
}

#[test]
fn test_pinch_zooms_by_finger_spread() {
    let mut ctx = context();

    ctx.handle_event(InputEvent::PointerDown(PointerEvent::touch(1, Pos2::new(300.0, 300.0))))
        .unwrap();
    ctx.handle_event(InputEvent::PointerDown(PointerEvent::touch(2, Pos2::new(400.0, 300.0))))
        .unwrap();
    assert_eq!(ctx.state(), InteractionState::TouchPanZoom);

    ctx.handle_event(InputEvent::PointerMove(PointerEvent::touch(2, Pos2::new(500.0, 300.0))))
        .unwrap();
    assert!((ctx.camera().zoom() - 2.0).abs() < 1e-3);

    ctx.handle_event(InputEvent::PointerUp(PointerEvent::touch(2, Pos2::new(500.0, 300.0))))
        .unwrap();
    assert!(ctx.state().is_idle());
    ctx.handle_event(InputEvent::PointerUp(PointerEvent::touch(1, Pos2::new(300.0, 300.0))))
        .unwrap();
    assert!(ctx.state().is_idle());
    assert!(ctx.compositor().layer(ctx.active_layer()).unwrap().bounding_box().is_none());
}

#[test]
fn test_middle_button_pans_without_drawing() {
    let mut ctx = context();
    let middle = stroke_canvas::input::buttons::MIDDLE;

    ctx.handle_event(InputEvent::PointerDown(
        PointerEvent::mouse(Pos2::new(50.0, 50.0)).with_buttons(middle),
    ))
    .unwrap();
    ctx.handle_event(InputEvent::PointerMove(
        PointerEvent::mouse(Pos2::new(80.0, 90.0)).with_buttons(middle),
    ))
    .unwrap();
    assert_eq!(ctx.camera().position(), Pos2::new(-30.0, -40.0));

    ctx.handle_event(InputEvent::PointerUp(PointerEvent::mouse(Pos2::new(80.0, 90.0))))
        .unwrap();
    assert!(ctx.state().is_idle());
    assert!(ctx.compositor().layer(ctx.active_layer()).unwrap().bounding_box().is_none());
}
