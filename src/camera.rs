use egui::{Pos2, Vec2};
use glam::Mat3;

/// Wheel delta to zoom exponent: `zoom' = zoom * 2^(-delta_y * WHEEL_ZOOM_RATE)`
pub const WHEEL_ZOOM_RATE: f32 = 0.001;

/// Pan/zoom transform between screen, world and clip space.
///
/// `position` is the world point shown at the top-left corner of the
/// viewport. Matrices are rebuilt from `position` and `zoom` every time
/// either changes.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Pos2,
    zoom: f32,
    viewport: Vec2,
    min_zoom: f32,
    max_zoom: f32,
    view: Mat3,
    inverse_view: Mat3,
    view_projection: Mat3,
    inverse_view_projection: Mat3,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::new(800.0, 600.0))
    }
}

fn to_glam(p: Pos2) -> glam::Vec2 {
    glam::Vec2::new(p.x, p.y)
}

fn from_glam(v: glam::Vec2) -> Pos2 {
    Pos2::new(v.x, v.y)
}

impl Camera {
    pub fn new(viewport: Vec2) -> Self {
        let mut camera = Self {
            position: Pos2::ZERO,
            zoom: 1.0,
            viewport,
            min_zoom: 0.05,
            max_zoom: 64.0,
            view: Mat3::IDENTITY,
            inverse_view: Mat3::IDENTITY,
            view_projection: Mat3::IDENTITY,
            inverse_view_projection: Mat3::IDENTITY,
        };
        camera.recompute();
        camera
    }

    pub fn position(&self) -> Pos2 {
        self.position
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn view_matrix(&self) -> Mat3 {
        self.view
    }

    pub fn view_projection_matrix(&self) -> Mat3 {
        self.view_projection
    }

    pub fn inverse_view_projection_matrix(&self) -> Mat3 {
        self.inverse_view_projection
    }

    pub fn set_zoom_bounds(&mut self, min_zoom: f32, max_zoom: f32) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.set_zoom(self.zoom);
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        if viewport.x > 0.0 && viewport.y > 0.0 && viewport != self.viewport {
            self.viewport = viewport;
            self.recompute();
        }
    }

    pub fn set_position(&mut self, position: Pos2) {
        self.position = position;
        self.recompute();
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.view = Mat3::from_scale(glam::Vec2::splat(self.zoom))
            * Mat3::from_translation(-to_glam(self.position));
        self.inverse_view = self.view.inverse();

        // Screen pixels (y down) to clip space (y up)
        let projection = Mat3::from_translation(glam::Vec2::new(-1.0, 1.0))
            * Mat3::from_scale(glam::Vec2::new(2.0 / self.viewport.x, -2.0 / self.viewport.y));
        self.view_projection = projection * self.view;
        self.inverse_view_projection = self.view_projection.inverse();
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        from_glam(self.inverse_view.transform_point2(to_glam(screen)))
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        from_glam(self.view.transform_point2(to_glam(world)))
    }

    pub fn world_to_clip(&self, world: Pos2) -> Pos2 {
        from_glam(self.view_projection.transform_point2(to_glam(world)))
    }

    pub fn clip_to_world(&self, clip: Pos2) -> Pos2 {
        from_glam(self.inverse_view_projection.transform_point2(to_glam(clip)))
    }

    /// Moves the camera so content follows a screen-space drag.
    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.position -= screen_delta / self.zoom;
        self.recompute();
    }

    /// Changes zoom while keeping the world point under `anchor` fixed.
    pub fn zoom_at(&mut self, anchor: Pos2, zoom: f32) {
        let before = self.screen_to_world(anchor);
        self.set_zoom(zoom);
        let after = self.screen_to_world(anchor);
        self.position += before - after;
        self.recompute();
    }

    /// Applies a wheel delta anchored at the pointer.
    pub fn wheel_zoom(&mut self, anchor: Pos2, delta_y: f32) {
        let zoom = self.zoom * 2f32.powf(-delta_y * WHEEL_ZOOM_RATE);
        self.zoom_at(anchor, zoom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_at_default() {
        let camera = Camera::new(Vec2::new(200.0, 100.0));
        let p = Pos2::new(37.0, 12.0);
        assert_eq!(camera.world_to_screen(p), p);
        assert_eq!(camera.screen_to_world(p), p);
    }

    #[test]
    fn test_clip_space_corners() {
        let camera = Camera::new(Vec2::new(200.0, 100.0));
        let top_left = camera.world_to_clip(Pos2::ZERO);
        let bottom_right = camera.world_to_clip(Pos2::new(200.0, 100.0));
        assert!((top_left - Pos2::new(-1.0, 1.0)).length() < 1e-5);
        assert!((bottom_right - Pos2::new(1.0, -1.0)).length() < 1e-5);
        let back = camera.clip_to_world(bottom_right);
        assert!((back - Pos2::new(200.0, 100.0)).length() < 1e-3);
    }

    #[test]
    fn test_pan_divides_by_zoom() {
        let mut camera = Camera::default();
        camera.set_zoom(2.0);
        camera.pan_by(Vec2::new(10.0, -4.0));
        assert_eq!(camera.position(), Pos2::new(-5.0, 2.0));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut camera = Camera::default();
        camera.set_position(Pos2::new(30.0, -12.0));
        let anchor = Pos2::new(250.0, 90.0);
        let before = camera.screen_to_world(anchor);
        camera.zoom_at(anchor, 3.5);
        let after = camera.screen_to_world(anchor);
        assert!((before - after).length() < 1e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.set_zoom_bounds(0.5, 4.0);
        camera.set_zoom(100.0);
        assert_eq!(camera.zoom(), 4.0);
    }
}
