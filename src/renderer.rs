use egui::{Color32, ColorImage, Painter, Pos2, Rect, Stroke};

use crate::camera::Camera;
use crate::gpu::Surface;
use crate::layer::LayerId;
use crate::state::EditorContext;
use crate::texture_manager::{TextureKey, TextureManager};

/// Converts a premultiplied surface into an egui image without any gamma
/// conversion; surface channels already hold display values.
pub fn surface_to_color_image(surface: &Surface) -> ColorImage {
    let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    let pixels = surface
        .pixels()
        .iter()
        .map(|p| Color32::from_rgba_premultiplied(to_byte(p.r()), to_byte(p.g()), to_byte(p.b()), to_byte(p.a())))
        .collect();
    ColorImage {
        size: [surface.width(), surface.height()],
        pixels,
    }
}

/// Screen rectangle covered by the canvas, inside a widget at `rect`
pub fn canvas_screen_rect(camera: &Camera, canvas_size: [usize; 2], rect: Rect) -> Rect {
    let offset = rect.min.to_vec2();
    let min = camera.world_to_screen(Pos2::ZERO) + offset;
    let max = camera.world_to_screen(Pos2::new(canvas_size[0] as f32, canvas_size[1] as f32)) + offset;
    Rect::from_min_max(min, max)
}

/// Draws the composited canvas into the UI at the camera transform.
#[derive(Debug)]
pub struct Renderer {
    textures: TextureManager,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            textures: TextureManager::new(16),
        }
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Renders the current frame
    ///
    /// Args:
    ///     ctx (egui::Context): The egui context for the current frame
    ///     painter (egui::Painter): The painter to draw with
    ///     rect (egui::Rect): The canvas widget rectangle
    ///     editor (EditorContext): The session whose framebuffer is shown
    pub fn render(&mut self, ctx: &egui::Context, painter: &Painter, rect: Rect, editor: &EditorContext) {
        self.textures.begin_frame();
        painter.rect_filled(rect, 0.0, Color32::from_gray(48));

        let compositor = editor.compositor();
        let framebuffer = compositor.framebuffer();
        let texture = self.textures.get_or_create_texture(
            TextureKey::Framebuffer,
            compositor.version(),
            || Ok(surface_to_color_image(framebuffer)),
            ctx,
        );
        let canvas = canvas_screen_rect(editor.camera(), compositor.size(), rect);
        match texture {
            Ok(id) => {
                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                painter.image(id, canvas, uv, Color32::WHITE);
            }
            Err(err) => log::warn!("failed to upload canvas texture: {err}"),
        }
        painter.rect_stroke(canvas, 0.0, Stroke::new(1.0, Color32::from_gray(96)));
    }

    /// Preview texture of one layer, re-uploaded when the layer changes
    pub fn layer_preview(&mut self, ctx: &egui::Context, editor: &EditorContext, layer: LayerId) -> Option<egui::TextureId> {
        let layer = editor.compositor().layer(layer)?;
        self.textures
            .get_or_create_texture(
                TextureKey::Layer(layer.id),
                layer.version(),
                || Ok(surface_to_color_image(layer.surface())),
                ctx,
            )
            .ok()
    }
}
