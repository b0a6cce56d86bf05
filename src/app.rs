use std::collections::HashMap;

use futures::FutureExt;

use crate::command::Command;
use crate::config::Preferences;
use crate::event::ThumbnailInvalidator;
use crate::gpu::{Capabilities, ColorDepth, PixelBuffer, Readback};
use crate::input::InputHandler;
use crate::layer::LayerId;
use crate::renderer::Renderer;
use crate::state::EditorContext;
use crate::tool::{ToolKind, ToolSetting};
use crate::util::time::FrameClock;
use crate::worker::{ExportRequest, ExportResponse, ThumbnailRequest, ThumbnailResponse, THUMBNAIL_SIZE};

const CANVAS_SIZE: [usize; 2] = [1024, 768];

/// Where encoding jobs run: worker threads on native, inline on the web
enum Encoders {
    #[cfg(not(target_arch = "wasm32"))]
    Threads {
        thumbnails: crate::worker::ThumbnailWorker,
        exports: crate::worker::ExportWorker,
    },
    Inline {
        thumbnails: Vec<ThumbnailResponse>,
        exports: Vec<ExportResponse>,
    },
}

impl Encoders {
    fn new() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            match (
                crate::worker::spawn_thumbnail_worker(THUMBNAIL_SIZE),
                crate::worker::spawn_export_worker(),
            ) {
                (Ok(thumbnails), Ok(exports)) => return Encoders::Threads { thumbnails, exports },
                (Err(err), _) | (_, Err(err)) => log::warn!("encoding inline, no worker threads: {err}"),
            }
        }
        Encoders::Inline {
            thumbnails: Vec::new(),
            exports: Vec::new(),
        }
    }

    fn thumbnail(&mut self, request: ThumbnailRequest) {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Encoders::Threads { thumbnails, .. } => {
                if let Err(err) = thumbnails.send(request) {
                    log::warn!("thumbnail request dropped: {err}");
                }
            }
            Encoders::Inline { thumbnails, .. } => {
                thumbnails.push(crate::worker::make_thumbnail(request, THUMBNAIL_SIZE));
            }
        }
    }

    fn export(&mut self, request: ExportRequest) {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Encoders::Threads { exports, .. } => {
                if let Err(err) = exports.send(request) {
                    log::warn!("export request dropped: {err}");
                }
            }
            Encoders::Inline { exports, .. } => exports.push(crate::worker::export_png(request)),
        }
    }

    fn finished(&mut self) -> (Vec<ThumbnailResponse>, Vec<ExportResponse>) {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Encoders::Threads { thumbnails, exports } => (
                std::iter::from_fn(|| thumbnails.try_recv()).collect(),
                std::iter::from_fn(|| exports.try_recv()).collect(),
            ),
            Encoders::Inline { thumbnails, exports } => (std::mem::take(thumbnails), std::mem::take(exports)),
        }
    }
}

/// A readback waiting for its fence
enum PendingReadback {
    Thumbnail(LayerId, Readback),
    Export(Readback),
}

/// Minimal eframe host around an [`EditorContext`].
pub struct PaintApp {
    editor: Result<EditorContext, String>,
    input: InputHandler,
    renderer: Renderer,
    clock: FrameClock,
    encoders: Encoders,
    readbacks: Vec<PendingReadback>,
    invalidator: ThumbnailInvalidator,
    /// Latest PNG data URL per layer
    thumbnails: HashMap<LayerId, String>,
    status: Option<String>,
}

impl PaintApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let prefs: Preferences = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .filter(|prefs: &Preferences| prefs.validate().is_ok())
            .unwrap_or_default();
        let [width, height] = CANVAS_SIZE;
        let viewport = egui::vec2(width as f32, height as f32);

        let editor = EditorContext::with_preferences(Capabilities::default(), width, height, viewport, prefs)
            .map_err(|err| {
                log::error!("cannot start canvas: {err}");
                err.to_string()
            });
        let invalidator = ThumbnailInvalidator::new();
        if let Ok(editor) = &editor {
            editor.event_bus.subscribe(Box::new(invalidator.clone()));
        }

        Self {
            editor,
            input: InputHandler::new(egui::Rect::NOTHING),
            renderer: Renderer::new(),
            clock: FrameClock::new(),
            encoders: Encoders::new(),
            readbacks: Vec::new(),
            invalidator,
            thumbnails: HashMap::new(),
            status: None,
        }
    }

    fn tool_strip(ui: &mut egui::Ui, editor: &mut EditorContext, status: &mut Option<String>) -> bool {
        let mut export = false;
        ui.horizontal_wrapped(|ui| {
            let active = editor.active_tool();
            for kind in ToolKind::all() {
                if ui.selectable_label(active == *kind, kind.to_string()).clicked() {
                    run(editor, Command::SelectTool(*kind), status);
                }
            }
            ui.separator();

            let [r, g, b] = editor.color();
            let mut color = egui::Color32::from_rgb(r, g, b);
            if egui::color_picker::color_edit_button_srgba(ui, &mut color, egui::color_picker::Alpha::Opaque).changed() {
                run(editor, Command::SetColor([color.r(), color.g(), color.b()]), status);
            }

            if let Some(mut size) = current_size(editor) {
                if ui.add(egui::Slider::new(&mut size, 1.0..=100.0).text("size")).changed() {
                    let tool = editor.active_tool();
                    run(editor, Command::UpdateToolSetting { tool, setting: ToolSetting::Size(size) }, status);
                }
            }
            ui.separator();

            if ui.button("Undo").clicked() {
                run(editor, Command::Undo, status);
            }
            if ui.button("Redo").clicked() {
                run(editor, Command::Redo, status);
            }
            if ui.button("New layer").clicked() {
                let name = format!("Layer {}", editor.compositor().layers().len() + 1);
                if let Err(err) = editor.add_layer(&name) {
                    *status = Some(err.to_string());
                }
            }
            if ui.button("Export PNG").clicked() {
                export = true;
            }
            ui.label(format!("{:.0}%", editor.camera().zoom() * 100.0));
            if let Some(message) = status.as_deref() {
                ui.label(message);
            }
        });
        export
    }

    fn layer_strip(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let Ok(editor) = &mut self.editor else {
            return;
        };
        let ids: Vec<(LayerId, String)> = editor
            .compositor()
            .layers()
            .iter()
            .rev()
            .map(|layer| (layer.id, layer.name.clone()))
            .collect();
        for (id, name) in ids {
            ui.horizontal(|ui| {
                if let Some(texture) = self.renderer.layer_preview(ctx, editor, id) {
                    ui.image((texture, egui::vec2(48.0, 36.0)));
                }
                let selected = editor.active_layer() == id;
                let label = if self.thumbnails.contains_key(&id) { name } else { format!("{name} *") };
                if ui.selectable_label(selected, label).clicked() {
                    run(editor, Command::SetActiveLayer(id), &mut self.status);
                }
            });
        }
    }

    /// Polls pending readbacks once and hands finished pixels to the encoders.
    fn poll_readbacks(&mut self) {
        let Ok(editor) = &self.editor else {
            return;
        };
        let mut still_pending = Vec::new();
        for pending in self.readbacks.drain(..) {
            let (result, pending) = match pending {
                PendingReadback::Thumbnail(layer, mut readback) => match (&mut readback).now_or_never() {
                    Some(result) => (Some(result.map(|pixels| (Some(layer), pixels))), None),
                    None => (None, Some(PendingReadback::Thumbnail(layer, readback))),
                },
                PendingReadback::Export(mut readback) => match (&mut readback).now_or_never() {
                    Some(result) => (Some(result.map(|pixels| (None, pixels))), None),
                    None => (None, Some(PendingReadback::Export(readback))),
                },
            };
            still_pending.extend(pending);
            match result {
                Some(Ok((Some(layer), pixels))) => self.encoders.thumbnail(ThumbnailRequest { pixels, layer }),
                Some(Ok((None, pixels))) => self.encoders.export(ExportRequest { pixels }),
                Some(Err(err)) => editor.report_readback_failure(err),
                None => {}
            }
        }
        self.readbacks = still_pending;
    }

    fn collect_encoded(&mut self) {
        let (thumbnails, exports) = self.encoders.finished();
        for response in thumbnails {
            recycle(response.pixels);
            match response.image_url {
                Ok(url) => {
                    self.thumbnails.insert(response.layer, url);
                }
                Err(err) => log::warn!("thumbnail for {} failed: {err}", response.layer),
            }
        }
        for response in exports {
            recycle(response.pixels);
            self.status = Some(match response.png {
                Ok(png) => format!("exported {} bytes", png.len()),
                Err(err) => format!("export failed: {err}"),
            });
        }
    }
}

/// Buffers come back from the workers once they are done with them
fn recycle(pixels: PixelBuffer) {
    log::trace!("released {}x{} pixel buffer", pixels.width, pixels.height);
}

fn current_size(editor: &EditorContext) -> Option<f32> {
    use crate::tool::ToolType;
    match editor.tools().get(editor.active_tool())? {
        ToolType::Brush(tool) => Some(tool.settings.size),
        ToolType::Eraser(tool) => Some(tool.settings.size),
        ToolType::Pencil(tool) => Some(tool.settings().size),
        ToolType::Fill(_) | ToolType::Eyedropper(_) => None,
    }
}

fn run(editor: &mut EditorContext, command: Command, status: &mut Option<String>) {
    if let Err(err) = editor.execute(command) {
        log::warn!("command failed: {err}");
        *status = Some(err.to_string());
    }
}

impl eframe::App for PaintApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(editor) = &self.editor {
            eframe::set_value(storage, eframe::APP_KEY, editor.preferences());
        }
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dt = self.clock.delta();
        let editor = match &mut self.editor {
            Ok(editor) => editor,
            Err(message) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Canvas unavailable");
                    ui.label(message.as_str());
                });
                return;
            }
        };

        let export = egui::TopBottomPanel::top("tools")
            .show(ctx, |ui| Self::tool_strip(ui, editor, &mut self.status))
            .inner;
        if export {
            let readback = editor.request_readback(ColorDepth::Rgba8);
            self.readbacks.push(PendingReadback::Export(readback));
        }

        for layer in self.invalidator.take_dirty() {
            match editor.request_layer_readback(layer, ColorDepth::Rgba8) {
                Ok(readback) => self.readbacks.push(PendingReadback::Thumbnail(layer, readback)),
                Err(err) => log::warn!("no thumbnail readback: {err}"),
            }
        }

        egui::CentralPanel::default().frame(egui::Frame::none()).show(ctx, |ui| {
            let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            self.input.set_canvas_rect(rect);
            editor.set_viewport(rect.size());
            for event in self.input.process_input(ctx) {
                if let Err(err) = editor.handle_event(event) {
                    log::warn!("input rejected: {err}");
                }
            }
            editor.tick(dt);
            self.renderer.render(ctx, &painter, rect, editor);
        });

        egui::SidePanel::right("layers").show(ctx, |ui| self.layer_strip(ui, ctx));

        self.poll_readbacks();
        self.collect_encoded();

        let paused = self.editor.as_ref().map_or(true, |editor| editor.scheduler().is_paused());
        if !paused || !self.readbacks.is_empty() {
            ctx.request_repaint();
        }
    }
}
