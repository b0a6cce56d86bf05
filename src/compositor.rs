//! Layer stack, per-stroke scratch accumulation and commit.
//!
//! Stamps of an in-flight stroke land on the scratch surface, never on the
//! target layer, so a cancelled stroke costs a clear. Tools that write live
//! (the eraser) stamp into the layer itself; for those a copy of the layer is
//! taken when the stroke begins so it can still be cancelled or undone.

use egui::{Pos2, Rgba};

use crate::error::{LayerError, RenderError};
use crate::gpu::{premultiplied, unmultiply, BoundingBox, ColorDepth, Device, Readback, Surface};
use crate::layer::{BlendMode, Layer, LayerId};

/// Surface of the nearest unclipped layer below `index`
fn clip_base(layers: &[Layer], index: usize) -> Option<&Surface> {
    layers[..index]
        .iter()
        .rev()
        .find(|layer| !layer.clipping_mask)
        .map(|layer| layer.surface())
}

#[derive(Debug, Clone)]
struct ActiveStroke {
    target: LayerId,
    opacity: f32,
    /// Pre-stroke copy of a layer that is written live
    live_snapshot: Option<Surface>,
    dirty: Option<BoundingBox>,
}

/// Owns the layers and blends them into the framebuffer.
#[derive(Debug)]
pub struct Compositor {
    size: [usize; 2],
    /// Bottom to top
    layers: Vec<Layer>,
    scratch: Surface,
    stroke: Option<ActiveStroke>,
    framebuffer: Surface,
    background: Rgba,
    framebuffer_stale: bool,
    /// Bumped every time the framebuffer is recomposited
    version: u64,
}

impl Compositor {
    pub fn new(device: &Device, width: usize, height: usize) -> Result<Self, RenderError> {
        Ok(Self {
            size: [width, height],
            layers: Vec::new(),
            scratch: device.create_surface(width, height)?,
            stroke: None,
            framebuffer: device.create_surface(width, height)?,
            background: Rgba::WHITE,
            framebuffer_stale: true,
            version: 0,
        })
    }

    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    pub fn set_background(&mut self, background: Rgba) {
        self.background = background;
        self.framebuffer_stale = true;
    }

    pub fn add_layer(&mut self, device: &Device, name: &str) -> Result<LayerId, RenderError> {
        let surface = device.create_surface(self.size[0], self.size[1])?;
        let layer = Layer::new(name, surface);
        let id = layer.id;
        log::debug!("added layer {name} ({id})");
        self.layers.push(layer);
        self.framebuffer_stale = true;
        Ok(id)
    }

    /// Returns `preferred` if it exists, else the top layer, creating one if the stack is empty.
    pub fn ensure_layer(&mut self, device: &Device, preferred: Option<LayerId>) -> Result<LayerId, RenderError> {
        if let Some(id) = preferred.filter(|id| self.layer(*id).is_some()) {
            return Ok(id);
        }
        match self.layers.last() {
            Some(layer) => Ok(layer.id),
            None => self.add_layer(device, "Layer 1"),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    fn index_of(&self, id: LayerId) -> Result<usize, LayerError> {
        self.layers
            .iter()
            .position(|layer| layer.id == id)
            .ok_or(LayerError::UnknownLayer(id))
    }

    /// Mutates layer properties such as blend mode or visibility
    pub fn update_layer<F>(&mut self, id: LayerId, update: F) -> Result<(), LayerError>
    where
        F: FnOnce(&mut Layer),
    {
        let index = self.index_of(id)?;
        update(&mut self.layers[index]);
        self.framebuffer_stale = true;
        Ok(())
    }

    /// Replaces a layer's pixels, e.g. with decoded project data.
    pub fn load_layer(&mut self, id: LayerId, surface: Surface) -> Result<(), LayerError> {
        let index = self.index_of(id)?;
        if surface.size() != self.size {
            return Err(LayerError::SizeMismatch {
                expected: self.size,
                actual: surface.size(),
            });
        }
        let layer = &mut self.layers[index];
        layer.push_snapshot(layer.surface().clone());
        layer.surface_mut().copy_from(&surface);
        let bounds = surface.content_bounds();
        layer.touch(bounds);
        self.framebuffer_stale = true;
        Ok(())
    }

    /// Clears the scratch surface and targets `layer` with a new stroke.
    pub fn begin_stroke(&mut self, layer: LayerId, opacity: f32, live: bool) -> Result<(), LayerError> {
        let index = self.index_of(layer)?;
        if self.stroke.is_some() {
            log::warn!("stroke begun while another was in flight; discarding the old one");
            self.cancel_stroke();
        }
        self.scratch.clear();
        self.stroke = Some(ActiveStroke {
            target: layer,
            opacity: opacity.clamp(0.0, 1.0),
            live_snapshot: live.then(|| self.layers[index].surface().clone()),
            dirty: None,
        });
        Ok(())
    }

    pub fn stroke_target(&self) -> Option<LayerId> {
        self.stroke.as_ref().map(|stroke| stroke.target)
    }

    pub fn scratch(&self) -> &Surface {
        &self.scratch
    }

    /// Surface the current stroke stamps into.
    pub fn stroke_surface(&mut self) -> Option<&mut Surface> {
        let stroke = self.stroke.as_ref()?;
        if stroke.live_snapshot.is_none() {
            return Some(&mut self.scratch);
        }
        let target = stroke.target;
        self.layers
            .iter_mut()
            .find(|layer| layer.id == target)
            .map(|layer| layer.surface_mut())
    }

    /// Records the region the last draw touched.
    pub fn mark_stroke_dirty(&mut self, region: Option<BoundingBox>) {
        let Some(stroke) = self.stroke.as_mut() else {
            return;
        };
        if let Some(region) = region {
            stroke.dirty = Some(stroke.dirty.map_or(region, |d| d.union(&region)));
            if stroke.live_snapshot.is_some() {
                let target = stroke.target;
                if let Some(layer) = self.layers.iter_mut().find(|layer| layer.id == target) {
                    layer.touch(None);
                }
            }
        }
        self.framebuffer_stale = true;
    }

    /// Blends the scratch surface into the target layer with the layer's
    /// blend mode and pushes the pre-commit pixels onto its undo queue.
    /// Returns the committed layer, or `None` when nothing was in flight.
    pub fn commit_stroke(&mut self) -> Result<Option<LayerId>, LayerError> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(None);
        };
        let index = self.index_of(stroke.target)?;
        let layer = &mut self.layers[index];

        match stroke.live_snapshot {
            Some(snapshot) => {
                if stroke.dirty.is_none() {
                    return Ok(None);
                }
                layer.push_snapshot(snapshot);
                layer.touch(None);
            }
            None => {
                let Some(dirty) = stroke.dirty else {
                    return Ok(None);
                };
                layer.push_snapshot(layer.surface().clone());
                let mode = layer.blend_mode;
                let surface = layer.surface_mut();
                for y in dirty.min[1]..dirty.max[1] {
                    for x in dirty.min[0]..dirty.max[0] {
                        let src = self.scratch.get(x, y);
                        if src.a() > 0.0 {
                            surface.set(x, y, mode.composite(src, surface.get(x, y), stroke.opacity));
                        }
                    }
                }
                layer.touch(Some(dirty));
                self.scratch.clear();
            }
        }
        self.framebuffer_stale = true;
        log::debug!("committed stroke into layer {}", stroke.target);
        Ok(Some(stroke.target))
    }

    /// Drops the in-flight stroke without touching layer history.
    pub fn cancel_stroke(&mut self) {
        let Some(stroke) = self.stroke.take() else {
            return;
        };
        if let Some(snapshot) = &stroke.live_snapshot {
            if let Some(layer) = self.layers.iter_mut().find(|layer| layer.id == stroke.target) {
                layer.restore(snapshot);
            }
        }
        self.scratch.clear();
        self.framebuffer_stale = true;
        log::debug!("cancelled stroke on layer {}", stroke.target);
    }

    /// Fills the layer with `color`, limited to the clipping base's alpha
    /// when the layer is a clipping mask.
    ///
    /// Pushes an undo snapshot and returns the layer's content bounds. A fill
    /// that covers no pixel leaves the layer and its history alone and
    /// returns `None`.
    pub fn fill(&mut self, id: LayerId, color: [u8; 3], opacity: f32) -> Result<Option<BoundingBox>, LayerError> {
        let index = self.index_of(id)?;
        let clip = if self.layers[index].clipping_mask {
            Some(clip_base(&self.layers, index).cloned())
        } else {
            None
        };

        let layer = &mut self.layers[index];
        let before = layer.surface().clone();
        let surface = layer.surface_mut();
        let mut painted = false;
        for y in 0..self.size[1] {
            for x in 0..self.size[0] {
                let coverage = match &clip {
                    Some(Some(base)) => base.get(x, y).a(),
                    Some(None) => 0.0,
                    None => 1.0,
                };
                if coverage * opacity <= 0.0 {
                    continue;
                }
                let src = premultiplied(color, opacity * coverage);
                surface.set(x, y, BlendMode::Normal.composite(src, surface.get(x, y), 1.0));
                painted = true;
            }
        }
        if !painted {
            log::debug!("fill on layer {id} covered nothing");
            return Ok(None);
        }
        layer.push_snapshot(before);
        let bounds = layer.surface().content_bounds();
        layer.touch(bounds);
        self.framebuffer_stale = true;
        log::debug!("filled layer {id}");
        Ok(bounds)
    }

    pub fn undo(&mut self, id: LayerId) -> Result<bool, LayerError> {
        let index = self.index_of(id)?;
        let undone = self.layers[index].undo();
        self.framebuffer_stale |= undone;
        Ok(undone)
    }

    pub fn redo(&mut self, id: LayerId) -> Result<bool, LayerError> {
        let index = self.index_of(id)?;
        let redone = self.layers[index].redo();
        self.framebuffer_stale |= redone;
        Ok(redone)
    }

    pub fn is_stale(&self) -> bool {
        self.framebuffer_stale
    }

    pub fn invalidate(&mut self) {
        self.framebuffer_stale = true;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Blends every visible layer over the background, previewing the
    /// in-flight stroke above its target layer.
    pub fn composite(&mut self) -> &Surface {
        if !self.framebuffer_stale {
            return &self.framebuffer;
        }
        self.framebuffer.fill(self.background);
        let preview = self
            .stroke
            .as_ref()
            .filter(|stroke| stroke.live_snapshot.is_none() && stroke.dirty.is_some())
            .map(|stroke| (stroke.target, stroke.opacity));

        for (index, layer) in self.layers.iter().enumerate() {
            if !layer.visible || layer.opacity <= 0.0 {
                continue;
            }
            let clip = if layer.clipping_mask { Some(clip_base(&self.layers, index)) } else { None };
            let scratch_opacity = preview.filter(|(target, _)| *target == layer.id).map(|(_, o)| o);

            for y in 0..self.size[1] {
                for x in 0..self.size[0] {
                    let mut pixel = layer.surface().get(x, y);
                    if let Some(opacity) = scratch_opacity {
                        let stamp = self.scratch.get(x, y);
                        if stamp.a() > 0.0 {
                            pixel = layer.blend_mode.composite(stamp, pixel, opacity);
                        }
                    }
                    if pixel.a() <= 0.0 {
                        continue;
                    }
                    let coverage = match clip {
                        Some(Some(base)) => base.get(x, y).a(),
                        Some(None) => 0.0,
                        None => 1.0,
                    };
                    if coverage <= 0.0 {
                        continue;
                    }
                    let dst = self.framebuffer.get(x, y);
                    let out = layer.blend_mode.composite(pixel, dst, layer.opacity * coverage);
                    self.framebuffer.set(x, y, out);
                }
            }
        }
        self.framebuffer_stale = false;
        self.version += 1;
        &self.framebuffer
    }

    pub fn framebuffer(&self) -> &Surface {
        &self.framebuffer
    }

    /// Average color of the `sample_size` square around `pos` in the
    /// composited image, as unpremultiplied RGB 0..=255.
    pub fn sample(&mut self, pos: Pos2, sample_size: u32) -> Option<[u8; 3]> {
        let [width, height] = self.size;
        if pos.x < 0.0 || pos.y < 0.0 || pos.x >= width as f32 || pos.y >= height as f32 {
            return None;
        }
        let framebuffer = self.composite();
        let half = (sample_size.max(1) as isize - 1) / 2;
        let (cx, cy) = (pos.x.floor() as isize, pos.y.floor() as isize);

        let mut sum = [0.0f32; 4];
        let mut count = 0usize;
        for y in (cy - half)..=(cy + half) {
            for x in (cx - half)..=(cx + half) {
                if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
                    continue;
                }
                let pixel = framebuffer.get(x as usize, y as usize).to_array();
                for (total, channel) in sum.iter_mut().zip(pixel) {
                    *total += channel;
                }
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        let n = count as f32;
        let average = Rgba::from_rgba_premultiplied(sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n);
        let [r, g, b, _] = unmultiply(average);
        Some([r, g, b].map(|c| (c * 255.0).round() as u8))
    }

    /// Copies the composited image into a pack buffer and returns a future
    /// that resolves once the device has flushed past the copy.
    pub fn request_readback(&mut self, device: &mut Device, depth: ColorDepth) -> Readback {
        self.composite();
        device.read_pixels_async(&self.framebuffer, depth)
    }

    /// Starts a readback of a single layer, for thumbnails.
    pub fn request_layer_readback(
        &self,
        device: &mut Device,
        id: LayerId,
        depth: ColorDepth,
    ) -> Result<Readback, LayerError> {
        let index = self.index_of(id)?;
        Ok(device.read_pixels_async(self.layers[index].surface(), depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::Capabilities;

    fn setup() -> (Device, Compositor, LayerId) {
        let device = Device::new(Capabilities::default()).unwrap();
        let mut compositor = Compositor::new(&device, 8, 8).unwrap();
        let id = compositor.add_layer(&device, "base").unwrap();
        (device, compositor, id)
    }

    fn paint_scratch(compositor: &mut Compositor, x: usize, y: usize, color: [u8; 3]) {
        compositor.stroke_surface().unwrap().set(x, y, premultiplied(color, 1.0));
        compositor.mark_stroke_dirty(Some(BoundingBox::new([x, y], [x + 1, y + 1])));
    }

    #[test]
    fn test_commit_pushes_pre_commit_snapshot() {
        let (_device, mut compositor, id) = setup();
        compositor.begin_stroke(id, 1.0, false).unwrap();
        paint_scratch(&mut compositor, 2, 2, [255, 0, 0]);
        assert_eq!(compositor.layer(id).unwrap().surface().get(2, 2).a(), 0.0);

        assert_eq!(compositor.commit_stroke().unwrap(), Some(id));
        let layer = compositor.layer(id).unwrap();
        assert_eq!(layer.surface().get(2, 2).a(), 1.0);
        assert_eq!(layer.history().undo_len(), 1);
        assert_eq!(compositor.scratch().get(2, 2).a(), 0.0);

        assert!(compositor.undo(id).unwrap());
        assert_eq!(compositor.layer(id).unwrap().surface().get(2, 2).a(), 0.0);
    }

    #[test]
    fn test_cancel_leaves_layer_untouched() {
        let (_device, mut compositor, id) = setup();
        compositor.begin_stroke(id, 1.0, false).unwrap();
        paint_scratch(&mut compositor, 1, 1, [0, 0, 255]);
        compositor.cancel_stroke();
        assert!(compositor.commit_stroke().unwrap().is_none());
        let layer = compositor.layer(id).unwrap();
        assert!(layer.surface().content_bounds().is_none());
        assert_eq!(layer.history().undo_len(), 0);
    }

    #[test]
    fn test_live_stroke_cancel_restores() {
        let (_device, mut compositor, id) = setup();
        compositor.fill(id, [10, 20, 30], 1.0).unwrap();
        compositor.begin_stroke(id, 1.0, true).unwrap();
        compositor.stroke_surface().unwrap().set(3, 3, Rgba::TRANSPARENT);
        compositor.mark_stroke_dirty(Some(BoundingBox::new([3, 3], [4, 4])));
        compositor.cancel_stroke();
        assert_eq!(compositor.layer(id).unwrap().surface().get(3, 3).a(), 1.0);
    }

    #[test]
    fn test_preview_matches_commit() {
        let (_device, mut compositor, id) = setup();
        compositor.begin_stroke(id, 0.5, false).unwrap();
        paint_scratch(&mut compositor, 4, 4, [0, 0, 0]);
        let preview = compositor.composite().get(4, 4);
        compositor.commit_stroke().unwrap();
        let committed = compositor.composite().get(4, 4);
        assert_eq!(preview, committed);
    }

    #[test]
    fn test_sample_averages_window() {
        let (_device, mut compositor, id) = setup();
        compositor.begin_stroke(id, 1.0, false).unwrap();
        paint_scratch(&mut compositor, 4, 4, [0, 0, 0]);
        compositor.commit_stroke().unwrap();

        assert_eq!(compositor.sample(Pos2::new(4.5, 4.5), 1), Some([0, 0, 0]));
        let [r, _, _] = compositor.sample(Pos2::new(4.5, 4.5), 3).unwrap();
        assert_eq!(r, (255.0f32 * 8.0 / 9.0).round() as u8);
        assert_eq!(compositor.sample(Pos2::new(-1.0, 0.0), 1), None);
    }

    #[test]
    fn test_clipped_fill_follows_base_alpha() {
        let (device, mut compositor, base) = setup();
        compositor.begin_stroke(base, 1.0, false).unwrap();
        paint_scratch(&mut compositor, 1, 1, [0, 0, 0]);
        compositor.commit_stroke().unwrap();

        let clipped = compositor.add_layer(&device, "clipped").unwrap();
        compositor.update_layer(clipped, |layer| layer.clipping_mask = true).unwrap();
        let region = compositor.fill(clipped, [255, 0, 0], 1.0).unwrap();
        assert_eq!(region, Some(BoundingBox::new([1, 1], [2, 2])));
    }

    #[test]
    fn test_clipped_fill_without_base_is_not_undoable() {
        let (device, mut compositor, base) = setup();
        compositor.update_layer(base, |layer| layer.clipping_mask = true).unwrap();
        assert_eq!(compositor.fill(base, [255, 0, 0], 1.0).unwrap(), None);
        assert_eq!(compositor.layer(base).unwrap().history().undo_len(), 0);

        // a transparent base clips everything away as well
        compositor.update_layer(base, |layer| layer.clipping_mask = false).unwrap();
        let clipped = compositor.add_layer(&device, "clipped").unwrap();
        compositor.update_layer(clipped, |layer| layer.clipping_mask = true).unwrap();
        assert_eq!(compositor.fill(clipped, [0, 255, 0], 1.0).unwrap(), None);
        assert_eq!(compositor.layer(clipped).unwrap().history().undo_len(), 0);
        assert!(!compositor.undo(clipped).unwrap());
    }

    #[test]
    fn test_multiply_layer_composite() {
        let (device, mut compositor, _base) = setup();
        let top = compositor.add_layer(&device, "multiply").unwrap();
        compositor.update_layer(top, |layer| layer.blend_mode = BlendMode::Multiply).unwrap();
        compositor.fill(top, [128, 128, 128], 1.0).unwrap();
        let [r, _, _, a] = unmultiply(compositor.composite().get(0, 0));
        assert!((r - 128.0 / 255.0).abs() < 1e-4);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn test_unknown_layer() {
        let (_device, mut compositor, _) = setup();
        let missing = LayerId::new();
        assert_eq!(compositor.undo(missing), Err(LayerError::UnknownLayer(missing)));
    }

    #[test]
    fn test_readback_after_flush() {
        let (mut device, mut compositor, _) = setup();
        let readback = compositor.request_readback(&mut device, ColorDepth::Rgba8);
        device.flush();
        let pixels = futures::executor::block_on(readback).unwrap();
        assert_eq!(&pixels.data[0..4], &[255, 255, 255, 255]);
    }
}
