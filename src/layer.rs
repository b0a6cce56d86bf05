use egui::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::gpu::{BoundingBox, Surface};

mod history;

pub use history::{SnapshotHistory, HISTORY_DEPTH};

/// A unique identifier for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Separable blend modes applied when a layer is drawn over its backdrop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Add,
}

/// Multiply or screen `value` depending on which half `mask` falls in.
fn hard_light(mask: f32, value: f32) -> f32 {
    if mask <= 0.5 {
        value * 2.0 * mask
    } else {
        let m = 2.0 * mask - 1.0;
        value + m - value * m
    }
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Add,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Add => "Add",
        }
    }

    /// Mixes unpremultiplied backdrop and source channels.
    fn mix(&self, backdrop: f32, source: f32) -> f32 {
        match self {
            BlendMode::Normal => source,
            BlendMode::Multiply => backdrop * source,
            BlendMode::Screen => backdrop + source - backdrop * source,
            BlendMode::Overlay => hard_light(backdrop, source),
            BlendMode::Darken => backdrop.min(source),
            BlendMode::Lighten => backdrop.max(source),
            BlendMode::Add => (backdrop + source).min(1.0),
        }
    }

    /// Composites premultiplied `src` over `dst`, with `src` first scaled by `opacity`.
    ///
    /// `co = (1 - ab) cs + (1 - as) cb + as ab B(Cb, Cs)` where lowercase are
    /// premultiplied and `B` works on unpremultiplied channels.
    pub fn composite(&self, src: Rgba, dst: Rgba, opacity: f32) -> Rgba {
        let opacity = opacity.clamp(0.0, 1.0);
        let s = src.to_array().map(|c| c * opacity);
        let d = dst.to_array();
        let (sa, da) = (s[3], d[3]);
        if sa <= 0.0 {
            return dst;
        }
        let mut out = [0.0; 4];
        for i in 0..3 {
            let mixed = if da > 0.0 {
                self.mix((d[i] / da).clamp(0.0, 1.0), (s[i] / sa).clamp(0.0, 1.0))
            } else {
                0.0
            };
            out[i] = ((1.0 - da) * s[i] + (1.0 - sa) * d[i] + sa * da * mixed).clamp(0.0, 1.0);
        }
        out[3] = (sa + da * (1.0 - sa)).clamp(0.0, 1.0);
        Rgba::from_rgba_premultiplied(out[0], out[1], out[2], out[3])
    }
}

/// A raster layer and its undo history.
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub blend_mode: BlendMode,
    /// Clips this layer to the alpha of the nearest unclipped layer below it
    pub clipping_mask: bool,
    pub opacity: f32,
    bounding_box: Option<BoundingBox>,
    surface: Surface,
    history: SnapshotHistory,
    /// Bumped on every pixel change
    version: u64,
    pub needs_thumbnail_update: bool,
}

impl Layer {
    pub fn new(name: &str, surface: Surface) -> Self {
        Self::with_id(LayerId::new(), name, surface)
    }

    pub fn with_id(id: LayerId, name: &str, surface: Surface) -> Self {
        let history = SnapshotHistory::new(surface.clone());
        Self {
            id,
            name: name.to_string(),
            visible: true,
            blend_mode: BlendMode::Normal,
            clipping_mask: false,
            opacity: 1.0,
            bounding_box: None,
            surface,
            history,
            version: 0,
            needs_thumbnail_update: true,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.bounding_box
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Mutable pixel access. Callers must call [`Layer::touch`] with the
    /// region they changed.
    pub(crate) fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Records a pixel change inside `region`.
    pub(crate) fn touch(&mut self, region: Option<BoundingBox>) {
        if let Some(region) = region {
            self.bounding_box = Some(match self.bounding_box {
                Some(current) => current.union(&region),
                None => region,
            });
        }
        self.version += 1;
        self.needs_thumbnail_update = true;
    }

    fn refresh_bounds(&mut self) {
        self.bounding_box = self.surface.content_bounds();
        self.version += 1;
        self.needs_thumbnail_update = true;
    }

    /// Pushes `snapshot` (the pre-change pixels) onto the undo queue.
    pub(crate) fn push_snapshot(&mut self, snapshot: Surface) {
        self.history.push(snapshot);
    }

    /// Replaces the pixels with the most recent snapshot. Returns false when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.undo(&mut self.surface) {
            return false;
        }
        self.refresh_bounds();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.redo(&mut self.surface) {
            return false;
        }
        self.refresh_bounds();
        true
    }

    /// Restores pixels captured before an interaction without touching history.
    pub(crate) fn restore(&mut self, snapshot: &Surface) -> bool {
        if !self.surface.copy_from(snapshot) {
            return false;
        }
        self.refresh_bounds();
        true
    }
}
