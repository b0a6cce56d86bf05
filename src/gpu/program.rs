use egui::Rgba;

use super::blend::BlendState;
use super::surface::{BoundingBox, Surface};
use crate::stroke::Stamp;

/// Unit quad the stamp is scaled and translated onto
pub const UNIT_QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];

#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    vertices: Vec<[f32; 2]>,
}

impl VertexBuffer {
    pub(crate) fn new(vertices: Vec<[f32; 2]>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[[f32; 2]] {
        &self.vertices
    }

    /// Quad extent once scaled by `size` around `center`
    fn extent(&self, center: egui::Pos2, size: f32) -> (f32, f32, f32, f32) {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for [vx, vy] in &self.vertices {
            let x = center.x + vx * size;
            let y = center.y + vy * size;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }
}

/// Per-draw uniform values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampUniforms {
    /// Unpremultiplied RGB in 0..=1
    pub color: [f32; 3],
    /// Per-stamp alpha (flow)
    pub flow: f32,
    /// 0 = soft falloff over the whole radius, 1 = hard disc
    pub hardness: f32,
}

/// The stamping shader program of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct StampProgram {
    label: &'static str,
    blend: BlendState,
    /// Forces a binary coverage mask
    hard_edge: bool,
    quad: VertexBuffer,
}

fn dither(seed: u32, x: usize, y: usize) -> f32 {
    let mut h = seed ^ (x as u32).wrapping_mul(0x27d4_eb2d) ^ (y as u32).wrapping_mul(0x1656_67b1);
    h ^= h >> 15;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    (h & 0xffff) as f32 / 65535.0 - 0.5
}

impl StampProgram {
    pub(crate) fn new(label: &'static str, blend: BlendState, hard_edge: bool, quad: VertexBuffer) -> Self {
        Self {
            label,
            blend,
            hard_edge,
            quad,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn blend(&self) -> &BlendState {
        &self.blend
    }

    pub fn hard_edge(&self) -> bool {
        self.hard_edge
    }

    /// Coverage at normalized distance `d` from the stamp center.
    pub fn coverage(&self, d: f32, hardness: f32) -> f32 {
        if d >= 1.0 {
            return 0.0;
        }
        if self.hard_edge {
            return 1.0;
        }
        let inner = hardness.clamp(0.0, 1.0);
        if d <= inner || inner >= 1.0 {
            return 1.0;
        }
        let t = (d - inner) / (1.0 - inner);
        let falloff = 1.0 - t;
        falloff * falloff * (3.0 - 2.0 * falloff)
    }

    /// Rasterizes one stamp quad into `target` and returns the touched region.
    pub fn draw(&self, target: &mut Surface, stamp: &Stamp, uniforms: &StampUniforms) -> Option<BoundingBox> {
        let size = stamp.size.max(0.5);
        let (min_x, min_y, max_x, max_y) = self.quad.extent(stamp.pos, size);
        let x0 = min_x.floor().max(0.0) as usize;
        let y0 = min_y.floor().max(0.0) as usize;
        let x1 = (max_x.ceil().max(0.0) as usize).min(target.width());
        let y1 = (max_y.ceil().max(0.0) as usize).min(target.height());
        let bounds = BoundingBox::new([x0, y0], [x1, y1]);
        if bounds.is_empty() {
            return None;
        }

        let [r, g, b] = uniforms.color;
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - stamp.pos.x;
                let dy = y as f32 + 0.5 - stamp.pos.y;
                let d = (dx * dx + dy * dy).sqrt() / size;
                let mut coverage = self.coverage(d, uniforms.hardness);
                if coverage <= 0.0 {
                    continue;
                }
                if !self.hard_edge && coverage < 1.0 {
                    coverage = (coverage + dither(stamp.seed, x, y) / 255.0).clamp(0.0, 1.0);
                }
                let alpha = coverage * uniforms.flow.clamp(0.0, 1.0);
                let src = Rgba::from_rgba_premultiplied(r * alpha, g * alpha, b * alpha, alpha);
                target.blend(x, y, src, &self.blend);
            }
        }
        Some(bounds)
    }
}
