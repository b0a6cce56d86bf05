use egui::Rgba;
use serde::{Deserialize, Serialize};

use super::blend::BlendState;

/// Axis-aligned pixel region, `max` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [usize; 2],
    pub max: [usize; 2],
}

impl BoundingBox {
    pub fn new(min: [usize; 2], max: [usize; 2]) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] >= self.max[0] || self.min[1] >= self.max[1]
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.min[0] && x < self.max[0] && y >= self.min[1] && y < self.max[1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorDepth {
    Rgba8,
    Rgba16,
}

impl ColorDepth {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorDepth::Rgba8 => 4,
            ColorDepth::Rgba16 => 8,
        }
    }
}

/// Unpremultiplied pixel data read back from a surface.
///
/// Ownership moves into encoding workers and back; it is never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub depth: ColorDepth,
    /// Row-major RGBA; 16-bit channels are little endian
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.depth.bytes_per_pixel()
    }
}

/// A premultiplied RGBA pixel surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Surface {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Rgba {
        if x >= self.width || y >= self.height {
            return Rgba::TRANSPARENT;
        }
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, pixel: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = pixel;
        }
    }

    pub fn blend(&mut self, x: usize, y: usize, src: Rgba, state: &BlendState) {
        if x < self.width && y < self.height {
            let dst = &mut self.pixels[y * self.width + x];
            *dst = state.apply(src, *dst);
        }
    }

    pub fn clear(&mut self) {
        self.fill(Rgba::TRANSPARENT);
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Replaces the contents with `other`, which must have the same size.
    pub fn copy_from(&mut self, other: &Surface) -> bool {
        if self.size() != other.size() {
            return false;
        }
        self.pixels.copy_from_slice(&other.pixels);
        true
    }

    /// Bounding box of all pixels with non-zero alpha
    pub fn content_bounds(&self) -> Option<BoundingBox> {
        let mut bounds: Option<BoundingBox> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixels[y * self.width + x].a() > 0.0 {
                    let pixel = BoundingBox::new([x, y], [x + 1, y + 1]);
                    bounds = Some(bounds.map_or(pixel, |b| b.union(&pixel)));
                }
            }
        }
        bounds
    }

    /// Unpremultiplied channels of one pixel in 0..=1
    pub fn unmultiplied(&self, x: usize, y: usize) -> [f32; 4] {
        unmultiply(self.get(x, y))
    }

    pub fn read_pixels(&self, depth: ColorDepth) -> PixelBuffer {
        let mut data = Vec::with_capacity(self.pixels.len() * depth.bytes_per_pixel());
        for pixel in &self.pixels {
            for channel in unmultiply(*pixel) {
                match depth {
                    ColorDepth::Rgba8 => data.push((channel * 255.0).round() as u8),
                    ColorDepth::Rgba16 => {
                        data.extend_from_slice(&((channel * 65535.0).round() as u16).to_le_bytes())
                    }
                }
            }
        }
        PixelBuffer {
            width: self.width as u32,
            height: self.height as u32,
            depth,
            data,
        }
    }
}

pub fn unmultiply(pixel: Rgba) -> [f32; 4] {
    let [r, g, b, a] = pixel.to_array();
    if a <= f32::EPSILON {
        return [0.0, 0.0, 0.0, 0.0];
    }
    [
        (r / a).clamp(0.0, 1.0),
        (g / a).clamp(0.0, 1.0),
        (b / a).clamp(0.0, 1.0),
        a.clamp(0.0, 1.0),
    ]
}

/// Premultiplied pixel from an RGB 0..=255 triple and an alpha in 0..=1
pub fn premultiplied(rgb: [u8; 3], alpha: f32) -> Rgba {
    let alpha = alpha.clamp(0.0, 1.0);
    Rgba::from_rgba_premultiplied(
        rgb[0] as f32 / 255.0 * alpha,
        rgb[1] as f32 / 255.0 * alpha,
        rgb[2] as f32 / 255.0 * alpha,
        alpha,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_reads_transparent() {
        let surface = Surface::new(2, 2);
        assert_eq!(surface.get(5, 0), Rgba::TRANSPARENT);
    }

    #[test]
    fn test_read_pixels_unmultiplies() {
        let mut surface = Surface::new(1, 1);
        surface.set(0, 0, premultiplied([200, 100, 0], 0.5));
        let buffer = surface.read_pixels(ColorDepth::Rgba8);
        assert_eq!(buffer.data, vec![200, 100, 0, 128]);
        assert_eq!(buffer.data.len(), buffer.expected_len());
    }

    #[test]
    fn test_read_pixels_16_bit() {
        let mut surface = Surface::new(1, 1);
        surface.set(0, 0, premultiplied([255, 0, 0], 1.0));
        let buffer = surface.read_pixels(ColorDepth::Rgba16);
        assert_eq!(&buffer.data[0..2], &[0xff, 0xff]);
        assert_eq!(buffer.data.len(), 8);
    }

    #[test]
    fn test_content_bounds() {
        let mut surface = Surface::new(10, 10);
        assert!(surface.content_bounds().is_none());
        surface.set(2, 3, premultiplied([0, 0, 0], 1.0));
        surface.set(6, 4, premultiplied([0, 0, 0], 1.0));
        assert_eq!(surface.content_bounds(), Some(BoundingBox::new([2, 3], [7, 5])));
    }
}
