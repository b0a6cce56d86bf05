use egui::Pos2;

use crate::input::PointerType;

/// A single filtered sample held by a `PointStore` slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub pos: Pos2,
    /// Normalized pen pressure, 0..=1
    pub pressure: f32,
    pub pointer_type: PointerType,
    /// Set once the point is committed into the stroke history
    pub active: bool,
}

impl Default for Point {
    fn default() -> Self {
        Self {
            pos: Pos2::ZERO,
            pressure: 1.0,
            pointer_type: PointerType::Mouse,
            active: false,
        }
    }
}

impl Point {
    pub fn new(pos: Pos2, pressure: f32, pointer_type: PointerType) -> Self {
        Self {
            pos,
            pressure: pressure.clamp(0.0, 1.0),
            pointer_type,
            active: false,
        }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        self.pos.distance(other.pos)
    }

    /// Averages position and pressure with `other`, keeping this point's flags.
    pub fn merged_with(&self, other: &Point) -> Point {
        Point {
            pos: self.pos.lerp(other.pos, 0.5),
            pressure: (self.pressure + other.pressure) * 0.5,
            pointer_type: other.pointer_type,
            active: self.active,
        }
    }
}
