use egui::{Pos2, Vec2};

/// Change of a two-finger gesture since the previous update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchUpdate {
    /// Midpoint of the two touches, in screen space
    pub anchor: Pos2,
    /// Screen-space movement of the midpoint
    pub pan: Vec2,
    /// Ratio of the current to the previous finger distance
    pub scale: f32,
}

/// Tracks simultaneous touch points for pan and pinch-zoom.
#[derive(Debug, Default, Clone)]
pub struct TouchTracker {
    touches: Vec<(u64, Pos2)>,
    last_midpoint: Option<Pos2>,
    last_distance: Option<f32>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new touch and returns the number of active touches.
    pub fn down(&mut self, id: u64, pos: Pos2) -> usize {
        match self.touches.iter_mut().find(|(touch, _)| *touch == id) {
            Some(entry) => entry.1 = pos,
            None => self.touches.push((id, pos)),
        }
        self.touches.len()
    }

    pub fn moved(&mut self, id: u64, pos: Pos2) {
        if let Some(entry) = self.touches.iter_mut().find(|(touch, _)| *touch == id) {
            entry.1 = pos;
        }
    }

    pub fn up(&mut self, id: u64) -> usize {
        self.touches.retain(|(touch, _)| *touch != id);
        self.touches.len()
    }

    pub fn count(&self) -> usize {
        self.touches.len()
    }

    pub fn clear(&mut self) {
        self.touches.clear();
        self.last_midpoint = None;
        self.last_distance = None;
    }

    fn pair(&self) -> Option<(Pos2, Pos2)> {
        match self.touches.as_slice() {
            [(_, a), (_, b), ..] => Some((*a, *b)),
            _ => None,
        }
    }

    pub fn midpoint(&self) -> Option<Pos2> {
        self.pair().map(|(a, b)| a.lerp(b, 0.5))
    }

    fn spread(&self) -> Option<f32> {
        self.pair().map(|(a, b)| a.distance(b))
    }

    /// Captures the start midpoint and distance of a gesture.
    pub fn begin_gesture(&mut self) {
        self.last_midpoint = self.midpoint();
        self.last_distance = self.spread();
    }

    /// Returns the change since the last update and advances the baseline.
    pub fn update(&mut self) -> Option<PinchUpdate> {
        let midpoint = self.midpoint()?;
        let distance = self.spread()?;
        let last_midpoint = self.last_midpoint.unwrap_or(midpoint);
        let scale = match self.last_distance {
            Some(last) if last > f32::EPSILON && distance > f32::EPSILON => distance / last,
            _ => 1.0,
        };
        self.last_midpoint = Some(midpoint);
        self.last_distance = Some(distance);
        Some(PinchUpdate {
            anchor: midpoint,
            pan: midpoint - last_midpoint,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_touches() {
        let mut tracker = TouchTracker::new();
        assert_eq!(tracker.down(1, Pos2::new(0.0, 0.0)), 1);
        assert_eq!(tracker.down(2, Pos2::new(10.0, 0.0)), 2);
        assert_eq!(tracker.down(2, Pos2::new(12.0, 0.0)), 2);
        assert_eq!(tracker.up(1), 1);
    }

    #[test]
    fn test_pinch_update_reports_pan_and_scale() {
        let mut tracker = TouchTracker::new();
        tracker.down(1, Pos2::new(0.0, 0.0));
        tracker.down(2, Pos2::new(10.0, 0.0));
        tracker.begin_gesture();

        tracker.moved(1, Pos2::new(-5.0, 4.0));
        tracker.moved(2, Pos2::new(15.0, 4.0));
        let update = tracker.update().unwrap();
        assert_eq!(update.anchor, Pos2::new(5.0, 4.0));
        assert_eq!(update.pan, Vec2::new(0.0, 4.0));
        assert!((update.scale - 2.0).abs() < 1e-6);

        // Baseline advanced
        let again = tracker.update().unwrap();
        assert_eq!(again.pan, Vec2::ZERO);
        assert_eq!(again.scale, 1.0);
    }

    #[test]
    fn test_single_touch_has_no_gesture() {
        let mut tracker = TouchTracker::new();
        tracker.down(1, Pos2::ZERO);
        assert!(tracker.update().is_none());
    }
}
