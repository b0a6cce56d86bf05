use crate::filter::{PointFilter, ScalarFilter};

use super::point::Point;

/// Slots needed for a cubic window (four committed points) plus the slot
/// currently being written.
pub const POINT_STORE_CAPACITY: usize = 5;

/// Fixed-capacity circular buffer of stroke samples.
///
/// Exactly one slot is "current" (being written). Every other slot is either
/// `active` (committed into this stroke) or stale and waiting to be
/// overwritten. Indexing is relative to the current slot, so `at(-1)` is the
/// most recently committed point.
#[derive(Debug, Clone)]
pub struct PointStore {
    points: Vec<Point>,
    current: usize,
    /// The current slot holds a sample that has not reached the spacing
    /// threshold yet and should be averaged with the next one.
    pending: bool,
    pub(crate) position_filter: PointFilter,
    pub(crate) pressure_filter: ScalarFilter,
}

impl Default for PointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PointStore {
    pub fn new() -> Self {
        Self::with_capacity(POINT_STORE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: vec![Point::default(); capacity.max(POINT_STORE_CAPACITY)],
            current: 0,
            pending: false,
            position_filter: PointFilter::new(),
            pressure_filter: ScalarFilter::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    fn slot(&self, offset: isize) -> usize {
        (self.current as isize + offset).rem_euclid(self.points.len() as isize) as usize
    }

    /// Point at `offset` relative to the current slot; negative looks back.
    pub fn at(&self, offset: isize) -> &Point {
        &self.points[self.slot(offset)]
    }

    pub fn at_mut(&mut self, offset: isize) -> &mut Point {
        let slot = self.slot(offset);
        &mut self.points[slot]
    }

    pub fn current(&self) -> &Point {
        self.at(0)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Writes a sample into the current slot without committing it.
    pub fn write_pending(&mut self, point: Point) {
        *self.at_mut(0) = Point {
            active: false,
            ..point
        };
        self.pending = true;
    }

    /// The most recent committed point, if any.
    pub fn last_active(&self) -> Option<&Point> {
        let point = self.at(-1);
        point.active.then_some(point)
    }

    /// Number of committed points still addressable by lookback.
    pub fn active_count(&self) -> usize {
        (1..self.points.len() as isize)
            .take_while(|&i| self.at(-i).active)
            .count()
    }

    /// Marks `point` active in the current slot and advances the index.
    pub fn commit(&mut self, point: Point) {
        *self.at_mut(0) = Point {
            active: true,
            ..point
        };
        self.current = (self.current + 1) % self.points.len();
        *self.at_mut(0) = Point::default();
        self.pending = false;
    }

    /// Clears active flags and filter state at the end of an interaction.
    pub fn reset(&mut self) {
        for point in &mut self.points {
            point.active = false;
        }
        self.pending = false;
        self.position_filter.reset();
        self.pressure_filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerType;
    use egui::Pos2;

    fn point(x: f32) -> Point {
        Point::new(Pos2::new(x, 0.0), 1.0, PointerType::Pen)
    }

    #[test]
    fn test_commit_advances_and_looks_back() {
        let mut store = PointStore::new();
        store.commit(point(1.0));
        store.commit(point(2.0));
        assert_eq!(store.at(-1).pos.x, 2.0);
        assert_eq!(store.at(-2).pos.x, 1.0);
        assert!(!store.current().active);
        assert_eq!(store.active_count(), 2);
    }

    #[test]
    fn test_index_wraps_around() {
        let mut store = PointStore::new();
        for i in 0..12 {
            store.commit(point(i as f32));
        }
        assert_eq!(store.current_index(), 12 % POINT_STORE_CAPACITY);
        assert_eq!(store.at(-1).pos.x, 11.0);
        assert_eq!(store.at(-4).pos.x, 8.0);
        assert_eq!(store.active_count(), POINT_STORE_CAPACITY - 1);
    }

    #[test]
    fn test_reset_clears_active_and_filters() {
        let mut store = PointStore::new();
        store.position_filter.apply(Pos2::new(1.0, 1.0), 0.5);
        store.commit(point(1.0));
        store.write_pending(point(2.0));
        store.reset();
        assert_eq!(store.active_count(), 0);
        assert!(store.last_active().is_none());
        assert!(!store.is_pending());
        assert!(!store.position_filter.is_seeded());
    }

    #[test]
    fn test_capacity_never_below_cubic_window() {
        assert_eq!(PointStore::with_capacity(2).capacity(), POINT_STORE_CAPACITY);
    }
}
