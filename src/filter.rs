//! Exponential smoothing of noisy pointer signals.
//!
//! `smoothed = alpha * sample + (1 - alpha) * smoothed`, seeded by the first
//! sample after construction or `reset()`.

use egui::Pos2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarFilter {
    value: Option<f32>,
}

impl ScalarFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, sample: f32, alpha: f32) -> f32 {
        let alpha = alpha.clamp(f32::EPSILON, 1.0);
        let next = match self.value {
            Some(prev) => alpha * sample + (1.0 - alpha) * prev,
            None => sample,
        };
        self.value = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.value = None;
    }

    pub fn is_seeded(&self) -> bool {
        self.value.is_some()
    }
}

/// Two-dimensional form used for pointer positions
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointFilter {
    x: ScalarFilter,
    y: ScalarFilter,
}

impl PointFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, sample: Pos2, alpha: f32) -> Pos2 {
        Pos2::new(self.x.apply(sample.x, alpha), self.y.apply(sample.y, alpha))
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    pub fn is_seeded(&self) -> bool {
        self.x.is_seeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut filter = ScalarFilter::new();
        assert_eq!(filter.apply(0.8, 0.1), 0.8);
    }

    #[test]
    fn test_smoothing_blends_toward_sample() {
        let mut filter = ScalarFilter::new();
        filter.apply(0.0, 0.5);
        assert_eq!(filter.apply(1.0, 0.5), 0.5);
        assert_eq!(filter.apply(1.0, 0.5), 0.75);
    }

    #[test]
    fn test_reset_matches_fresh_filter() {
        let mut used = PointFilter::new();
        used.apply(Pos2::new(50.0, 50.0), 0.3);
        used.apply(Pos2::new(80.0, 10.0), 0.3);
        used.reset();

        let mut fresh = PointFilter::new();
        let sample = Pos2::new(3.0, 4.0);
        assert_eq!(used.apply(sample, 0.3), fresh.apply(sample, 0.3));
        assert_eq!(used.apply(sample, 0.3), fresh.apply(sample, 0.3));
    }

    #[test]
    fn test_alpha_one_disables_smoothing() {
        let mut filter = PointFilter::new();
        filter.apply(Pos2::new(0.0, 0.0), 1.0);
        assert_eq!(filter.apply(Pos2::new(10.0, -4.0), 1.0), Pos2::new(10.0, -4.0));
    }
}
