/// Get the current time in seconds since the UNIX epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn current_time_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Get the current time in seconds since page load
#[cfg(target_arch = "wasm32")]
pub fn current_time_secs() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|perf| perf.now() / 1000.0)
        .unwrap_or(0.0)
}

/// Measures the time between consecutive frames
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call, capped at a quarter second so a
    /// stalled window does not dump a long idle span into one frame.
    pub fn delta(&mut self) -> f32 {
        self.delta_at(current_time_secs())
    }

    fn delta_at(&mut self, now: f64) -> f32 {
        let dt = self.last.map_or(0.0, |last| (now - last).max(0.0));
        self.last = Some(now);
        dt.min(0.25) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_has_no_delta() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.delta_at(10.0), 0.0);
        assert!((clock.delta_at(10.1) - 0.1).abs() < 1e-6);
        assert_eq!(clock.delta_at(20.0), 0.25);
    }
}
