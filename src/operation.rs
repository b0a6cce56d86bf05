use egui::Pos2;

use crate::config::Preferences;
use crate::input::PointerType;
use crate::stroke::{Point, PointStore, Stamp, StampCursor, StrokeDynamics};
use crate::tool::ToolKind;

/// Mouse and touch lag behind more than pen input at the same setting
const NON_PEN_SMOOTHING_SCALE: f32 = 0.5;

/// The in-flight stroke: its sample store and the tool it belongs to.
///
/// One operation lives for the whole session. It is reset, not rebuilt, at
/// the end of every interaction and whenever the tool changes.
#[derive(Debug, Clone)]
pub struct Operation {
    pub points: PointStore,
    tool: ToolKind,
    ready_to_draw: bool,
    /// Set once a point tool has been applied; further samples are ignored
    wait_until_interaction_end: bool,
    cursor: StampCursor,
    /// Stamps of the most recent draw
    last_stamps: Vec<Stamp>,
    stamp_count: usize,
}

impl Operation {
    pub fn new(tool: ToolKind) -> Self {
        Self {
            points: PointStore::new(),
            tool,
            ready_to_draw: false,
            wait_until_interaction_end: false,
            cursor: StampCursor::default(),
            last_stamps: Vec::new(),
            stamp_count: 0,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switches tools and drops any stroke state.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
        self.reset();
    }

    pub fn is_ready_to_draw(&self) -> bool {
        self.ready_to_draw
    }

    pub fn is_waiting(&self) -> bool {
        self.wait_until_interaction_end
    }

    pub fn last_stamps(&self) -> &[Stamp] {
        &self.last_stamps
    }

    /// Stamps placed since the interaction started
    pub fn stamp_count(&self) -> usize {
        self.stamp_count
    }

    /// Split borrow for a draw call: the store and the stamp cursor.
    pub(crate) fn draw_parts(&mut self) -> (&mut PointStore, &mut StampCursor) {
        (&mut self.points, &mut self.cursor)
    }

    /// Commits a sample still held back by the spacing gate and marks the
    /// next draw as the stroke's last, so the tail up to the release point
    /// gets stamped.
    pub fn finish_stroke(&mut self) {
        if self.wait_until_interaction_end {
            return;
        }
        if self.points.is_pending() {
            let tail = *self.points.current();
            self.points.commit(tail);
            log::trace!("committed pending tail at {:?}", tail.pos);
        }
        if self.points.last_active().is_some() {
            self.cursor.finish();
            self.ready_to_draw = true;
        }
    }

    /// Records a finished draw and clears the ready flag.
    pub(crate) fn finish_draw(&mut self, stamps: Vec<Stamp>) {
        self.stamp_count += stamps.len();
        self.last_stamps = stamps;
        self.ready_to_draw = false;
    }

    /// Runs one raw world-space sample through filtering, drag-lag smoothing
    /// and the spacing gate. Returns the committed point, if any.
    ///
    /// `dynamics` is `None` for point tools, which commit the first sample
    /// and then wait for the interaction to end.
    pub fn prepare(
        &mut self,
        pos: Pos2,
        pressure: f32,
        pointer_type: PointerType,
        prefs: &Preferences,
        zoom: f32,
        dynamics: Option<&StrokeDynamics>,
    ) -> Option<Point> {
        if self.wait_until_interaction_end {
            return None;
        }

        let position_alpha = Preferences::effective_alpha(prefs.position_filtering, zoom);
        let pressure_alpha = Preferences::effective_alpha(prefs.pressure_filtering, zoom);
        let mut filtered = self.points.position_filter.apply(pos, position_alpha);
        let pressure = self.points.pressure_filter.apply(pressure, pressure_alpha);

        if let Some(last) = self.points.last_active() {
            let smoothing = match pointer_type {
                PointerType::Pen => prefs.mouse_smoothing,
                PointerType::Mouse | PointerType::Touch => prefs.mouse_smoothing * NON_PEN_SMOOTHING_SCALE,
            };
            filtered = filtered.lerp(last.pos, smoothing.clamp(0.0, 1.0));
        }

        let mut candidate = Point::new(filtered, pressure, pointer_type);
        if self.points.is_pending() {
            candidate = self.points.current().merged_with(&candidate);
        }

        let Some(dynamics) = dynamics else {
            self.points.commit(candidate);
            self.wait_until_interaction_end = true;
            self.ready_to_draw = true;
            return Some(candidate);
        };

        let accept = match self.points.last_active() {
            None => true,
            Some(last) => {
                let spacing = dynamics.spacing_at(candidate.pressure, pointer_type);
                last.distance(&candidate) >= spacing / 3.0
            }
        };
        if accept {
            self.points.commit(candidate);
            self.ready_to_draw = true;
            log::trace!("committed sample at {:?}", candidate.pos);
            Some(candidate)
        } else {
            self.points.write_pending(candidate);
            None
        }
    }

    /// Clears points, filters and flags at the end of an interaction.
    pub fn reset(&mut self) {
        self.points.reset();
        self.ready_to_draw = false;
        self.wait_until_interaction_end = false;
        self.cursor.reset();
        self.last_stamps.clear();
        self.stamp_count = 0;
    }
}
