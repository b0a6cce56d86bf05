//! Turns committed stroke points into evenly spaced brush stamps.
//!
//! The first committed point stamps once. After that each draw walks only the
//! stretch of stroke added since the previous draw: the straight segment to
//! the newest point while fewer than four are committed, otherwise the tail
//! of the four-point Bézier window. A [`StampCursor`] carries the distance
//! since the last stamp from one draw to the next, so stamps stay evenly
//! spaced across sample boundaries and nothing is stamped twice.

use egui::Pos2;

use super::point::Point;
use super::pressure::StrokeDynamics;
use super::store::PointStore;

/// One rasterized instance of the tool shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    pub pos: Pos2,
    /// Stamp radius in world pixels
    pub size: f32,
    pub pressure: f32,
    /// Per-stamp seed for texture dithering
    pub seed: u32,
}

/// Small xorshift generator for per-stamp dither seeds.
#[derive(Debug, Clone)]
pub struct StampSeeder {
    state: u32,
}

impl Default for StampSeeder {
    fn default() -> Self {
        Self::new(0x9e37_79b9)
    }
}

impl StampSeeder {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_seed(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

pub fn cubic_bezier(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    Pos2::new(
        b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
    )
}

/// Average of the chord and the control polygon length.
pub fn estimate_arc_length(start: Pos2, control: Pos2, control2: Pos2, end: Pos2) -> f32 {
    let chord = start.distance(end);
    let polygon = end.distance(control2) + control2.distance(control) + control.distance(start);
    (chord + polygon) / 2.0
}

/// Moves `distance` from `from` toward `to`. A zero-length segment returns `from`.
pub fn step_toward(from: Pos2, to: Pos2, distance: f32) -> Pos2 {
    let total = from.distance(to);
    if total <= f32::EPSILON {
        return from;
    }
    from + (to - from) * (distance / total)
}

/// Pulls the window's `control` point onto the curve implied by its neighbours.
///
/// The point is evaluated as the cubic Bézier at t = 0.5 whose control polygon
/// is `(start, control, control, control2)`, i.e. `(start + 6 control + control2) / 8`.
/// Evenly spaced collinear points are a fixed point. Only runs when the four
/// newest points are all committed; the adjusted point is final once its
/// successor arrives, which costs one sample of latency.
pub fn redistribute(store: &mut PointStore) {
    if store.active_count() < 4 {
        return;
    }
    let start = *store.at(-4);
    let control2 = *store.at(-2);
    let control = store.at_mut(-3);
    control.pos = cubic_bezier(start.pos, control.pos, control.pos, control2.pos, 0.5);
    control.pressure = 0.125 * start.pressure + 0.75 * control.pressure + 0.125 * control2.pressure;
}

/// Walk state that persists between draws of one stroke.
#[derive(Debug, Clone, Default)]
pub struct StampCursor {
    seeder: StampSeeder,
    /// Where the previous draw stopped walking, with the pressure there
    path_end: Option<(Pos2, f32)>,
    /// Distance walked since the last stamp
    since_stamp: f32,
    last_stamp: Option<Pos2>,
    finishing: bool,
}

impl StampCursor {
    /// Forgets the walked path. The seeder keeps running so consecutive
    /// strokes do not repeat their dither.
    pub fn reset(&mut self) {
        self.path_end = None;
        self.since_stamp = 0.0;
        self.last_stamp = None;
        self.finishing = false;
    }

    /// The next draw is the stroke's last: its endpoint gets a stamp even
    /// when it falls short of a full spacing step.
    pub fn finish(&mut self) {
        self.finishing = true;
    }

    pub fn has_started(&self) -> bool {
        self.path_end.is_some()
    }

    pub fn next_seed(&mut self) -> u32 {
        self.seeder.next_seed()
    }
}

/// Upper bound on Bézier samples per window
const MAX_CURVE_SAMPLES: usize = 256;
const MIN_CURVE_SAMPLES: usize = 8;

/// Plans the stamps for the part of the stroke not stamped yet.
///
/// Calling it again without a new committed point plans nothing, unless the
/// cursor is finishing and the endpoint still lacks a stamp.
pub fn plan_stamps(store: &PointStore, dynamics: &StrokeDynamics, cursor: &mut StampCursor) -> Vec<Stamp> {
    let count = store.active_count();
    if count == 0 {
        return Vec::new();
    }
    let end = *store.at(-1);
    let mut stamps = Vec::new();

    let (start_pos, start_pressure) = match cursor.path_end {
        Some(walked) => walked,
        None => {
            let first = *store.at(-(count.min(4) as isize));
            stamps.push(stamp_at(first.pos, first.pressure, &end, dynamics, cursor));
            cursor.since_stamp = 0.0;
            cursor.last_stamp = Some(first.pos);
            (first.pos, first.pressure)
        }
    };

    let spacing = dynamics.spacing_at((start_pressure + end.pressure) * 0.5, end.pointer_type);
    let path = if count < 4 {
        vec![(start_pos, start_pressure), (end.pos, end.pressure)]
    } else {
        curve_tail(store, (start_pos, start_pressure), spacing)
    };
    walk_path(&path, spacing, &end, dynamics, cursor, &mut stamps);
    cursor.path_end = Some((end.pos, end.pressure));

    if cursor.finishing {
        let stamped_end = cursor
            .last_stamp
            .is_some_and(|last| last.distance(end.pos) <= spacing * 1e-3);
        if !stamped_end {
            stamps.push(stamp_at(end.pos, end.pressure, &end, dynamics, cursor));
            cursor.since_stamp = 0.0;
            cursor.last_stamp = Some(end.pos);
        }
    }
    stamps
}

/// The part of the four-point window past `walked`, as a dense polyline.
fn curve_tail(store: &PointStore, walked: (Pos2, f32), spacing: f32) -> Vec<(Pos2, f32)> {
    let (start, control, control2, end) = (store.at(-4), store.at(-3), store.at(-2), store.at(-1));
    let arc_length = estimate_arc_length(start.pos, control.pos, control2.pos, end.pos);
    let samples = ((arc_length / spacing).ceil() as usize)
        .saturating_mul(4)
        .clamp(MIN_CURVE_SAMPLES, MAX_CURVE_SAMPLES);

    let curve: Vec<(Pos2, f32)> = (0..=samples)
        .map(|i| {
            let t = i as f32 / samples as f32;
            let pos = cubic_bezier(start.pos, control.pos, control2.pos, end.pos, t);
            (pos, start.pressure + (end.pressure - start.pressure) * t)
        })
        .collect();

    let resume = curve
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.0.distance(walked.0).total_cmp(&b.0.distance(walked.0)))
        .map_or(0, |(i, _)| i);

    let mut path = Vec::with_capacity(samples + 2 - resume);
    path.push(walked);
    path.extend_from_slice(&curve[resume + 1..]);
    path
}

/// Places a stamp every `spacing` along `path`, continuing the cursor's carry.
fn walk_path(
    path: &[(Pos2, f32)],
    spacing: f32,
    source: &Point,
    dynamics: &StrokeDynamics,
    cursor: &mut StampCursor,
    stamps: &mut Vec<Stamp>,
) {
    let tolerance = spacing * 1e-3;
    for pair in path.windows(2) {
        let ((from, from_pressure), (to, to_pressure)) = (pair[0], pair[1]);
        let len = from.distance(to);
        if len <= f32::EPSILON {
            continue;
        }
        let mut offset = spacing - cursor.since_stamp;
        let mut last_offset = None;
        while offset <= len + tolerance {
            let along = offset.clamp(0.0, len);
            let pressure = from_pressure + (to_pressure - from_pressure) * (along / len);
            let pos = step_toward(from, to, along);
            stamps.push(stamp_at(pos, pressure, source, dynamics, cursor));
            cursor.last_stamp = Some(pos);
            last_offset = Some(along);
            offset += spacing;
        }
        cursor.since_stamp = match last_offset {
            Some(along) => (len - along).max(0.0),
            None => cursor.since_stamp + len,
        };
    }
}

fn stamp_at(pos: Pos2, pressure: f32, source: &Point, dynamics: &StrokeDynamics, cursor: &mut StampCursor) -> Stamp {
    Stamp {
        pos,
        size: dynamics.size_at(pressure, source.pointer_type),
        pressure,
        seed: cursor.next_seed(),
    }
}
