mod point;
mod pressure;
mod stamping;
mod store;

pub use point::Point;
pub use pressure::{StrokeDynamics, MIN_SPACING};
pub use stamping::{
    cubic_bezier, estimate_arc_length, plan_stamps, redistribute, step_toward, Stamp, StampCursor, StampSeeder,
};
pub use store::{PointStore, POINT_STORE_CAPACITY};
