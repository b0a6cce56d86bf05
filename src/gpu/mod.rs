//! Software model of the GPU resources the stamping and compositing code uses.

mod blend;
mod device;
mod fence;
mod program;
mod surface;

pub use blend::{BlendEquation, BlendFactor, BlendState};
pub use device::{Capabilities, Device};
pub use fence::{Fence, FenceStatus, Readback, DEFAULT_MAX_ATTEMPTS};
pub use program::{StampProgram, StampUniforms, VertexBuffer, UNIT_QUAD};
pub use surface::{premultiplied, unmultiply, BoundingBox, ColorDepth, PixelBuffer, Surface};
