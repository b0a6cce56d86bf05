use super::blend::BlendState;
use super::fence::{Fence, FenceStatus, Readback, DEFAULT_MAX_ATTEMPTS};
use super::program::{StampProgram, VertexBuffer, UNIT_QUAD};
use super::surface::{ColorDepth, Surface};
use crate::error::{ReadbackError, RenderError};

/// Features reported by the rendering context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub float_color_buffer: bool,
    pub half_float_color_buffer: bool,
    pub max_surface_size: usize,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            float_color_buffer: true,
            half_float_color_buffer: true,
            max_surface_size: 8192,
        }
    }
}

/// Creates surfaces and programs and owns the queue of pending fences.
#[derive(Debug)]
pub struct Device {
    capabilities: Capabilities,
    pending: Vec<Fence>,
    frame: u64,
    lost: bool,
}

impl Device {
    /// Fails when neither float nor half-float color buffers are available.
    pub fn new(capabilities: Capabilities) -> Result<Self, RenderError> {
        if !capabilities.float_color_buffer && !capabilities.half_float_color_buffer {
            return Err(RenderError::MissingCapability("float or half-float color buffer"));
        }
        log::info!("device ready: {:?}", capabilities);
        Ok(Self {
            capabilities,
            pending: Vec::new(),
            frame: 0,
            lost: false,
        })
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    fn check_alive(&self, kind: &'static str) -> Result<(), RenderError> {
        if self.lost {
            return Err(RenderError::ResourceCreation {
                kind,
                reason: "device lost".to_string(),
            });
        }
        Ok(())
    }

    pub fn create_surface(&self, width: usize, height: usize) -> Result<Surface, RenderError> {
        self.check_alive("surface")?;
        let max = self.capabilities.max_surface_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RenderError::ResourceCreation {
                kind: "surface",
                reason: format!("{width}x{height} is outside 1..={max}"),
            });
        }
        Ok(Surface::new(width, height))
    }

    pub fn create_vertex_buffer(&self, vertices: &[[f32; 2]]) -> Result<VertexBuffer, RenderError> {
        self.check_alive("vertex buffer")?;
        if vertices.len() < 3 || vertices.iter().flatten().any(|v| !v.is_finite()) {
            return Err(RenderError::ResourceCreation {
                kind: "vertex buffer",
                reason: format!("{} vertices do not form a primitive", vertices.len()),
            });
        }
        Ok(VertexBuffer::new(vertices.to_vec()))
    }

    pub fn create_program(
        &self,
        label: &'static str,
        blend: BlendState,
        hard_edge: bool,
    ) -> Result<StampProgram, RenderError> {
        self.check_alive("program")?;
        if !(0.0..=1.0).contains(&blend.constant_alpha) {
            return Err(RenderError::ResourceCreation {
                kind: "program",
                reason: format!("{label}: blend constant alpha {} out of range", blend.constant_alpha),
            });
        }
        let quad = self.create_vertex_buffer(&UNIT_QUAD)?;
        log::debug!("created stamp program {label}");
        Ok(StampProgram::new(label, blend, hard_edge, quad))
    }

    /// Inserts a fence after all work queued so far.
    pub fn fence(&mut self) -> Fence {
        let fence = Fence::new();
        if self.lost {
            fence.fail(ReadbackError::Lost);
        } else {
            self.pending.push(fence.clone());
        }
        fence
    }

    /// Starts an asynchronous readback of `surface`.
    pub fn read_pixels_async(&mut self, surface: &Surface, depth: ColorDepth) -> Readback {
        let pack = surface.read_pixels(depth);
        Readback::new(self.fence(), pack, DEFAULT_MAX_ATTEMPTS)
    }

    /// Completes queued work, signaling every pending fence. Called once per frame.
    pub fn flush(&mut self) {
        if self.lost {
            return;
        }
        self.frame += 1;
        for fence in self.pending.drain(..) {
            fence.signal();
        }
    }

    /// Fails pending fences; resource creation fails from here on.
    pub fn lose(&mut self) {
        log::warn!("device lost with {} pending fences", self.pending.len());
        self.lost = true;
        for fence in self.pending.drain(..) {
            fence.fail(ReadbackError::Lost);
        }
    }

    pub fn pending_fences(&self) -> usize {
        self.pending
            .iter()
            .filter(|fence| fence.status() == FenceStatus::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::future::Future;

    #[test]
    fn test_missing_float_buffers_is_fatal() {
        let caps = Capabilities {
            float_color_buffer: false,
            half_float_color_buffer: false,
            ..Default::default()
        };
        assert!(matches!(Device::new(caps), Err(RenderError::MissingCapability(_))));
    }

    #[test]
    fn test_half_float_alone_is_enough() {
        let caps = Capabilities {
            float_color_buffer: false,
            ..Default::default()
        };
        assert!(Device::new(caps).is_ok());
    }

    #[test]
    fn test_surface_size_validated() {
        let device = Device::new(Capabilities::default()).unwrap();
        let err = device.create_surface(0, 10).unwrap_err();
        assert!(err.to_string().contains("surface"));
    }

    #[test]
    fn test_readback_resolves_after_flush() {
        let mut device = Device::new(Capabilities::default()).unwrap();
        let surface = device.create_surface(2, 2).unwrap();
        let readback = device.read_pixels_async(&surface, ColorDepth::Rgba8);
        assert_eq!(device.pending_fences(), 1);
        device.flush();
        let pixels = block_on(readback).unwrap();
        assert_eq!(pixels.data.len(), 16);
    }

    #[test]
    fn test_readback_times_out_without_flush() {
        let mut device = Device::new(Capabilities::default()).unwrap();
        let surface = device.create_surface(1, 1).unwrap();
        let mut readback = device.read_pixels_async(&surface, ColorDepth::Rgba8);
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        let mut result = None;
        for _ in 0..=DEFAULT_MAX_ATTEMPTS {
            if let std::task::Poll::Ready(r) = std::pin::Pin::new(&mut readback).poll(&mut cx) {
                result = Some(r);
                break;
            }
        }
        assert_eq!(
            result,
            Some(Err(ReadbackError::Timeout {
                attempts: DEFAULT_MAX_ATTEMPTS
            }))
        );
    }

    #[test]
    fn test_lost_device_fails_readback() {
        let mut device = Device::new(Capabilities::default()).unwrap();
        let surface = device.create_surface(1, 1).unwrap();
        let readback = device.read_pixels_async(&surface, ColorDepth::Rgba8);
        device.lose();
        assert_eq!(block_on(readback), Err(ReadbackError::Lost));
        assert!(device.create_program("brush", BlendState::SRC_OVER, false).is_err());
    }
}
