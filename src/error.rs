use thiserror::Error;

use crate::layer::LayerId;

/// Errors raised while creating GPU-side resources.
///
/// `MissingCapability` is fatal at startup: without a float or half-float
/// color buffer no tool can render at all.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("missing required GPU capability: {0}")]
    MissingCapability(&'static str),
    #[error("failed to create {kind}: {reason}")]
    ResourceCreation { kind: &'static str, reason: String },
}

/// Errors raised when a tool setting update is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("{setting} = {value} is outside {min}..={max}")]
    InvalidSetting {
        setting: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{tool} has no {setting} setting")]
    UnsupportedSetting {
        tool: &'static str,
        setting: &'static str,
    },
}

/// Errors reported to callers of the asynchronous readback path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadbackError {
    #[error("GPU sync wait failed")]
    SyncFailed,
    #[error("fence not signaled after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("device lost before readback completed")]
    Lost,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("unknown layer {0}")]
    UnknownLayer(LayerId),
    #[error("surface size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: [usize; 2],
        actual: [usize; 2],
    },
}

/// Errors that can occur during interaction state transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("cannot transition from {from} to {to}")]
    InvalidStateTransition {
        from: &'static str,
        to: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse preferences: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("preference {name} = {value} is out of range")]
    OutOfRange { name: &'static str, value: f32 },
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("worker is gone")]
    Disconnected,
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
