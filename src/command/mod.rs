mod commands;

use thiserror::Error;

use crate::error::{ConfigError, LayerError, RenderError, ToolError, TransitionError};

pub use commands::Command;

/// Result type for command operations
pub type CommandResult = Result<(), CommandError>;

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// The command cannot be executed in the current state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
