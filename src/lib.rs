#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod camera;
pub mod command;
pub mod compositor;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod gpu;
pub mod input;
pub mod layer;
pub mod operation;
pub mod renderer;
pub mod scheduler;
pub mod state;
pub mod stroke;
pub mod texture_manager;
pub mod tool;
pub mod util;
pub mod worker;

pub use app::PaintApp;
pub use camera::Camera;
pub use command::{Command, CommandError, CommandResult};
pub use compositor::Compositor;
pub use config::Preferences;
pub use event::{EditorEvent, EventBus};
pub use input::{InputEvent, PointerType};
pub use renderer::Renderer;
pub use state::{EditorContext, InteractionState};
pub use tool::{ToolKind, ToolSetting};
