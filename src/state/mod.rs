pub mod context;
mod interaction;

pub use context::EditorContext;
pub use interaction::InteractionState;
