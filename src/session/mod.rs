//! The interactive layer: a [`Session`] owns the document and view state,
//! the input handlers drive it from keys, and the renderer turns it back
//! into text.

pub mod app;
pub mod commands;
pub mod input;
pub mod render;
pub mod scheduler;
pub mod terminal;
pub mod undo;

pub use app::{Session, SessionError};
pub use commands::Command;
pub use input::{InputState, Mode};
