//! TUI (Terminal User Interface) for the steering emulator
//!
//! Shows the live axis position on the response curve and edits the
//! active profile while the steering loop keeps running.

pub mod app;
pub mod render;

pub use app::{App, Field, PromptKind, Tab};
