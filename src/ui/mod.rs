//! User interface rendering and input handling.
//!
//! - **keymapper**: crossterm key events to console key events
//! - **renderer**: draws the console buffer and status bar

pub mod keymapper;
pub mod renderer;

pub use keymapper::*;
pub use renderer::*;
