//! linecon - an embedded line-oriented shell console
//!
//! Runs a shell as a child process and presents it as one editable text
//! surface: shell output scrolls above, the line being typed sits below
//! the input boundary, and Enter sends it to the shell.

pub mod config;
pub mod core;
pub mod history;
pub mod paths;
pub mod ui;

pub use crate::core::console::{ConsoleController, ConsoleOptions, LineTerminator};
