//! Core console components.
//!
//! - **shell**: picks the shell program and its arguments
//! - **process**: one spawned shell with merged output and a stdin writer
//! - **buffer**: the display text and its input boundary
//! - **discipline**: key handling over the buffer
//! - **console**: the controller tying them together
//!
//! # Architecture
//!
//! ```text
//! ConsoleController
//! ├── ProcessSession (shell I/O, reader threads → channel)
//! ├── DisplayBuffer (scrollback + pending input)
//! └── InputDiscipline
//!     └── CommandHistory
//! ```

pub mod buffer;
pub mod console;
pub mod discipline;
pub mod process;
pub mod shell;
