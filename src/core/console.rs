//! Console controller
//!
//! Ties the shell session, display buffer and input discipline together
//! and exposes the operations the editor shell calls.
//!
//! Everything here runs on one thread. Shell output arrives through a
//! channel and is merged into the buffer only from [`ConsoleController::pump`],
//! so merges and key handling never overlap.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::{debug, error, info, warn};

use super::buffer::DisplayBuffer;
use super::discipline::{InputDiscipline, KeyOutcome};
use super::process::{ProcessSession, SessionEvent, SessionMessage, SessionState, SessionTimeouts};
use super::shell::{ShellCommand, ShellResolver};
use crate::config::{Config, RunOptions};
use crate::history::CommandHistory;
use crate::paths;
use crate::ui::keymapper::KeyEvent;

/// Messages merged per [`ConsoleController::pump`] call, so a flood of
/// output cannot hold up key handling
const PUMP_BATCH: usize = 256;

/// Line ending appended to submitted lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTerminator {
    Lf,
    Crlf,
}

impl LineTerminator {
    /// Convention of the host platform
    pub fn host() -> Self {
        if cfg!(windows) {
            LineTerminator::Crlf
        } else {
            LineTerminator::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::Crlf => "\r\n",
        }
    }

    pub fn terminate(self, line: &str) -> String {
        let mut out = String::with_capacity(line.len() + 2);
        out.push_str(line);
        out.push_str(self.as_str());
        out
    }
}

/// Settings for a console instance
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// Fixed shell; resolved from PATH when unset
    pub shell: Option<ShellCommand>,
    pub timeouts: SessionTimeouts,
    pub line_terminator: LineTerminator,
    pub run: RunOptions,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            shell: None,
            timeouts: SessionTimeouts::default(),
            line_terminator: LineTerminator::host(),
            run: RunOptions::default(),
        }
    }
}

impl ConsoleOptions {
    pub fn from_config(config: &Config) -> Self {
        let resolver = ShellResolver::new();
        Self {
            shell: config
                .shell
                .as_deref()
                .map(|shell| resolver.from_override(shell, config.shell_args.as_deref())),
            timeouts: config.timeouts(),
            line_terminator: LineTerminator::host(),
            run: config.run.clone(),
        }
    }
}

/// An embedded console: one shell, one buffer, one input line
pub struct ConsoleController {
    options: ConsoleOptions,
    resolver: ShellResolver,
    cwd: PathBuf,
    session: Option<ProcessSession>,
    /// Generation of the most recently created session
    generation: u64,
    events_tx: Sender<SessionMessage>,
    events_rx: Receiver<SessionMessage>,
    buffer: DisplayBuffer,
    discipline: InputDiscipline,
}

impl ConsoleController {
    /// Create a console; no shell runs until [`start`](Self::start)
    pub fn new(options: ConsoleOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            options,
            resolver: ShellResolver::new(),
            cwd: paths::absolute_path(Path::new(".")),
            session: None,
            generation: 0,
            events_tx,
            events_rx,
            buffer: DisplayBuffer::new(),
            discipline: InputDiscipline::new(),
        }
    }

    /// Start a shell in `cwd`, replacing any running one
    pub fn start(&mut self, cwd: impl AsRef<Path>) {
        self.cwd = paths::absolute_path(cwd.as_ref());
        self.spawn_session();
    }

    /// Terminate the shell. Buffer and history are kept.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            info!("Console shell stopped (generation {})", session.generation());
        }
    }

    /// Stop and start again in the current working directory
    pub fn restart(&mut self) {
        self.spawn_session();
    }

    /// Wipe the display; the shell keeps running
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Switch directory and restart the shell there
    pub fn set_working_directory(&mut self, path: impl AsRef<Path>) {
        self.cwd = paths::absolute_path(path.as_ref());
        info!("Console working directory: {}", self.cwd.display());
        self.restart();
    }

    /// Send a line to the shell without touching the input line or history
    pub fn execute_line(&mut self, command: &str) {
        self.send_line(command);
    }

    /// Run a file using the configured run rules
    ///
    /// Returns false when no rule matches the file name.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.options.run.command_for(path) {
            Some(command) => {
                info!("Running {}: {}", path.display(), command);
                self.execute_line(&command);
                true
            }
            None => {
                warn!("No run command for {}", path.display());
                self.append_notice(&format!("[no run command for {}]\n", path.display()));
                false
            }
        }
    }

    /// Route a key press through the input discipline
    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        let outcome = self.discipline.handle_key(&mut self.buffer, event);
        if let KeyOutcome::Submit(line) = &outcome {
            self.send_line(line);
        }
        outcome
    }

    /// Insert pasted text into the input line
    pub fn paste(&mut self, text: &str) -> KeyOutcome {
        self.discipline.insert_text(&mut self.buffer, text)
    }

    /// Merge pending shell output into the buffer.
    ///
    /// Handles at most a fixed batch of messages per call; the rest waits
    /// for the next call. Returns whether the buffer changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        let live = self.session.as_ref().map(ProcessSession::generation);
        let mut drained = false;

        for _ in 0..PUMP_BATCH {
            let message = match self.events_rx.try_recv() {
                Ok(message) => message,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    drained = true;
                    break;
                }
            };
            if Some(message.generation) != live {
                debug!("Discarding output from stale generation {}", message.generation);
                continue;
            }
            match message.event {
                SessionEvent::Output(text) => {
                    self.buffer.merge_output(&text);
                    changed = true;
                }
                SessionEvent::StreamClosed => {
                    if let Some(session) = self.session.as_mut() {
                        session.stream_closed();
                    }
                }
            }
        }

        // The exit line must follow all queued output
        if !drained {
            return changed;
        }
        let exit = self.session.as_mut().and_then(ProcessSession::poll_exit);
        if let Some(code) = exit {
            let line = match code {
                Some(code) => format!("[shell exited with code {}]\n", code),
                None => "[shell exited]\n".to_string(),
            };
            self.append_notice(&line);
            changed = true;
        }

        changed
    }

    pub fn buffer(&self) -> &DisplayBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &CommandHistory {
        self.discipline.history()
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(ProcessSession::state)
            .unwrap_or(SessionState::Stopped)
    }

    /// Command line of the current session
    pub fn shell(&self) -> Option<&ShellCommand> {
        self.session.as_ref().map(ProcessSession::command)
    }

    pub fn working_directory(&self) -> &Path {
        &self.cwd
    }

    fn spawn_session(&mut self) {
        self.stop();
        self.generation += 1;

        let command = match &self.options.shell {
            Some(shell) => shell.clone(),
            None => self.resolver.resolve(),
        };
        let mut session = ProcessSession::new(
            self.generation,
            command.clone(),
            self.cwd.clone(),
            self.options.timeouts,
        );

        match session.start(&self.events_tx) {
            Ok(()) => {
                let line = format!("[shell started in {}]\n", self.cwd.display());
                self.append_notice(&line);
            }
            Err(e) => {
                error!("Failed to start shell {}: {}", command, e);
                self.append_notice(&format!("[{}]\n", e));
            }
        }
        self.session = Some(session);
    }

    fn send_line(&mut self, line: &str) {
        let data = self.options.line_terminator.terminate(line);
        match self.session.as_ref() {
            Some(session) => {
                if let Err(e) = session.write(data.as_bytes()) {
                    warn!("Dropped input for shell: {}", e);
                }
            }
            None => debug!("No shell running; dropped {:?}", line),
        }
    }

    /// Merge a console-generated line, starting on a fresh line
    fn append_notice(&mut self, text: &str) {
        let committed = self.buffer.committed();
        if !committed.is_empty() && !committed.ends_with('\n') {
            self.buffer.merge_output("\n");
        }
        self.buffer.merge_output(text);
    }
}

impl Drop for ConsoleController {
    fn drop(&mut self) {
        self.stop();
    }
}
