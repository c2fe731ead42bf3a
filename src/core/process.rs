//! Shell process session
//!
//! Owns one spawned shell: its lifecycle, the merged stdout/stderr stream
//! and the stdin write path.
//!
//! stdout and stderr share one pipe, so output keeps the order the shell
//! wrote it in. A background thread reads the pipe and posts the text,
//! tagged with the session generation, to a channel drained by the
//! console's event loop.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use os_pipe::PipeReader;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::shell::ShellCommand;

/// Read chunk size for the output threads
const READ_CHUNK: usize = 4096;

/// How long an exited shell may keep its pipes open before the exit is
/// reported anyway (e.g. a background job inherited them)
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Poll interval while waiting for a stopped shell
const STOP_POLL: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to shell: {0}")]
    Write(#[source] io::Error),

    #[error("Write to shell timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("Shell is not running")]
    NotRunning,
}

pub type Result<T> = std::result::Result<T, ProcessError>;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Running,
    Exiting,
    Failed,
}

/// Something that happened in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Decoded output text
    Output(String),
    /// The output pipe reached end of file
    StreamClosed,
}

/// A session event tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMessage {
    pub generation: u64,
    pub event: SessionEvent,
}

/// Timeouts applied by a session
#[derive(Debug, Clone, Copy)]
pub struct SessionTimeouts {
    /// Wait for a write to be acknowledged
    pub write: Duration,
    /// Wait for the shell to exit on stop
    pub stop: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            write: Duration::from_millis(100),
            stop: Duration::from_millis(1000),
        }
    }
}

/// A pending stdin write and where to report its result
struct WriteRequest {
    data: Vec<u8>,
    done: Sender<io::Result<()>>,
}

/// A spawned shell
pub struct ProcessSession {
    /// Generation tag for emitted messages
    generation: u64,
    command: ShellCommand,
    cwd: PathBuf,
    state: SessionState,
    timeouts: SessionTimeouts,
    child: Option<Child>,
    /// Request queue of the stdin writer thread
    input_tx: Option<Sender<WriteRequest>>,
    /// Cleared when the session is torn down
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    /// Output pipes not yet at end of file
    open_streams: usize,
    /// When the exit was first observed, and its code
    exit_seen: Option<(Instant, Option<i32>)>,
}

impl ProcessSession {
    pub fn new(
        generation: u64,
        command: ShellCommand,
        cwd: impl Into<PathBuf>,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            generation,
            command,
            cwd: cwd.into(),
            state: SessionState::Stopped,
            timeouts,
            child: None,
            input_tx: None,
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
            open_streams: 0,
            exit_seen: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn command(&self) -> &ShellCommand {
        &self.command
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Spawn the shell and start streaming its output to `events`
    pub fn start(&mut self, events: &Sender<SessionMessage>) -> Result<()> {
        if self.state != SessionState::Stopped {
            self.stop();
        }
        self.state = SessionState::Starting;
        self.exit_seen = None;

        let (mut child, output) = match self.spawn_child() {
            Ok(spawned) => spawned,
            Err(source) => {
                self.state = SessionState::Failed;
                return Err(ProcessError::Spawn {
                    program: self.command.program.display().to_string(),
                    source,
                });
            }
        };

        self.running.store(true, Ordering::SeqCst);
        self.open_streams = 0;

        self.spawn_reader("output", output, events.clone());
        if let Some(stdin) = child.stdin.take() {
            self.spawn_writer(stdin);
        }

        info!(
            "Shell started: {} (pid {}, generation {}) in {}",
            self.command,
            child.id(),
            self.generation,
            self.cwd.display()
        );
        self.child = Some(child);
        self.state = SessionState::Running;
        Ok(())
    }

    /// Spawn the shell with stdout and stderr both writing into one pipe
    fn spawn_child(&self) -> io::Result<(Child, PipeReader)> {
        let (reader, writer) = os_pipe::pipe()?;
        let stderr = writer.try_clone()?;

        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::piped())
            .stdout(writer)
            .stderr(stderr);
        let child = command.spawn();
        // The command holds the parent's write ends; drop them so the
        // reader sees end of file once the shell exits
        drop(command);

        Ok((child?, reader))
    }

    fn spawn_reader<R>(&mut self, name: &'static str, mut stream: R, events: Sender<SessionMessage>)
    where
        R: Read + Send + 'static,
    {
        let generation = self.generation;
        let running = self.running.clone();
        let handle = thread::Builder::new()
            .name(format!("shell-{}-{}", name, generation))
            .spawn(move || {
                let mut buffer = vec![0u8; READ_CHUNK];
                let mut decoder = Utf8Decoder::default();

                loop {
                    match stream.read(&mut buffer) {
                        Ok(0) => break,
                        Ok(n) => {
                            let text = decoder.decode(&buffer[..n]);
                            if text.is_empty() {
                                continue;
                            }
                            let message = SessionMessage {
                                generation,
                                event: SessionEvent::Output(text),
                            };
                            if !running.load(Ordering::SeqCst) || events.send(message).is_err() {
                                return;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            debug!("Shell {} read ended: {}", name, e);
                            break;
                        }
                    }
                }

                let tail = decoder.finish();
                if !tail.is_empty() {
                    let _ = events.send(SessionMessage {
                        generation,
                        event: SessionEvent::Output(tail),
                    });
                }
                let _ = events.send(SessionMessage {
                    generation,
                    event: SessionEvent::StreamClosed,
                });
            });

        match handle {
            Ok(handle) => {
                self.open_streams += 1;
                self.threads.push(handle);
            }
            Err(e) => warn!("Failed to spawn {} reader thread: {}", name, e),
        }
    }

    fn spawn_writer(&mut self, mut stdin: ChildStdin) {
        let (tx, rx): (Sender<WriteRequest>, Receiver<WriteRequest>) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(format!("shell-stdin-{}", self.generation))
            .spawn(move || {
                for request in rx {
                    let result = stdin.write_all(&request.data).and_then(|_| stdin.flush());
                    let failed = result.is_err();
                    let _ = request.done.send(result);
                    if failed {
                        break;
                    }
                }
            });

        match handle {
            Ok(handle) => {
                self.input_tx = Some(tx);
                self.threads.push(handle);
            }
            Err(e) => warn!("Failed to spawn stdin writer thread: {}", e),
        }
    }

    /// Deliver bytes to the shell's stdin.
    ///
    /// Waits at most the write timeout for the writer to confirm.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if self.state != SessionState::Running {
            return Err(ProcessError::NotRunning);
        }
        let input = self.input_tx.as_ref().ok_or(ProcessError::NotRunning)?;

        let (done_tx, done_rx) = mpsc::channel();
        input
            .send(WriteRequest {
                data: data.to_vec(),
                done: done_tx,
            })
            .map_err(|_| ProcessError::NotRunning)?;

        match done_rx.recv_timeout(self.timeouts.write) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProcessError::Write(e)),
            Err(RecvTimeoutError::Timeout) => Err(ProcessError::WriteTimeout(self.timeouts.write)),
            Err(RecvTimeoutError::Disconnected) => Err(ProcessError::NotRunning),
        }
    }

    /// Record that the output pipe reached end of file
    pub fn stream_closed(&mut self) {
        self.open_streams = self.open_streams.saturating_sub(1);
    }

    /// Check whether the shell exited on its own.
    ///
    /// Returns `Some(code)` once, after the remaining output has drained
    /// (or a short grace period passed). The session is then `Stopped`.
    pub fn poll_exit(&mut self) -> Option<Option<i32>> {
        if self.state != SessionState::Running {
            return None;
        }

        if self.exit_seen.is_none() {
            let child = self.child.as_mut()?;
            match child.try_wait() {
                Ok(Some(status)) => {
                    self.exit_seen = Some((Instant::now(), status.code()));
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!("Failed to query shell status: {}", e);
                    return None;
                }
            }
        }

        let (seen_at, code) = self.exit_seen?;
        if self.open_streams > 0 && seen_at.elapsed() < EXIT_DRAIN_GRACE {
            return None;
        }

        self.state = SessionState::Exiting;
        info!("Shell exited with code {:?} (generation {})", code, self.generation);
        self.teardown();
        Some(code)
    }

    /// Terminate the shell.
    ///
    /// Waits up to the stop timeout; a shell that is still alive after
    /// that is abandoned. Calling this on a stopped session does nothing.
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Stopped => return,
            SessionState::Failed | SessionState::Starting => {
                self.state = SessionState::Stopped;
                return;
            }
            SessionState::Running | SessionState::Exiting => {}
        }

        self.state = SessionState::Exiting;
        self.running.store(false, Ordering::SeqCst);
        // Closing stdin lets the writer thread finish
        self.input_tx = None;

        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.kill() {
                debug!("Kill request failed: {}", e);
            }
            let deadline = Instant::now() + self.timeouts.stop;
            loop {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        debug!("Shell stopped: {}", status);
                        break;
                    }
                    Ok(None) if Instant::now() < deadline => thread::sleep(STOP_POLL),
                    Ok(None) => {
                        warn!(
                            "Shell did not exit within {:?}, abandoning it",
                            self.timeouts.stop
                        );
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to wait for shell: {}", e);
                        break;
                    }
                }
            }
        }

        self.teardown();
    }

    fn teardown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.input_tx = None;
        self.child = None;
        self.open_streams = 0;
        // Threads still blocked on a wedged child are left detached
        for handle in self.threads.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
        self.state = SessionState::Stopped;
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Incremental lossy UTF-8 decoder.
///
/// Sequences split across reads are carried over; invalid bytes become
/// U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.carry.len());
        let mut rest: &[u8] = &self.carry;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.carry = rest.to_vec();
        out
    }

    /// Flush a dangling partial sequence at end of stream
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        tail
    }
}
