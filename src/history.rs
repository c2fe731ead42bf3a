//! Command history for the console
//!
//! An append-only, in-memory log of submitted lines with a recall cursor
//! used by Up/Down navigation.

/// Submitted command log
#[derive(Debug, Default, Clone)]
pub struct CommandHistory {
    /// All entries (oldest first)
    entries: Vec<String>,
    /// Recall cursor; `None` means "not recalling"
    cursor: Option<usize>,
}

impl CommandHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command to the end of the log and leave recall mode.
    ///
    /// Empty lines and repeats are kept; the log has no size cap.
    pub fn append(&mut self, command: impl Into<String>) {
        self.entries.push(command.into());
        self.cursor = None;
    }

    /// Step toward older entries.
    ///
    /// The first step jumps to the newest entry; stepping past the oldest
    /// entry stays on it. Returns the entry now under the cursor.
    pub fn recall_older(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Step toward newer entries.
    ///
    /// Returns `None` without moving when not recalling. Stepping past the
    /// newest entry stays on it rather than leaving recall mode.
    pub fn recall_newer(&mut self) -> Option<&str> {
        let current = self.cursor?;
        let index = (current + 1).min(self.entries.len().saturating_sub(1));
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Whether the recall cursor is on an entry
    pub fn is_recalling(&self) -> bool {
        self.cursor.is_some()
    }

    /// Current recall position
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// All entries, oldest first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
