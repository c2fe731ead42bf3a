//! Display buffer
//!
//! The single text surface of the console. An input boundary splits the
//! text into committed scrollback (before the boundary) and the pending
//! input line (at or after it). Every editing method here refuses to touch
//! scrollback, so the boundary holds no matter which caller drives it.
//!
//! All offsets are in characters, not bytes.

/// Console text plus cursor, selection and input boundary
#[derive(Debug, Clone, Default)]
pub struct DisplayBuffer {
    /// Full on-screen text
    text: String,
    /// Length of `text` in characters
    len: usize,
    /// Input boundary; `0 <= boundary <= len`
    boundary: usize,
    /// Byte offset of `boundary` in `text`
    boundary_byte: usize,
    /// Cursor position
    cursor: usize,
    /// Selection anchor (the other end is the cursor)
    anchor: Option<usize>,
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full buffer text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the first editable character
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Committed scrollback
    pub fn committed(&self) -> &str {
        &self.text[..self.boundary_byte]
    }

    /// Text typed since the last submission
    pub fn pending_input(&self) -> &str {
        &self.text[self.boundary_byte..]
    }

    /// Ordered selection range, if any characters are selected
    pub fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        if anchor == self.cursor {
            return None;
        }
        Some((anchor.min(self.cursor), anchor.max(self.cursor)))
    }

    /// Selected text, if any
    pub fn selected_text(&self) -> Option<&str> {
        let (start, end) = self.selection()?;
        Some(&self.text[self.byte_at(start)..self.byte_at(end)])
    }

    /// Insert process output ahead of the pending input.
    ///
    /// The pending input is lifted off, the output appended, the pending
    /// input put back, and the boundary left right before it. Cursor and
    /// selection ends inside the pending region move with it.
    ///
    /// Cost depends on the output and pending input, not the scrollback.
    pub fn merge_output(&mut self, output: &str) {
        if output.is_empty() {
            return;
        }
        let old_boundary = self.boundary;
        let shift = output.chars().count();

        let pending = self.text.split_off(self.boundary_byte);
        self.text.push_str(output);
        self.boundary_byte = self.text.len();
        self.text.push_str(&pending);
        self.len += shift;
        self.boundary += shift;

        if self.cursor >= old_boundary {
            self.cursor += shift;
        }
        if let Some(anchor) = self.anchor.as_mut() {
            if *anchor >= old_boundary {
                *anchor += shift;
            }
        }
    }

    /// Replace the whole pending region; the cursor lands at the end.
    pub fn replace_pending(&mut self, text: &str) {
        self.text.truncate(self.boundary_byte);
        self.text.push_str(text);
        self.len = self.boundary + text.chars().count();
        self.cursor = self.len;
        self.anchor = None;
    }

    /// Insert text at the cursor.
    ///
    /// A cursor inside scrollback is moved to the end first. A selection
    /// entirely inside the pending region is replaced; one that reaches
    /// into scrollback is only collapsed.
    pub fn insert(&mut self, text: &str) {
        if self.cursor < self.boundary {
            self.move_to_end();
        }
        self.delete_selection_or_collapse();
        let at = self.byte_at(self.cursor);
        self.text.insert_str(at, text);
        let count = text.chars().count();
        self.len += count;
        self.cursor += count;
    }

    /// Delete the character before the cursor, or the selection.
    ///
    /// Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        if let Some((start, end)) = self.selection() {
            if start < self.boundary {
                return false;
            }
            self.remove_range(start, end);
            return true;
        }
        self.anchor = None;
        if self.cursor <= self.boundary {
            return false;
        }
        self.remove_range(self.cursor - 1, self.cursor);
        true
    }

    /// Delete the character under the cursor, or the selection.
    pub fn delete_forward(&mut self) -> bool {
        if let Some((start, end)) = self.selection() {
            if start < self.boundary {
                return false;
            }
            self.remove_range(start, end);
            return true;
        }
        self.anchor = None;
        if self.cursor < self.boundary || self.cursor >= self.len {
            return false;
        }
        self.remove_range(self.cursor, self.cursor + 1);
        true
    }

    /// Move the cursor to an absolute offset (clamped to the text).
    ///
    /// With `extend`, the selection grows from the current anchor.
    pub fn move_to(&mut self, pos: usize, extend: bool) {
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
        self.cursor = pos.min(self.len);
    }

    pub fn move_left(&mut self, extend: bool) {
        let pos = self.cursor.saturating_sub(1);
        self.move_to(pos, extend);
    }

    pub fn move_right(&mut self, extend: bool) {
        let pos = self.cursor + 1;
        self.move_to(pos, extend);
    }

    pub fn move_to_end(&mut self) {
        self.move_to(self.len, false);
    }

    /// Finish the pending line.
    ///
    /// Appends a newline, moves the boundary to the new end and returns
    /// the line that was pending.
    pub fn commit_line(&mut self) -> String {
        let line = self.pending_input().to_string();
        self.text.push('\n');
        self.len += 1;
        self.boundary = self.len;
        self.boundary_byte = self.text.len();
        self.cursor = self.len;
        self.anchor = None;
        line
    }

    /// Drop all text and reset the boundary
    pub fn clear(&mut self) {
        self.text.clear();
        self.len = 0;
        self.boundary = 0;
        self.boundary_byte = 0;
        self.cursor = 0;
        self.anchor = None;
    }

    fn delete_selection_or_collapse(&mut self) {
        if let Some((start, end)) = self.selection() {
            if start >= self.boundary {
                self.remove_range(start, end);
                return;
            }
        }
        self.anchor = None;
    }

    /// Remove `[start, end)`; callers guarantee `start >= boundary`.
    fn remove_range(&mut self, start: usize, end: usize) {
        debug_assert!(start >= self.boundary && start <= end && end <= self.len);
        let (from, to) = (self.byte_at(start), self.byte_at(end));
        self.text.replace_range(from..to, "");
        self.len -= end - start;
        self.cursor = start;
        self.anchor = None;
    }

    /// Byte offset of a character offset.
    ///
    /// Offsets in the pending region are found from the cached boundary.
    fn byte_at(&self, index: usize) -> usize {
        let (base_char, base_byte) = if index >= self.boundary {
            (self.boundary, self.boundary_byte)
        } else {
            (0, 0)
        };
        self.text[base_byte..]
            .char_indices()
            .nth(index - base_char)
            .map(|(byte, _)| base_byte + byte)
            .unwrap_or(self.text.len())
    }
}
