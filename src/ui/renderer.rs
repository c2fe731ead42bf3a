//! Console renderer using crossterm
//!
//! Lays the display buffer out into wrapped screen rows and draws them with
//! a status bar on the last row.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Palette;
use crate::core::console::ConsoleController;

/// Tab stops every this many columns
const TAB_WIDTH: usize = 8;

/// Key hints shown on the right of the status bar
const SHORTCUTS: &str = "Ctrl+Q: quit | Ctrl+R: restart | Ctrl+L: clear";

/// One screen cell produced from a buffer character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    /// Character offset in the buffer
    pub index: usize,
}

/// Buffer text wrapped to a screen width
#[derive(Debug, Default)]
pub struct Layout {
    pub rows: Vec<Vec<Glyph>>,
    /// Row and column of the cursor
    pub cursor: (usize, usize),
}

impl Layout {
    /// Wrap `text` to `width` columns, locating character offset `cursor`
    pub fn build(text: &str, width: usize, cursor: usize) -> Self {
        let width = width.max(1);
        let mut rows = vec![Vec::new()];
        let mut col = 0;
        let mut cursor_at = None;

        for (index, ch) in text.chars().enumerate() {
            match ch {
                '\n' => {
                    if index == cursor {
                        cursor_at = Some((rows.len() - 1, col));
                    }
                    rows.push(Vec::new());
                    col = 0;
                }
                '\t' => {
                    let spaces = TAB_WIDTH - col % TAB_WIDTH;
                    for n in 0..spaces {
                        if col >= width {
                            rows.push(Vec::new());
                            col = 0;
                        }
                        if n == 0 && index == cursor {
                            cursor_at = Some((rows.len() - 1, col));
                        }
                        push_glyph(&mut rows, ' ', index);
                        col += 1;
                    }
                }
                _ => {
                    // Control characters (including '\r') take no space
                    let char_width = ch.width().unwrap_or(0);
                    if char_width == 0 {
                        if index == cursor {
                            cursor_at = Some((rows.len() - 1, col));
                        }
                        continue;
                    }
                    if col + char_width > width {
                        rows.push(Vec::new());
                        col = 0;
                    }
                    if index == cursor {
                        cursor_at = Some((rows.len() - 1, col));
                    }
                    push_glyph(&mut rows, ch, index);
                    col += char_width;
                }
            }
        }

        let cursor = match cursor_at {
            Some(pos) => pos,
            None if col >= width => {
                rows.push(Vec::new());
                (rows.len() - 1, 0)
            }
            None => (rows.len() - 1, col),
        };
        Self { rows, cursor }
    }

    /// First row to show so the cursor stays visible in `height` rows
    pub fn top_row(&self, height: usize) -> usize {
        let bottom = self.rows.len().max(self.cursor.0 + 1);
        bottom.saturating_sub(height.max(1))
    }
}

fn push_glyph(rows: &mut [Vec<Glyph>], ch: char, index: usize) {
    if let Some(row) = rows.last_mut() {
        row.push(Glyph { ch, index });
    }
}

/// Cut `text` to at most `width` display columns
pub fn truncate_to_width(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (byte, ch) in text.char_indices() {
        used += ch.width().unwrap_or(0);
        if used > width {
            return &text[..byte];
        }
    }
    text
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Style {
    Output,
    Input,
    Selected,
}

/// Console renderer
pub struct Renderer {
    palette: Palette,
    /// Rows scrolled back from the live view
    scroll_offset: usize,
    /// Whether the terminal has been initialized
    initialized: bool,
}

impl Renderer {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            scroll_offset: 0,
            initialized: false,
        }
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableBracketedPaste,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        self.initialized = true;
        Ok(())
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        let _ = execute!(
            stdout,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Show,
            EnableLineWrap,
            DisableBracketedPaste,
            LeaveAlternateScreen
        );
        let _ = stdout.flush();
        terminal::disable_raw_mode()
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
    }

    /// Return to the live view
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Render the console
    pub fn render(&mut self, console: &ConsoleController) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        let width = cols as usize;
        let height = (rows as usize).saturating_sub(1);
        let buffer = console.buffer();

        let layout = Layout::build(buffer.text(), width, buffer.cursor());
        let live_top = layout.top_row(height);
        self.scroll_offset = self.scroll_offset.min(live_top);
        let top = live_top - self.scroll_offset;

        let stdout = io::stdout();
        let mut out = io::BufWriter::with_capacity(65536, stdout.lock());
        queue!(out, Hide)?;

        let boundary = buffer.boundary();
        let selection = buffer.selection();
        for y in 0..height {
            queue!(out, MoveTo(0, y as u16))?;
            if let Some(row) = layout.rows.get(top + y) {
                let mut current = None;
                for glyph in row {
                    let style = match selection {
                        Some((start, end)) if glyph.index >= start && glyph.index < end => Style::Selected,
                        _ if glyph.index < boundary => Style::Output,
                        _ => Style::Input,
                    };
                    if current != Some(style) {
                        self.apply_style(&mut out, style)?;
                        current = Some(style);
                    }
                    queue!(out, Print(glyph.ch))?;
                }
            }
            queue!(out, ResetColor, Clear(ClearType::UntilNewLine))?;
        }

        self.render_status_bar(&mut out, console, width, rows.saturating_sub(1))?;

        let (cursor_row, cursor_col) = layout.cursor;
        if cursor_row >= top && cursor_row < top + height {
            let col = cursor_col.min(width.saturating_sub(1));
            queue!(out, MoveTo(col as u16, (cursor_row - top) as u16), Show)?;
        }

        out.flush()
    }

    fn apply_style<W: Write>(&self, out: &mut W, style: Style) -> io::Result<()> {
        let p = &self.palette;
        match style {
            Style::Output => queue!(out, ResetColor, SetForegroundColor(p.output.to_crossterm())),
            Style::Input => queue!(out, ResetColor, SetForegroundColor(p.input.to_crossterm())),
            Style::Selected => queue!(
                out,
                SetBackgroundColor(p.selection_bg.to_crossterm()),
                SetForegroundColor(p.selection_fg.to_crossterm())
            ),
        }
    }

    /// Render the status bar
    fn render_status_bar<W: Write>(
        &self,
        out: &mut W,
        console: &ConsoleController,
        width: usize,
        y: u16,
    ) -> io::Result<()> {
        queue!(
            out,
            MoveTo(0, y),
            SetBackgroundColor(self.palette.status_bar_bg.to_crossterm()),
            SetForegroundColor(self.palette.status_bar_fg.to_crossterm())
        )?;

        let shell = console.shell().map(|s| s.name()).unwrap_or_else(|| "-".to_string());
        let mut status = format!(
            "{} | {} | {:?}",
            shell,
            console.working_directory().display(),
            console.state()
        );
        if self.scroll_offset > 0 {
            status.push_str(&format!(" | -{}", self.scroll_offset));
        }

        let status = truncate_to_width(&status, width.saturating_sub(2));
        let left = status.width();
        let shortcuts = if left + SHORTCUTS.len() + 3 <= width { SHORTCUTS } else { "" };
        let padding = width.saturating_sub(left + shortcuts.len() + 2);

        queue!(out, Print(format!(" {}{:padding$}{} ", status, "", shortcuts, padding = padding)))?;
        queue!(out, ResetColor)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}
