//! Input discipline
//!
//! Classifies every key press aimed at the console before it reaches the
//! display buffer: keeps edits out of scrollback, drives history recall and
//! turns Enter into a submitted line.

use crate::core::buffer::DisplayBuffer;
use crate::history::CommandHistory;
use crate::ui::keymapper::{Key, KeyEvent};

/// What happened to a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Consumed without any effect
    Swallowed,
    /// Buffer text or cursor changed
    Applied,
    /// Not a console key; the host may handle it
    Ignored,
    /// Enter was pressed; the line must be sent to the shell
    Submit(String),
}

/// Key state machine over a display buffer
#[derive(Debug, Default)]
pub struct InputDiscipline {
    history: CommandHistory,
}

impl InputDiscipline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Apply one key press to the buffer
    pub fn handle_key(&mut self, buffer: &mut DisplayBuffer, event: &KeyEvent) -> KeyOutcome {
        let boundary = buffer.boundary();
        let selection_start = buffer.selection().map(|(start, _)| start);

        match event.key {
            Key::Backspace => {
                let blocked = match selection_start {
                    Some(start) => start < boundary,
                    None => buffer.cursor() <= boundary,
                };
                if blocked || !buffer.backspace() {
                    return KeyOutcome::Swallowed;
                }
                KeyOutcome::Applied
            }
            Key::Left => {
                let blocked = match selection_start {
                    // Extending further left from the boundary would reach scrollback
                    Some(start) => start < boundary || (event.shift() && buffer.cursor() <= boundary),
                    None => buffer.cursor() <= boundary,
                };
                if blocked {
                    return KeyOutcome::Swallowed;
                }
                match selection_start {
                    Some(start) if !event.shift() => buffer.move_to(start, false),
                    _ => buffer.move_left(event.shift()),
                }
                KeyOutcome::Applied
            }
            Key::Home => {
                buffer.move_to(boundary, event.shift());
                KeyOutcome::Applied
            }
            Key::Up => {
                let Some(entry) = self.history.recall_older() else {
                    return KeyOutcome::Swallowed;
                };
                buffer.replace_pending(entry);
                KeyOutcome::Applied
            }
            Key::Down => {
                // Not recalling: leave the line alone rather than clearing it
                let Some(entry) = self.history.recall_newer() else {
                    return KeyOutcome::Swallowed;
                };
                buffer.replace_pending(entry);
                KeyOutcome::Applied
            }
            Key::Enter => {
                let line = buffer.commit_line();
                self.history.append(line.clone());
                KeyOutcome::Submit(line)
            }
            _ => {
                if buffer.cursor() < boundary {
                    buffer.move_to_end();
                }
                self.apply_editing_key(buffer, event)
            }
        }
    }

    /// Insert text as if typed (paste)
    pub fn insert_text(&mut self, buffer: &mut DisplayBuffer, text: &str) -> KeyOutcome {
        if text.is_empty() {
            return KeyOutcome::Swallowed;
        }
        buffer.insert(text);
        KeyOutcome::Applied
    }

    fn apply_editing_key(&mut self, buffer: &mut DisplayBuffer, event: &KeyEvent) -> KeyOutcome {
        match event.key {
            Key::Right => buffer.move_right(event.shift()),
            Key::End => buffer.move_to(buffer.len(), event.shift()),
            Key::Delete => {
                if !buffer.delete_forward() {
                    return KeyOutcome::Swallowed;
                }
            }
            _ => match event.ch {
                Some(c) => {
                    let mut encoded = [0u8; 4];
                    buffer.insert(c.encode_utf8(&mut encoded));
                }
                None => return KeyOutcome::Ignored,
            },
        }
        KeyOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::keymapper::Modifiers;

    fn prompt(text: &str) -> DisplayBuffer {
        let mut buffer = DisplayBuffer::new();
        buffer.merge_output(text);
        buffer
    }

    fn type_str(discipline: &mut InputDiscipline, buffer: &mut DisplayBuffer, text: &str) {
        for c in text.chars() {
            discipline.handle_key(buffer, &KeyEvent::char(c));
        }
    }

    fn submit(discipline: &mut InputDiscipline, buffer: &mut DisplayBuffer, line: &str) {
        type_str(discipline, buffer, line);
        discipline.handle_key(buffer, &KeyEvent::plain(Key::Enter));
    }

    #[test]
    fn test_backspace_and_left_at_boundary_are_swallowed() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");

        for key in [Key::Backspace, Key::Left] {
            let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(key));
            assert_eq!(outcome, KeyOutcome::Swallowed);
            assert_eq!(buffer.text(), "$ ");
            assert_eq!(buffer.boundary(), 2);
            assert_eq!(buffer.cursor(), 2);
        }
    }

    #[test]
    fn test_shift_left_cannot_select_into_scrollback() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        type_str(&mut discipline, &mut buffer, "ab");

        let shift_left = KeyEvent::new(Key::Left, Modifiers::SHIFT);
        assert_eq!(discipline.handle_key(&mut buffer, &shift_left), KeyOutcome::Applied);
        assert_eq!(discipline.handle_key(&mut buffer, &shift_left), KeyOutcome::Applied);
        assert_eq!(discipline.handle_key(&mut buffer, &shift_left), KeyOutcome::Swallowed);
        assert_eq!(buffer.selection(), Some((2, 4)));

        // Selection lies inside the pending line, so Backspace removes it
        assert_eq!(
            discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Backspace)),
            KeyOutcome::Applied
        );
        assert_eq!(buffer.text(), "$ ");
    }

    #[test]
    fn test_left_collapses_pending_selection_at_boundary() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        type_str(&mut discipline, &mut buffer, "ab");
        let shift_left = KeyEvent::new(Key::Left, Modifiers::SHIFT);
        discipline.handle_key(&mut buffer, &shift_left);
        discipline.handle_key(&mut buffer, &shift_left);
        assert_eq!(buffer.cursor(), buffer.boundary());

        let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Left));

        assert_eq!(outcome, KeyOutcome::Applied);
        assert_eq!(buffer.selection(), None);
        assert_eq!(buffer.cursor(), 2);
        assert_eq!(buffer.text(), "$ ab");
    }

    #[test]
    fn test_backspace_with_selection_into_scrollback_is_swallowed() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        type_str(&mut discipline, &mut buffer, "ls");
        buffer.move_to(0, true);

        let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Backspace));

        assert_eq!(outcome, KeyOutcome::Swallowed);
        assert_eq!(buffer.text(), "$ ls");
    }

    #[test]
    fn test_home_moves_to_boundary() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("line one\n$ ");
        type_str(&mut discipline, &mut buffer, "echo");

        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Home));

        assert_eq!(buffer.cursor(), buffer.boundary());
        type_str(&mut discipline, &mut buffer, "x");
        assert_eq!(buffer.pending_input(), "xecho");
    }

    #[test]
    fn test_typing_in_scrollback_jumps_to_end() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("output\n");
        type_str(&mut discipline, &mut buffer, "ab");
        buffer.move_to(2, false);

        type_str(&mut discipline, &mut buffer, "c");

        assert_eq!(buffer.text(), "output\nabc");
        assert_eq!(buffer.committed(), "output\n");
    }

    #[test]
    fn test_enter_submits_and_records_history() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        type_str(&mut discipline, &mut buffer, "ls");

        let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Enter));

        assert_eq!(outcome, KeyOutcome::Submit("ls".to_string()));
        assert_eq!(discipline.history().entries(), &["ls"]);
        assert_eq!(buffer.text(), "$ ls\n");
        assert_eq!(buffer.boundary(), buffer.len());
    }

    #[test]
    fn test_empty_enter_is_recorded() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");

        let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Enter));

        assert_eq!(outcome, KeyOutcome::Submit(String::new()));
        assert_eq!(discipline.history().entries(), &[""]);
    }

    #[test]
    fn test_up_recalls_and_clamps() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        submit(&mut discipline, &mut buffer, "a");
        submit(&mut discipline, &mut buffer, "b");
        let up = KeyEvent::plain(Key::Up);

        discipline.handle_key(&mut buffer, &up);
        assert_eq!(buffer.pending_input(), "b");
        discipline.handle_key(&mut buffer, &up);
        assert_eq!(buffer.pending_input(), "a");
        discipline.handle_key(&mut buffer, &up);
        assert_eq!(buffer.pending_input(), "a");
    }

    #[test]
    fn test_down_moves_newer() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        submit(&mut discipline, &mut buffer, "a");
        submit(&mut discipline, &mut buffer, "b");

        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Up));
        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Up));
        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Down));

        assert_eq!(buffer.pending_input(), "b");
    }

    #[test]
    fn test_down_when_not_recalling_keeps_line() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        submit(&mut discipline, &mut buffer, "a");
        type_str(&mut discipline, &mut buffer, "draft");

        let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Down));

        // Typical shells would clear the line here; the console keeps it
        assert_eq!(outcome, KeyOutcome::Swallowed);
        assert_eq!(buffer.pending_input(), "draft");
    }

    #[test]
    fn test_arrows_with_empty_history_are_swallowed() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        type_str(&mut discipline, &mut buffer, "x");

        for key in [Key::Up, Key::Down] {
            let outcome = discipline.handle_key(&mut buffer, &KeyEvent::plain(key));
            assert_eq!(outcome, KeyOutcome::Swallowed);
        }
        assert_eq!(buffer.pending_input(), "x");
    }

    #[test]
    fn test_enter_resets_recall() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        submit(&mut discipline, &mut buffer, "a");
        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Up));
        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Enter));

        assert!(!discipline.history().is_recalling());
        assert_eq!(discipline.history().entries(), &["a", "a"]);
    }

    #[test]
    fn test_delete_and_ctrl_keys() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("$ ");
        type_str(&mut discipline, &mut buffer, "abc");
        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Home));

        discipline.handle_key(&mut buffer, &KeyEvent::plain(Key::Delete));
        assert_eq!(buffer.pending_input(), "bc");

        let ctrl_x = KeyEvent::new(Key::Char('x'), Modifiers::CTRL);
        assert_eq!(discipline.handle_key(&mut buffer, &ctrl_x), KeyOutcome::Ignored);
        assert_eq!(buffer.pending_input(), "bc");
    }

    #[test]
    fn test_paste_inserts_at_end_from_scrollback() {
        let mut discipline = InputDiscipline::new();
        let mut buffer = prompt("out\n");
        buffer.move_to(0, false);

        discipline.insert_text(&mut buffer, "git log");

        assert_eq!(buffer.pending_input(), "git log");
    }
}
