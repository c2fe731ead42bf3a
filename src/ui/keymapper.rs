//! Key events for the console
//!
//! Toolkit-independent key events plus the conversion from crossterm.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent as CrosstermKeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Key codes the console distinguishes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Enter,
    Tab,
    Esc,
    Char(char),
    Other,
}

/// A key press
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    /// Printable character produced by the key, if any
    pub ch: Option<char>,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        let ch = match key {
            Key::Char(c) if !modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) => Some(c),
            Key::Tab if modifiers.is_empty() => Some('\t'),
            _ => None,
        };
        Self { key, modifiers, ch }
    }

    /// Unmodified key press
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// Printable character key
    pub fn char(c: char) -> Self {
        Self::plain(Key::Char(c))
    }

    pub fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    pub fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }
}

impl From<CrosstermKeyEvent> for KeyEvent {
    fn from(event: CrosstermKeyEvent) -> Self {
        let key = match event.code {
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::Esc => Key::Esc,
            KeyCode::Char(c) => Key::Char(c),
            _ => Key::Other,
        };
        KeyEvent::new(key, Modifiers::from(event.modifiers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_event(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::from(CrosstermKeyEvent::new(code, mods))
    }

    #[test]
    fn test_char_keys() {
        let event = key_event(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(event.key, Key::Char('a'));
        assert_eq!(event.ch, Some('a'));

        // Shifted characters are still printable
        let event = key_event(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(event.ch, Some('A'));

        // Ctrl+C is a command, not text
        let event = key_event(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(event.ctrl());
        assert_eq!(event.ch, None);
    }

    #[test]
    fn test_navigation_keys() {
        let event = key_event(KeyCode::Left, KeyModifiers::SHIFT);
        assert_eq!(event.key, Key::Left);
        assert!(event.shift());
        assert_eq!(event.ch, None);

        let event = key_event(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(event.key, Key::Other);
    }

    #[test]
    fn test_tab_is_printable() {
        let event = key_event(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(event.ch, Some('\t'));
    }
}
