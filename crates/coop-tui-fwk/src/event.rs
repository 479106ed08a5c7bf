//! Event types for the control panel.
//!
//! This module wraps crossterm events into one terminal-input type and
//! defines [`Input`], the single stream the runtime feeds to a program:
//! terminal input interleaved with messages produced by commands.

pub use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crossterm::event::Event as CrosstermEvent;

/// Terminal input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Keyboard event
    Key(KeyEvent),
    /// Mouse event
    Mouse(MouseEvent),
    /// Terminal resize event
    Resize { width: u16, height: u16 },
    /// Terminal window gained focus
    FocusGained,
    /// Terminal window lost focus
    FocusLost,
    /// Bracketed paste
    Paste(String),
}

impl Event {
    /// Build a plain key press without modifiers.
    pub fn key(code: KeyCode) -> Self {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    /// Build a left click at the given cell.
    pub fn click(column: u16, row: u16) -> Self {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    /// The key event, if this is a key press or repeat.
    ///
    /// Release events are filtered out so handlers never see a key twice.
    #[inline]
    pub fn as_key_press(&self) -> Option<&KeyEvent> {
        match self {
            Event::Key(key) if key.kind != KeyEventKind::Release => Some(key),
            _ => None,
        }
    }

    /// Check if this is a specific key press
    #[inline]
    pub fn is_key(&self, code: KeyCode) -> bool {
        self.as_key_press().is_some_and(|key| key.code == code)
    }

    /// Get mouse position if this is a mouse event
    #[inline]
    pub fn mouse_position(&self) -> Option<(u16, u16)> {
        match self {
            Event::Mouse(MouseEvent { column, row, .. }) => Some((*column, *row)),
            _ => None,
        }
    }
}

/// Returns the printable character a key would insert into a text field.
///
/// Keys carrying Control or Alt never count as printable.
#[inline]
pub fn printable(key: &KeyEvent) -> Option<char> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if !c.is_control() => Some(c),
        _ => None,
    }
}

impl From<CrosstermEvent> for Event {
    fn from(event: CrosstermEvent) -> Self {
        match event {
            CrosstermEvent::Key(key) => Event::Key(key),
            CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
            CrosstermEvent::Resize(width, height) => Event::Resize { width, height },
            CrosstermEvent::FocusGained => Event::FocusGained,
            CrosstermEvent::FocusLost => Event::FocusLost,
            CrosstermEvent::Paste(text) => Event::Paste(text),
        }
    }
}

/// Everything a program processes, one at a time.
#[derive(Debug)]
pub enum Input<M> {
    /// Input from the terminal.
    Terminal(Event),
    /// A message produced by a command or by the program itself.
    Message(M),
}
