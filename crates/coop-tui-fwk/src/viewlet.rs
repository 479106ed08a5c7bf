//! The viewlet contract.
//!
//! A viewlet is the content of one tab. The dispatcher talks to every
//! viewlet through this trait only, so tab-specific behaviour (selection,
//! text buffers, modals, which results matter) stays inside the viewlet.
//!
//! `M` is the program's message type and `C` is read-only context shared by
//! all viewlets (theme, settings, log buffer) that is threaded into every
//! call rather than kept in globals.
//!
//! # Example
//!
//! ```ignore
//! struct Notes { focused: bool }
//!
//! impl Viewlet<Msg, Shared> for Notes {
//!     fn id(&self) -> &'static str { "notes" }
//!     fn title(&self) -> &'static str { "Notes" }
//!     fn render(&self, frame: &mut Frame, geometry: &Geometry, ctx: &Shared) {
//!         frame.render_widget(Paragraph::new("..."), geometry.content());
//!     }
//!     fn focus(&mut self) { self.focused = true; }
//!     fn blur(&mut self) { self.focused = false; }
//!     fn focused(&self) -> bool { self.focused }
//! }
//! ```

use ratatui::Frame;
use smallvec::SmallVec;

use crate::command::Command;
use crate::event::{Event, KeyEvent};
use crate::focus::{EventResult, FocusMode};
use crate::layout::Geometry;

/// One contextual shortcut hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub keys: &'static str,
    pub label: &'static str,
}

impl Shortcut {
    pub const fn new(keys: &'static str, label: &'static str) -> Self {
        Self { keys, label }
    }
}

/// Shortcut hints, usually a handful.
pub type Shortcuts = SmallVec<[Shortcut; 8]>;

/// What a mouse position maps to inside a viewlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// An item row in the list.
    Row(usize),
    /// A named control, such as a form button.
    Action(&'static str),
    /// Nothing clickable.
    None,
}

/// Content module for one tab.
pub trait Viewlet<M, C>: Send {
    /// Unique identifier for this tab.
    fn id(&self) -> &'static str;

    /// Display title shown in the header.
    fn title(&self) -> &'static str;

    /// Startup work, issued once when the program starts.
    #[allow(unused_variables)]
    fn init(&mut self, ctx: &C) -> Command<M> {
        Command::None
    }

    /// Whether this tab has Sidebar/Form/Modal sub-navigation.
    fn navigable(&self) -> bool {
        true
    }

    /// Current input mode.
    fn mode(&self) -> FocusMode {
        FocusMode::Sidebar
    }

    /// Whether a modal overlay is open.
    fn has_modal(&self) -> bool {
        self.mode() == FocusMode::Modal
    }

    /// Whether a text input currently holds the terminal cursor.
    fn input_focused(&self) -> bool {
        false
    }

    /// Handle a key while a modal is open. Only called in that state.
    #[allow(unused_variables)]
    fn handle_modal(&mut self, key: &KeyEvent, ctx: &C) -> Command<M> {
        Command::None
    }

    /// Recognised tab-local keys: directional navigation and item actions.
    ///
    /// Returns `None` when the key is not one of them.
    #[allow(unused_variables)]
    fn handle_nav(&mut self, key: &KeyEvent, ctx: &C) -> Option<Command<M>> {
        None
    }

    /// Generic update for anything the other stages did not take.
    #[allow(unused_variables)]
    fn update(&mut self, event: &Event, ctx: &C) -> (EventResult, Command<M>) {
        (EventResult::Unhandled, Command::None)
    }

    /// Observe a message. Every viewlet sees every message and ignores what
    /// does not concern it.
    #[allow(unused_variables)]
    fn receive(&mut self, message: &M, ctx: &C) -> Command<M> {
        Command::None
    }

    /// Map a cell to something clickable, using the geometry the last frame
    /// was drawn with.
    #[allow(unused_variables)]
    fn hit_test(&self, x: u16, y: u16, geometry: &Geometry) -> Hit {
        Hit::None
    }

    /// React to a click resolved by [`Viewlet::hit_test`].
    #[allow(unused_variables)]
    fn click(&mut self, hit: Hit, ctx: &C) -> Command<M> {
        Command::None
    }

    /// Draw into the regions described by `geometry`.
    fn render(&self, frame: &mut Frame, geometry: &Geometry, ctx: &C);

    /// Called whenever the terminal is resized.
    #[allow(unused_variables)]
    fn resize(&mut self, geometry: &Geometry) {}

    /// Contextual shortcut hints for the footer and help.
    fn shortcuts(&self) -> Shortcuts {
        Shortcuts::new()
    }

    /// Give this viewlet keyboard focus. Idempotent.
    fn focus(&mut self);

    /// Take keyboard focus away. Idempotent.
    fn blur(&mut self);

    /// Whether this viewlet has keyboard focus.
    fn focused(&self) -> bool;

    /// Called when the tab becomes active; resets to the Sidebar mode.
    fn on_activate(&mut self) {}
}

/// A boxed viewlet for type-erased storage.
pub type BoxedViewlet<M, C> = Box<dyn Viewlet<M, C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts_stay_inline() {
        let mut hints = Shortcuts::new();
        for _ in 0..8 {
            hints.push(Shortcut::new("q", "quit"));
        }
        assert!(!hints.spilled());
    }
}
