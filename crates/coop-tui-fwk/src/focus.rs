//! Focus and mode state machine.
//!
//! Each sub-navigable tab moves between three modes:
//!
//! ```text
//!            activate                open_modal
//!  Sidebar ───────────▶ Form ───────────────────▶ Modal
//!          ◀───────────      ◀───────────────────
//!              back            confirm / dismiss
//! ```
//!
//! Transitions that do not apply to the current mode leave it unchanged.
//! [`FocusRing`] orders the fields of a form and tracks which one holds
//! focus.

/// Result of event handling that controls propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventResult {
    /// Event was not handled, continue propagation.
    #[default]
    Unhandled,
    /// Event was handled, stop propagation.
    Handled,
}

impl EventResult {
    /// Check if the event was handled.
    #[inline]
    pub fn is_handled(&self) -> bool {
        matches!(self, EventResult::Handled)
    }
}

impl From<bool> for EventResult {
    fn from(handled: bool) -> Self {
        if handled {
            EventResult::Handled
        } else {
            EventResult::Unhandled
        }
    }
}

/// Input mode of a sub-navigable tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    /// Item list has focus.
    #[default]
    Sidebar,
    /// A form or detail pane has focus.
    Form,
    /// A modal overlay intercepts all input.
    Modal,
}

impl FocusMode {
    /// Activating an action item opens its form.
    #[must_use]
    pub fn activate(self) -> Self {
        match self {
            FocusMode::Sidebar => FocusMode::Form,
            other => other,
        }
    }

    /// Cancel or back out of a form.
    #[must_use]
    pub fn back(self) -> Self {
        match self {
            FocusMode::Form => FocusMode::Sidebar,
            other => other,
        }
    }

    /// Activating a source-selection field opens a modal.
    #[must_use]
    pub fn open_modal(self) -> Self {
        match self {
            FocusMode::Form => FocusMode::Modal,
            other => other,
        }
    }

    /// Confirming the modal returns to the form with the value committed.
    #[must_use]
    pub fn confirm(self) -> Self {
        self.close_modal()
    }

    /// Dismissing the modal returns to the form unchanged.
    #[must_use]
    pub fn dismiss(self) -> Self {
        self.close_modal()
    }

    fn close_modal(self) -> Self {
        match self {
            FocusMode::Modal => FocusMode::Form,
            other => other,
        }
    }
}

/// Which part of the UI owns keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// Tabs without sub-navigation; only chrome shortcuts and scrolling apply.
    GlobalChrome,
    TabSidebar,
    TabForm,
    Modal,
}

impl FocusTarget {
    /// Derive the focus target of the active tab.
    pub fn derive(navigable: bool, mode: FocusMode) -> Self {
        match (navigable, mode) {
            // A modal pre-empts everything, even on a non-navigable tab.
            (_, FocusMode::Modal) => FocusTarget::Modal,
            (false, _) => FocusTarget::GlobalChrome,
            (true, FocusMode::Sidebar) => FocusTarget::TabSidebar,
            (true, FocusMode::Form) => FocusTarget::TabForm,
        }
    }
}

/// Ordered set of focusable fields with a single focused member.
///
/// Fields are identified by static keys and visited in registration order,
/// wrapping at both ends.
#[derive(Debug, Clone, Default)]
pub struct FocusRing {
    order: Vec<&'static str>,
    index: Option<usize>,
}

impl FocusRing {
    /// Create a ring over `keys`, focusing the first one.
    pub fn new(keys: &[&'static str]) -> Self {
        let mut ring = Self::default();
        for key in keys {
            ring.register(*key);
        }
        ring.index = (!ring.order.is_empty()).then_some(0);
        ring
    }

    /// Key of the focused field.
    pub fn focused(&self) -> Option<&'static str> {
        self.index.and_then(|i| self.order.get(i)).copied()
    }

    /// Check if a specific field is focused.
    pub fn is_focused(&self, key: &str) -> bool {
        self.focused() == Some(key)
    }

    /// Focus a field by key. Returns `false` if it is not registered.
    pub fn set_focus(&mut self, key: &str) -> bool {
        if let Some(index) = self.order.iter().position(|k| *k == key) {
            self.index = Some(index);
            true
        } else {
            false
        }
    }

    /// Focus a field by index, clamped to the last field.
    pub fn set_index(&mut self, index: usize) {
        if !self.order.is_empty() {
            self.index = Some(index.min(self.order.len() - 1));
        }
    }

    /// Move focus to the next field, wrapping.
    pub fn focus_next(&mut self) -> bool {
        if self.order.is_empty() {
            return false;
        }
        let next = match self.index {
            Some(i) => (i + 1) % self.order.len(),
            None => 0,
        };
        self.index = Some(next);
        true
    }

    /// Move focus to the previous field, wrapping.
    pub fn focus_prev(&mut self) -> bool {
        if self.order.is_empty() {
            return false;
        }
        let len = self.order.len();
        let prev = match self.index {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.index = Some(prev);
        true
    }

    /// Register a field at the end. Duplicates are ignored.
    pub fn register(&mut self, key: &'static str) {
        if !self.order.contains(&key) {
            self.order.push(key);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_result_from_bool() {
        assert_eq!(EventResult::from(true), EventResult::Handled);
        assert_eq!(EventResult::from(false), EventResult::Unhandled);
        assert_eq!(EventResult::default(), EventResult::Unhandled);
    }

    #[test]
    fn test_mode_transitions() {
        use FocusMode::*;
        assert_eq!(Sidebar.activate(), Form);
        assert_eq!(Form.back(), Sidebar);
        assert_eq!(Form.open_modal(), Modal);
        assert_eq!(Modal.confirm(), Form);
        assert_eq!(Modal.dismiss(), Form);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        use FocusMode::*;
        assert_eq!(Sidebar.back(), Sidebar);
        assert_eq!(Sidebar.open_modal(), Sidebar);
        assert_eq!(Sidebar.confirm(), Sidebar);
        assert_eq!(Form.activate(), Form);
        assert_eq!(Form.dismiss(), Form);
        assert_eq!(Modal.activate(), Modal);
        assert_eq!(Modal.back(), Modal);
        assert_eq!(Modal.open_modal(), Modal);
    }

    #[test]
    fn test_focus_target_modal_preempts() {
        assert_eq!(FocusTarget::derive(true, FocusMode::Modal), FocusTarget::Modal);
        assert_eq!(FocusTarget::derive(false, FocusMode::Modal), FocusTarget::Modal);
        assert_eq!(
            FocusTarget::derive(false, FocusMode::Sidebar),
            FocusTarget::GlobalChrome
        );
        assert_eq!(
            FocusTarget::derive(true, FocusMode::Sidebar),
            FocusTarget::TabSidebar
        );
        assert_eq!(FocusTarget::derive(true, FocusMode::Form), FocusTarget::TabForm);
    }

    #[test]
    fn test_ring_navigation_wraps() {
        let mut ring = FocusRing::new(&["name", "cpus", "submit"]);
        assert_eq!(ring.focused(), Some("name"));
        assert!(ring.focus_next());
        assert!(ring.focus_next());
        assert_eq!(ring.focused(), Some("submit"));
        assert!(ring.focus_next());
        assert_eq!(ring.focused(), Some("name"));
        assert!(ring.focus_prev());
        assert_eq!(ring.focused(), Some("submit"));
    }

    #[test]
    fn test_ring_set_focus() {
        let mut ring = FocusRing::new(&["a", "b"]);
        assert!(ring.set_focus("b"));
        assert!(!ring.set_focus("unknown"));
        assert!(ring.is_focused("b"));
        ring.set_index(99);
        assert_eq!(ring.focused(), Some("b"));
        ring.register("a");
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_empty_ring() {
        let mut ring = FocusRing::new(&[]);
        assert!(ring.is_empty());
        assert!(!ring.focus_next());
        assert!(!ring.focus_prev());
        assert_eq!(ring.focused(), None);
    }
}
