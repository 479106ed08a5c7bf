//! Tab management.
//!
//! [`TabSet`] owns one viewlet per tab, keeps exactly one of them active and
//! lays out the header row. Switching tabs blurs the previous viewlet before
//! focusing the next one, so at most one text input ever holds the cursor.

use crate::layout::contains;
use crate::viewlet::{BoxedViewlet, Viewlet};
use ratatui::layout::Rect;

/// Label of the exit control at the right end of the header.
pub const EXIT_LABEL: &str = "[x]";

/// One laid-out header element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub area: Rect,
    pub label: String,
    pub target: HeaderTarget,
}

/// What a header element does when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTarget {
    Tab(usize),
    Exit,
}

/// The set of tabs with a single active member.
pub struct TabSet<M, C> {
    tabs: Vec<BoxedViewlet<M, C>>,
    active_index: usize,
}

impl<M, C> TabSet<M, C> {
    /// Create a new empty tab set.
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            active_index: 0,
        }
    }

    /// Add a tab. The first tab added starts active and focused.
    pub fn add<V: Viewlet<M, C> + 'static>(&mut self, viewlet: V) {
        let mut viewlet: BoxedViewlet<M, C> = Box::new(viewlet);
        if self.tabs.is_empty() {
            viewlet.on_activate();
            viewlet.focus();
        } else {
            viewlet.blur();
        }
        self.tabs.push(viewlet);
    }

    /// Get the number of tabs.
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Check if there are no tabs.
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Get the active tab index.
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Get the active viewlet, if any.
    pub fn active(&self) -> Option<&dyn Viewlet<M, C>> {
        self.tabs.get(self.active_index).map(|t| t.as_ref())
    }

    /// Get a mutable reference to the active viewlet.
    pub fn active_mut(&mut self) -> Option<&mut BoxedViewlet<M, C>> {
        self.tabs.get_mut(self.active_index)
    }

    /// All viewlets in tab order.
    pub fn iter(&self) -> impl Iterator<Item = &BoxedViewlet<M, C>> {
        self.tabs.iter()
    }

    /// All viewlets in tab order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BoxedViewlet<M, C>> {
        self.tabs.iter_mut()
    }

    /// Select a tab by index.
    ///
    /// The destination is reset to its Sidebar mode even when it is already
    /// active. Returns `false` if the index is invalid.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }

        if index != self.active_index {
            if let Some(old) = self.tabs.get_mut(self.active_index) {
                old.blur();
            }
            self.active_index = index;
        }

        if let Some(new) = self.tabs.get_mut(self.active_index) {
            new.on_activate();
            new.focus();
        }
        true
    }

    /// Select the next tab, wrapping around.
    pub fn select_next(&mut self) -> bool {
        if self.tabs.is_empty() {
            return false;
        }
        self.select((self.active_index + 1) % self.tabs.len())
    }

    /// Select the previous tab, wrapping around.
    pub fn select_prev(&mut self) -> bool {
        if self.tabs.is_empty() {
            return false;
        }
        let len = self.tabs.len();
        self.select((self.active_index + len - 1) % len)
    }

    /// Lay out the header row for a terminal `width` cells wide.
    ///
    /// Tab labels read ` 1 Fleet ` and are separated by one space; the
    /// exit control sits at the right edge. Labels that would overlap the
    /// exit control are dropped. Drawing and hit-testing both use this.
    pub fn header_layout(&self, width: u16) -> Vec<HeaderCell> {
        let exit_width = EXIT_LABEL.len() as u16;
        let exit_x = width.saturating_sub(exit_width + 1);
        let mut cells = Vec::with_capacity(self.tabs.len() + 1);
        let mut x: u16 = 1;

        for (index, tab) in self.tabs.iter().enumerate() {
            let label = format!(" {} {} ", index + 1, tab.title());
            let w = label.chars().count() as u16;
            if x.saturating_add(w) > exit_x {
                break;
            }
            cells.push(HeaderCell {
                area: Rect::new(x, 0, w, 1),
                label,
                target: HeaderTarget::Tab(index),
            });
            x += w + 1;
        }

        if width > exit_width {
            cells.push(HeaderCell {
                area: Rect::new(exit_x, 0, exit_width, 1),
                label: EXIT_LABEL.to_string(),
                target: HeaderTarget::Exit,
            });
        }
        cells
    }

    /// Resolve a click on the header row.
    pub fn header_hit(&self, width: u16, x: u16) -> Option<HeaderTarget> {
        self.header_layout(width)
            .into_iter()
            .find(|cell| contains(cell.area, x, 0))
            .map(|cell| cell.target)
    }
}

impl<M, C> Default for TabSet<M, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::FocusMode;
    use crate::layout::Geometry;
    use ratatui::Frame;

    struct Dummy {
        id: &'static str,
        focused: bool,
        mode: FocusMode,
    }

    impl Dummy {
        fn new(id: &'static str) -> Self {
            Self {
                id,
                focused: false,
                mode: FocusMode::Sidebar,
            }
        }
    }

    impl Viewlet<(), ()> for Dummy {
        fn id(&self) -> &'static str {
            self.id
        }
        fn title(&self) -> &'static str {
            self.id
        }
        fn mode(&self) -> FocusMode {
            self.mode
        }
        fn input_focused(&self) -> bool {
            self.focused && self.mode == FocusMode::Form
        }
        fn render(&self, _frame: &mut Frame, _geometry: &Geometry, _ctx: &()) {}
        fn focus(&mut self) {
            self.focused = true;
        }
        fn blur(&mut self) {
            self.focused = false;
        }
        fn focused(&self) -> bool {
            self.focused
        }
        fn on_activate(&mut self) {
            self.mode = FocusMode::Sidebar;
        }
    }

    fn three() -> TabSet<(), ()> {
        let mut tabs = TabSet::new();
        tabs.add(Dummy::new("a"));
        tabs.add(Dummy::new("b"));
        tabs.add(Dummy::new("c"));
        tabs
    }

    fn focused_count(tabs: &TabSet<(), ()>) -> usize {
        tabs.iter().filter(|t| t.focused()).count()
    }

    #[test]
    fn test_first_tab_starts_focused() {
        let tabs = three();
        assert_eq!(tabs.active_index(), 0);
        assert_eq!(focused_count(&tabs), 1);
        assert!(tabs.active().unwrap().focused());
    }

    #[test]
    fn test_select_moves_focus() {
        let mut tabs = three();
        assert!(tabs.select(2));
        assert_eq!(tabs.active().unwrap().id(), "c");
        assert_eq!(focused_count(&tabs), 1);
        assert!(!tabs.select(3));
        assert_eq!(tabs.active_index(), 2);
    }

    #[test]
    fn test_select_resets_destination_mode() {
        let mut tabs: TabSet<(), ()> = TabSet::new();
        tabs.add(Dummy::new("a"));
        let mut b = Dummy::new("b");
        b.mode = FocusMode::Form;
        tabs.add(b);
        assert_eq!(tabs.iter().nth(1).map(|t| t.mode()), Some(FocusMode::Form));

        assert!(tabs.select(1));
        assert_eq!(tabs.active().unwrap().mode(), FocusMode::Sidebar);
        assert_eq!(focused_count(&tabs), 1);
        assert!(tabs.iter().filter(|t| t.input_focused()).count() <= 1);
    }

    #[test]
    fn test_reselecting_active_tab_keeps_single_focus() {
        let mut tabs = three();
        assert!(tabs.select(1));
        assert!(tabs.select(tabs.active_index()));
        assert_eq!(tabs.active_index(), 1);
        assert_eq!(focused_count(&tabs), 1);
        assert!(tabs.active().unwrap().focused());
    }

    #[test]
    fn test_next_prev_wrap() {
        let mut tabs = three();
        assert!(tabs.select_prev());
        assert_eq!(tabs.active_index(), 2);
        assert!(tabs.select_next());
        assert_eq!(tabs.active_index(), 0);
    }

    #[test]
    fn test_header_hits() {
        let tabs = three();
        let cells = tabs.header_layout(80);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].area, Rect::new(1, 0, 5, 1));
        assert_eq!(tabs.header_hit(80, 1), Some(HeaderTarget::Tab(0)));
        assert_eq!(tabs.header_hit(80, 6), None);
        assert_eq!(tabs.header_hit(80, 7), Some(HeaderTarget::Tab(1)));
        assert_eq!(tabs.header_hit(80, 77), Some(HeaderTarget::Exit));
        assert_eq!(tabs.header_hit(80, 79), None);
    }

    #[test]
    fn test_header_drops_overflowing_labels() {
        let tabs = three();
        let cells = tabs.header_layout(12);
        assert!(cells.iter().all(|c| c.area.x + c.area.width <= 12));
        assert_eq!(cells.last().map(|c| c.target), Some(HeaderTarget::Exit));
    }
}
