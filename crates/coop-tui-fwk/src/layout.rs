//! Responsive layout engine.
//!
//! [`Geometry::compute`] is a pure function of the terminal size. The same
//! value is used to draw a frame and to hit-test mouse events against it,
//! so callers compute it once per resize and keep it.
//!
//! Row layout of a viable terminal:
//!
//! ```text
//! y = 0                header (tab labels, exit control)
//! y = 1                divider
//! y = 2                body top border
//! y = 3                list / content headings
//! y = 4 ..             body rows (body_height of them)
//! y = 4 + body_height  body bottom border
//! next                 status row
//! next                 last log line
//! next                 footer hints
//! ```

use ratatui::layout::Rect;

/// Minimum width that renders the normal UI.
pub const MIN_WIDTH: u16 = 60;
/// Minimum height that renders the normal UI.
pub const MIN_HEIGHT: u16 = 15;
/// Rows used by everything except the body rows.
pub const FIXED_OVERHEAD: u16 = 8;
/// Widths below this hide the sidebar.
pub const REGULAR_FROM: u16 = 100;
/// Widths above this use the wide sidebar.
pub const WIDE_ABOVE: u16 = 140;
/// Sidebar width for [`Breakpoint::Regular`].
pub const REGULAR_SIDEBAR: u16 = 18;
/// Sidebar width for [`Breakpoint::Wide`].
pub const WIDE_SIDEBAR: u16 = 28;

/// First body row.
const BODY_TOP: u16 = 4;

/// Terminal width class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    Narrow,
    Regular,
    Wide,
}

impl Breakpoint {
    /// Classify a terminal width.
    pub fn for_width(width: u16) -> Self {
        if width < REGULAR_FROM {
            Breakpoint::Narrow
        } else if width <= WIDE_ABOVE {
            Breakpoint::Regular
        } else {
            Breakpoint::Wide
        }
    }

    /// Sidebar width, zero when the sidebar is hidden.
    pub fn sidebar_width(self) -> u16 {
        match self {
            Breakpoint::Narrow => 0,
            Breakpoint::Regular => REGULAR_SIDEBAR,
            Breakpoint::Wide => WIDE_SIDEBAR,
        }
    }
}

/// Measurements for one terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
    pub breakpoint: Breakpoint,
    pub sidebar_width: u16,
    pub content_width: u16,
    pub body_height: u16,
    /// `false` when only the "terminal too small" advisory may be drawn.
    pub viable: bool,
}

impl Geometry {
    /// Compute geometry for a terminal of `width` x `height` cells.
    pub fn compute(width: u16, height: u16) -> Self {
        let breakpoint = Breakpoint::for_width(width);
        let sidebar_width = breakpoint.sidebar_width();
        let content_width = if sidebar_width == 0 {
            width.saturating_sub(2)
        } else {
            width.saturating_sub(sidebar_width + 3)
        };
        let body_height = height.saturating_sub(FIXED_OVERHEAD).max(1);

        Self {
            width,
            height,
            breakpoint,
            sidebar_width,
            content_width,
            body_height,
            viable: is_viable(width, height),
        }
    }

    /// Whether the sidebar column is drawn.
    #[inline]
    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_width > 0
    }

    /// The whole terminal.
    pub fn area(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Bordered body block, including its borders and heading row.
    pub fn body(&self) -> Rect {
        Rect::new(0, 2, self.width, self.body_height + 3)
    }

    /// Sidebar list rows. Zero-width when hidden.
    pub fn sidebar(&self) -> Rect {
        Rect::new(1, BODY_TOP, self.sidebar_width, self.body_height)
    }

    /// Content rows to the right of the sidebar.
    pub fn content(&self) -> Rect {
        let x = if self.sidebar_visible() {
            self.sidebar_width + 2
        } else {
            1
        };
        Rect::new(x, BODY_TOP, self.content_width, self.body_height)
    }

    /// Body rows spanning the whole width, for tabs without a sidebar list.
    pub fn full_width(&self) -> Rect {
        Rect::new(1, BODY_TOP, self.width.saturating_sub(2), self.body_height)
    }

    /// Heading row above `rect` (sidebar or content).
    pub fn heading_for(&self, rect: Rect) -> Rect {
        Rect::new(rect.x, BODY_TOP - 1, rect.width, 1)
    }

    /// Column of the vertical separator between sidebar and content.
    pub fn separator_x(&self) -> Option<u16> {
        self.sidebar_visible().then_some(self.sidebar_width + 1)
    }

    /// Status row (pending operation, download progress).
    pub fn status(&self) -> Rect {
        Rect::new(0, BODY_TOP + self.body_height + 1, self.width, 1)
    }

    /// Row showing the most recent log line.
    pub fn log_line(&self) -> Rect {
        Rect::new(0, BODY_TOP + self.body_height + 2, self.width, 1)
    }

    /// Footer row with shortcut hints.
    pub fn footer(&self) -> Rect {
        Rect::new(0, BODY_TOP + self.body_height + 3, self.width, 1)
    }

    /// Where a tab's item list is drawn.
    ///
    /// On narrow terminals the list takes over the content area while the
    /// list has focus, and is not drawn at all otherwise.
    pub fn list_rect(&self, list_focused: bool) -> Option<Rect> {
        if self.sidebar_visible() {
            Some(self.sidebar())
        } else if list_focused {
            Some(self.content())
        } else {
            None
        }
    }

    /// Where a tab's detail or form is drawn, see [`Geometry::list_rect`].
    pub fn detail_rect(&self, list_focused: bool) -> Option<Rect> {
        if self.sidebar_visible() || !list_focused {
            Some(self.content())
        } else {
            None
        }
    }

    /// Centered box for a modal overlay, clamped to the content area.
    pub fn modal(&self, width: u16, height: u16) -> Rect {
        let content = self.content();
        let w = width.min(self.width.saturating_sub(4)).max(1);
        let h = height.min(self.body_height + 2).max(1);
        let x = content.x + content.width.saturating_sub(w) / 2;
        let y = (BODY_TOP - 1) + (self.body_height + 2).saturating_sub(h) / 2;
        Rect::new(x.min(self.width.saturating_sub(w)), y, w, h)
    }

    /// Map a cell to a row index inside `rect` holding `count` items.
    ///
    /// Cells outside `rect` miss; cells below the last item clamp to it.
    pub fn row_at(rect: Rect, x: u16, y: u16, count: usize) -> Option<usize> {
        if count == 0 || !contains(rect, x, y) {
            return None;
        }
        let row = usize::from(y - rect.y);
        Some(row.min(count - 1))
    }
}

/// Whether a terminal of this size can render the normal UI.
#[inline]
pub fn is_viable(width: u16, height: u16) -> bool {
    width >= MIN_WIDTH && height >= MIN_HEIGHT
}

/// Whether the cell lies inside `rect`.
#[inline]
pub fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x
        && y >= rect.y
        && u32::from(x) < u32::from(rect.x) + u32::from(rect.width)
        && u32::from(y) < u32::from(rect.y) + u32::from(rect.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_scenario() {
        let g = Geometry::compute(120, 40);
        assert_eq!(g.breakpoint, Breakpoint::Regular);
        assert_eq!(g.sidebar_width, 18);
        assert_eq!(g.content_width, 99);
        assert_eq!(g.body_height, 32);
        assert!(g.viable);
    }

    #[test]
    fn test_breakpoint_boundaries() {
        for w in [60u16, 80, 99] {
            let g = Geometry::compute(w, 30);
            assert_eq!(g.breakpoint, Breakpoint::Narrow);
            assert_eq!(g.sidebar_width, 0);
            assert_eq!(g.content_width, w - 2);
        }
        for w in [100u16, 120, 140] {
            let g = Geometry::compute(w, 30);
            assert_eq!(g.breakpoint, Breakpoint::Regular);
            assert_eq!(g.sidebar_width, 18);
        }
        for w in [141u16, 200, u16::MAX] {
            let g = Geometry::compute(w, 30);
            assert_eq!(g.breakpoint, Breakpoint::Wide);
            assert_eq!(g.sidebar_width, 28);
        }
    }

    #[test]
    fn test_viability_gate() {
        for (w, h) in [(59, 40), (0, 0), (200, 14), (60, 14), (1, 100)] {
            assert!(!Geometry::compute(w, h).viable, "{w}x{h}");
        }
        assert!(Geometry::compute(60, 15).viable);
    }

    #[test]
    fn test_body_height_floor() {
        assert_eq!(Geometry::compute(80, 3).body_height, 1);
        assert_eq!(Geometry::compute(80, 9).body_height, 1);
        assert_eq!(Geometry::compute(80, 10).body_height, 2);
    }

    #[test]
    fn test_rows_fill_terminal() {
        let g = Geometry::compute(120, 40);
        assert_eq!(g.footer().y, 39);
        assert_eq!(g.status().y, 37);
        assert_eq!(g.sidebar(), Rect::new(1, 4, 18, 32));
        assert_eq!(g.content(), Rect::new(20, 4, 99, 32));
        // content ends right before the right border
        assert_eq!(g.content().x + g.content().width, 119);
        assert_eq!(g.full_width(), Rect::new(1, 4, 118, 32));
    }

    #[test]
    fn test_narrow_list_takes_content() {
        let g = Geometry::compute(80, 30);
        assert_eq!(g.list_rect(true), Some(g.content()));
        assert_eq!(g.list_rect(false), None);
        assert_eq!(g.detail_rect(true), None);
        assert_eq!(g.detail_rect(false), Some(g.content()));
        assert!(g.separator_x().is_none());
    }

    #[test]
    fn test_row_at_clamps() {
        let rect = Rect::new(1, 4, 18, 10);
        assert_eq!(Geometry::row_at(rect, 2, 4, 3), Some(0));
        assert_eq!(Geometry::row_at(rect, 2, 6, 3), Some(2));
        assert_eq!(Geometry::row_at(rect, 2, 12, 3), Some(2));
        assert_eq!(Geometry::row_at(rect, 0, 4, 3), None);
        assert_eq!(Geometry::row_at(rect, 2, 14, 3), None);
        assert_eq!(Geometry::row_at(rect, 2, 5, 0), None);
    }

    #[test]
    fn test_modal_stays_on_screen() {
        let g = Geometry::compute(60, 15);
        let m = g.modal(200, 200);
        assert!(m.x + m.width <= g.width);
        assert!(m.y + m.height <= g.height);
    }
}
