//! Scrolling item lists.
//!
//! Rendering and hit-testing derive the scroll offset from the same inputs,
//! so a click lands on the row that was drawn under it.

use coop_tui_fwk::{Geometry, Rect};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::theme::Theme;

/// First visible item when `selected` must stay on screen.
pub fn scroll_offset(selected: usize, height: u16) -> usize {
    let height = usize::from(height.max(1));
    selected.saturating_sub(height - 1)
}

/// Item index under a cell, clamped to the last item.
pub fn hit_row(rect: Rect, x: u16, y: u16, selected: usize, count: usize) -> Option<usize> {
    let offset = scroll_offset(selected, rect.height).min(count);
    Geometry::row_at(rect, x, y, count - offset).map(|row| row + offset)
}

pub fn render_list(
    frame: &mut Frame,
    rect: Rect,
    rows: Vec<Line<'_>>,
    selected: usize,
    focused: bool,
    theme: &Theme,
) {
    let offset = scroll_offset(selected, rect.height);
    for (visual, (index, line)) in rows
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(usize::from(rect.height))
        .enumerate()
    {
        let Ok(visual) = u16::try_from(visual) else { break };
        let row = Rect::new(rect.x, rect.y + visual, rect.width, 1);
        let mut paragraph = Paragraph::new(line);
        if index == selected {
            paragraph = paragraph.style(theme.selected(focused));
        }
        frame.render_widget(paragraph, row);
    }
}
