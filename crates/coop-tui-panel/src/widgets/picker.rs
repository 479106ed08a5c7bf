//! Modal list picker used by source-selection fields.

use coop_tui_fwk::{Geometry, KeyCode, KeyEvent, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::list::render_list;
use crate::theme::Theme;

/// What a key did to an open picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// Still open.
    Open,
    /// Confirmed with a value.
    Confirmed(String),
    Dismissed,
}

#[derive(Debug, Clone)]
pub struct Picker {
    /// The form field the choice goes into.
    pub field: &'static str,
    title: &'static str,
    items: Vec<String>,
    selected: usize,
}

impl Picker {
    /// Open on `items`, preselecting `current` if present.
    pub fn new(field: &'static str, title: &'static str, items: Vec<String>, current: &str) -> Self {
        let selected = items.iter().position(|i| i == current).unwrap_or(0);
        Self {
            field,
            title,
            items,
            selected,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> PickerOutcome {
        match key.code {
            KeyCode::Esc => return PickerOutcome::Dismissed,
            KeyCode::Enter => {
                return match self.selected() {
                    Some(value) => PickerOutcome::Confirmed(value.to_string()),
                    None => PickerOutcome::Dismissed,
                };
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(self.items.len().saturating_sub(1));
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.items.len().saturating_sub(1),
            _ => {}
        }
        PickerOutcome::Open
    }

    /// Box the picker occupies for `geometry`, sized in terminal cells.
    pub fn area(&self, geometry: &Geometry) -> Rect {
        let cells = |text: &str| Line::from(text).width();
        let widest = self.items.iter().map(|i| cells(i)).max().unwrap_or(0);
        let width = u16::try_from(widest.max(cells(self.title)) + 6).unwrap_or(u16::MAX);
        let height = u16::try_from(self.items.len().max(1) + 2).unwrap_or(u16::MAX);
        geometry.modal(width.max(24), height)
    }

    pub fn render(&self, frame: &mut Frame, geometry: &Geometry, theme: &Theme) {
        let area = self.area(geometry);
        frame.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border(true))
            .title(Line::styled(format!(" {} ", self.title), theme.heading()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.items.is_empty() {
            frame.render_widget(Paragraph::new("nothing to choose").style(theme.muted()), inner);
            return;
        }
        let rows = self.items.iter().map(|i| Line::from(i.as_str())).collect();
        render_list(frame, inner, rows, self.selected, true, theme);
    }
}
