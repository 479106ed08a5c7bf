//! Vertical forms: one field per row, focus moved with a [`FocusRing`].

use coop_tui_fwk::{layout::contains, FocusRing, KeyEvent, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::input::TextInput;
use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text(TextInput),
    /// Value chosen from a picker modal.
    Select(String),
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub fn text(key: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Text(TextInput::new(value)),
        }
    }

    pub fn select(key: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Select(value.into()),
        }
    }

    pub fn button(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Button,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Text(input) => Some(input.value()),
            FieldKind::Select(value) => Some(value),
            FieldKind::Button => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<Field>,
    ring: FocusRing,
    active: bool,
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Self {
        let keys: Vec<&'static str> = fields.iter().map(|f| f.key).collect();
        Self {
            ring: FocusRing::new(&keys),
            fields,
            active: false,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn focused(&self) -> Option<&Field> {
        let key = self.ring.focused()?;
        self.fields.iter().find(|f| f.key == key)
    }

    /// Give the form keyboard focus, starting at the first field.
    pub fn activate(&mut self) {
        self.active = true;
        self.ring.set_index(0);
        self.sync();
    }

    /// Take focus away; no input keeps the cursor.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.sync();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn focus_next(&mut self) {
        self.ring.focus_next();
        self.sync();
    }

    pub fn focus_prev(&mut self) {
        self.ring.focus_prev();
        self.sync();
    }

    pub fn focus_key(&mut self, key: &str) -> bool {
        let found = self.ring.set_focus(key);
        self.sync();
        found
    }

    fn sync(&mut self) {
        let focused = self.ring.focused();
        let active = self.active;
        for field in &mut self.fields {
            if let FieldKind::Text(input) = &mut field.kind {
                if active && focused == Some(field.key) {
                    input.focus();
                } else {
                    input.blur();
                }
            }
        }
    }

    /// Whether a text field of this form holds the cursor.
    pub fn input_focused(&self) -> bool {
        self.active && matches!(self.focused().map(|f| &f.kind), Some(FieldKind::Text(_)))
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.key == key)?.value()
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        let Some(field) = self.fields.iter_mut().find(|f| f.key == key) else {
            return;
        };
        match &mut field.kind {
            FieldKind::Text(input) => input.set_value(value),
            FieldKind::Select(current) => *current = value.into(),
            FieldKind::Button => {}
        }
    }

    /// `(key, value)` of every non-button field, in order.
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.value().map(|v| (f.key, v)))
    }

    fn focused_input(&mut self) -> Option<&mut TextInput> {
        if !self.active {
            return None;
        }
        let key = self.ring.focused()?;
        match &mut self.fields.iter_mut().find(|f| f.key == key)?.kind {
            FieldKind::Text(input) => Some(input),
            _ => None,
        }
    }

    /// Forward an editing key to the focused text field.
    pub fn edit(&mut self, key: &KeyEvent) -> bool {
        self.focused_input().is_some_and(|input| input.handle_key(key))
    }

    pub fn paste(&mut self, text: &str) -> bool {
        match self.focused_input() {
            Some(input) => {
                input.insert(text);
                true
            }
            None => false,
        }
    }

    /// Field key under a cell, using the layout [`Form::render`] draws.
    pub fn hit_test(&self, rect: Rect, x: u16, y: u16) -> Option<&'static str> {
        if !contains(rect, x, y) {
            return None;
        }
        self.fields.get(usize::from(y - rect.y)).map(|f| f.key)
    }

    fn label_width(&self) -> u16 {
        let widest = self.fields.iter().map(|f| f.label.len()).max().unwrap_or(0);
        u16::try_from(widest).unwrap_or(u16::MAX).saturating_add(2)
    }

    pub fn render(&self, frame: &mut Frame, rect: Rect, theme: &Theme) {
        let label_width = self.label_width();
        for (i, field) in self.fields.iter().enumerate() {
            let Ok(offset) = u16::try_from(i) else { break };
            if offset >= rect.height {
                break;
            }
            let row = Rect::new(rect.x, rect.y + offset, rect.width, 1);
            let focused = self.active && self.ring.is_focused(field.key);
            let style = if focused {
                theme.selected(true)
            } else {
                theme.text()
            };

            let line = match &field.kind {
                FieldKind::Button => Line::from(Span::styled(format!("[ {} ]", field.label), style)),
                FieldKind::Text(input) => Line::from(vec![
                    Span::styled(format!("{:width$}", field.label, width = label_width as usize), theme.muted()),
                    Span::styled(input.value().to_string(), style),
                ]),
                FieldKind::Select(value) => {
                    let shown = if value.is_empty() { "<choose>" } else { value.as_str() };
                    Line::from(vec![
                        Span::styled(format!("{:width$}", field.label, width = label_width as usize), theme.muted()),
                        Span::styled(format!("{shown} ▾"), style),
                    ])
                }
            };
            frame.render_widget(Paragraph::new(line), row);

            if let FieldKind::Text(input) = &field.kind {
                if input.focused() {
                    let cursor = u16::try_from(input.cursor()).unwrap_or(u16::MAX);
                    let x = rect
                        .x
                        .saturating_add(label_width)
                        .saturating_add(cursor)
                        .min(rect.x + rect.width.saturating_sub(1));
                    frame.set_cursor_position((x, row.y));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coop_tui_fwk::{KeyCode, KeyModifiers};

    fn form() -> Form {
        Form::new(vec![
            Field::text("name", "Name", ""),
            Field::select("template", "Template", ""),
            Field::button("submit", "Spawn"),
        ])
    }

    #[test]
    fn test_only_active_form_holds_cursor() {
        let mut form = form();
        assert!(!form.input_focused());
        form.activate();
        assert!(form.input_focused());
        form.focus_next();
        assert!(!form.input_focused());
        assert_eq!(form.focused().map(|f| f.key), Some("template"));
        form.focus_prev();
        form.deactivate();
        assert!(!form.input_focused());
        assert!(!form.edit(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
    }

    #[test]
    fn test_values_skip_buttons() {
        let mut form = form();
        form.activate();
        form.edit(&KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        form.set_value("template", "debian-12");
        let values: Vec<_> = form.values().collect();
        assert_eq!(values, [("name", "a"), ("template", "debian-12")]);
    }

    #[test]
    fn test_hit_test_rows() {
        let form = form();
        let rect = Rect::new(20, 4, 40, 10);
        assert_eq!(form.hit_test(rect, 25, 4), Some("name"));
        assert_eq!(form.hit_test(rect, 25, 6), Some("submit"));
        assert_eq!(form.hit_test(rect, 25, 7), None);
        assert_eq!(form.hit_test(rect, 5, 4), None);
    }
}
