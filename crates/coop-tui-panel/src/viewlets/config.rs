//! Config tab: edit settings one section at a time and save them.

use coop_tui_fwk::{
    Command, Event, EventResult, FocusMode, Geometry, Hit, KeyCode, KeyEvent, Shortcut,
    Shortcuts, Viewlet,
};
use ratatui::text::Line;
use ratatui::Frame;

use super::{pair, render_heading, render_lines, ConfigSection, SidebarItem};
use crate::commands;
use crate::message::Msg;
use crate::settings::FIELDS;
use crate::state::Shared;
use crate::widgets::{list, Field, FieldKind, Form, Picker, PickerOutcome};

pub const KEYS: &[Shortcut] = &[
    Shortcut::new("↑/↓", "select a section"),
    Shortcut::new("Enter", "edit the section, choose or save"),
    Shortcut::new("Esc", "discard edits"),
];

const THEMES: &[&str] = &["default", "mono"];
const SWITCH: &[&str] = &["true", "false"];

pub struct ConfigView {
    selected: usize,
    mode: FocusMode,
    focused: bool,
    form: Form,
    picker: Option<Picker>,
    templates: Vec<String>,
    saving: bool,
}

impl ConfigView {
    pub fn new() -> Self {
        Self {
            selected: 0,
            mode: FocusMode::Sidebar,
            focused: false,
            form: Form::default(),
            picker: None,
            templates: Vec::new(),
            saving: false,
        }
    }

    fn section(&self) -> ConfigSection {
        ConfigSection::ALL[self.selected.min(ConfigSection::ALL.len() - 1)]
    }

    fn keys(section: ConfigSection) -> impl Iterator<Item = &'static (&'static str, &'static str)> {
        FIELDS.iter().filter(move |(key, _)| key.starts_with(section.prefix()))
    }

    fn choices(&self, key: &str) -> Option<Vec<String>> {
        let fixed = |values: &[&str]| -> Vec<String> { values.iter().map(|v| v.to_string()).collect() };
        match key {
            "ui.theme" => Some(fixed(THEMES)),
            "ui.mouse" => Some(fixed(SWITCH)),
            "defaults.template" => Some(self.templates.clone()),
            _ => None,
        }
    }

    fn open_form(&mut self, ctx: &Shared) {
        let mut fields: Vec<Field> = Self::keys(self.section())
            .map(|&(key, label)| {
                let value = ctx.settings.get(key).unwrap_or_default();
                match self.choices(key) {
                    Some(_) => Field::select(key, label, value),
                    None => Field::text(key, label, value),
                }
            })
            .collect();
        fields.push(Field::button("save", "Save"));
        self.form = Form::new(fields);
        self.form.activate();
        self.mode = self.mode.activate();
    }

    fn close_form(&mut self) {
        self.picker = None;
        self.form.deactivate();
        self.mode = FocusMode::Sidebar;
    }

    fn press_field(&mut self, ctx: &Shared) -> Command<Msg> {
        let field = self.form.focused().map(|f| (f.key, f.kind.clone()));
        match field {
            Some((_, FieldKind::Text(_))) => {
                self.form.focus_next();
                Command::none()
            }
            Some((key, FieldKind::Select(current))) => {
                let items = self.choices(key).unwrap_or_default();
                let title = FIELDS
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map_or("Choose", |(_, label)| *label);
                self.picker = Some(Picker::new(key, title, items, &current));
                self.mode = self.mode.open_modal();
                Command::none()
            }
            Some((_, FieldKind::Button)) => self.save(ctx),
            None => Command::none(),
        }
    }

    /// Apply the form to a copy of the current settings and persist it.
    /// The panel adopts the copy once the save succeeds.
    fn save(&mut self, ctx: &Shared) -> Command<Msg> {
        let mut edited = ctx.settings.clone();
        for (key, value) in self.form.values() {
            if let Err(err) = edited.set(key, value) {
                return Command::message(Msg::Log(err.to_string()));
            }
        }
        self.saving = true;
        commands::save_settings(&ctx.services, edited)
    }

    fn section_lines(&self, ctx: &Shared) -> Vec<Line<'static>> {
        let theme = &ctx.theme;
        let mut lines: Vec<Line<'static>> = Self::keys(self.section())
            .map(|&(key, label)| pair(label, ctx.settings.get(key).unwrap_or_default(), theme))
            .collect();
        lines.push(Line::default());
        lines.push(Line::styled(
            format!("stored in {}", ctx.services.config.location()),
            theme.muted(),
        ));
        lines
    }
}

impl Default for ConfigView {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewlet<Msg, Shared> for ConfigView {
    fn id(&self) -> &'static str {
        "config"
    }

    fn title(&self) -> &'static str {
        "Config"
    }

    fn mode(&self) -> FocusMode {
        self.mode
    }

    fn input_focused(&self) -> bool {
        self.focused && self.mode == FocusMode::Form && self.form.input_focused()
    }

    fn handle_modal(&mut self, key: &KeyEvent, _ctx: &Shared) -> Command<Msg> {
        let Some(picker) = self.picker.as_mut() else {
            self.mode = self.mode.dismiss();
            return Command::none();
        };
        match picker.handle_key(key) {
            PickerOutcome::Open => {}
            PickerOutcome::Confirmed(value) => {
                self.form.set_value(picker.field, value);
                self.picker = None;
                self.mode = self.mode.confirm();
            }
            PickerOutcome::Dismissed => {
                self.picker = None;
                self.mode = self.mode.dismiss();
            }
        }
        Command::none()
    }

    fn handle_nav(&mut self, key: &KeyEvent, ctx: &Shared) -> Option<Command<Msg>> {
        let last = ConfigSection::ALL.len() - 1;
        match self.mode {
            FocusMode::Sidebar => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
                KeyCode::Down | KeyCode::Char('j') => self.selected = (self.selected + 1).min(last),
                KeyCode::Home => self.selected = 0,
                KeyCode::End => self.selected = last,
                KeyCode::Enter => self.open_form(ctx),
                _ => return None,
            },
            FocusMode::Form => match key.code {
                KeyCode::Esc => self.close_form(),
                KeyCode::Up | KeyCode::BackTab => self.form.focus_prev(),
                KeyCode::Down | KeyCode::Tab => self.form.focus_next(),
                KeyCode::Enter => return Some(self.press_field(ctx)),
                _ => return None,
            },
            FocusMode::Modal => return None,
        }
        Some(Command::none())
    }

    fn update(&mut self, event: &Event, _ctx: &Shared) -> (EventResult, Command<Msg>) {
        if self.mode != FocusMode::Form {
            return (EventResult::Unhandled, Command::none());
        }
        let handled = match event {
            Event::Key(key) => self.form.edit(key),
            Event::Paste(text) => self.form.paste(text),
            _ => false,
        };
        (handled.into(), Command::none())
    }

    fn receive(&mut self, message: &Msg, _ctx: &Shared) -> Command<Msg> {
        match message {
            Msg::Templates(Ok(templates)) => self.templates = templates.clone(),
            Msg::ConfigSaved { result, .. } if self.saving => {
                self.saving = false;
                if result.is_ok() {
                    self.close_form();
                }
            }
            _ => {}
        }
        Command::none()
    }

    fn hit_test(&self, x: u16, y: u16, geometry: &Geometry) -> Hit {
        if let Some(rect) = geometry.list_rect(self.mode == FocusMode::Sidebar) {
            if let Some(row) = list::hit_row(rect, x, y, self.selected, ConfigSection::ALL.len()) {
                return Hit::Row(row);
            }
        }
        if self.mode == FocusMode::Form {
            if let Some(key) = geometry
                .detail_rect(false)
                .and_then(|rect| self.form.hit_test(rect, x, y))
            {
                return Hit::Action(key);
            }
        }
        Hit::None
    }

    fn click(&mut self, hit: Hit, ctx: &Shared) -> Command<Msg> {
        match hit {
            Hit::Row(index) => {
                if self.mode == FocusMode::Form {
                    self.close_form();
                }
                if index == self.selected {
                    self.open_form(ctx);
                } else {
                    self.selected = index.min(ConfigSection::ALL.len() - 1);
                }
                Command::none()
            }
            Hit::Action(key) if self.mode == FocusMode::Form => {
                self.form.focus_key(key);
                self.press_field(ctx)
            }
            Hit::Action(_) | Hit::None => Command::none(),
        }
    }

    fn render(&self, frame: &mut Frame, geometry: &Geometry, ctx: &Shared) {
        let theme = &ctx.theme;
        let list_focused = self.mode == FocusMode::Sidebar;

        if let Some(rect) = geometry.list_rect(list_focused) {
            render_heading(frame, geometry, rect, "Settings", theme);
            let rows = ConfigSection::ALL
                .iter()
                .map(|section| SidebarItem::Section(*section).line(theme))
                .collect();
            list::render_list(frame, rect, rows, self.selected, self.focused && list_focused, theme);
        }

        if let Some(rect) = geometry.detail_rect(list_focused) {
            render_heading(frame, geometry, rect, self.section().label(), theme);
            if list_focused {
                render_lines(frame, rect, self.section_lines(ctx));
            } else {
                self.form.render(frame, rect, theme);
            }
        }

        if let Some(picker) = &self.picker {
            picker.render(frame, geometry, theme);
        }
    }

    fn shortcuts(&self) -> Shortcuts {
        let mut hints = Shortcuts::new();
        match self.mode {
            FocusMode::Sidebar => hints.push(Shortcut::new("Enter", "edit")),
            FocusMode::Form => {
                hints.push(Shortcut::new("↑/↓", "field"));
                hints.push(Shortcut::new("Enter", "choose/save"));
                hints.push(Shortcut::new("Esc", "discard"));
            }
            FocusMode::Modal => {
                hints.push(Shortcut::new("Enter", "confirm"));
                hints.push(Shortcut::new("Esc", "dismiss"));
            }
        }
        hints
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
        self.form.deactivate();
    }

    fn focused(&self) -> bool {
        self.focused
    }

    fn on_activate(&mut self) {
        self.close_form();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{run, services};
    use crate::settings::Settings;
    use coop_tui_fwk::{KeyModifiers, Tag};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctx() -> Shared {
        Shared::new(Settings::default(), services())
    }

    #[test]
    fn test_form_shows_section_fields() {
        let ctx = ctx();
        let mut view = ConfigView::new();
        view.handle_nav(&key(KeyCode::Down), &ctx);
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        let keys: Vec<_> = view.form.fields().iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec![
                "defaults.cpus",
                "defaults.memory_mb",
                "defaults.template",
                "defaults.ssh_user",
                "save"
            ]
        );
        assert_eq!(view.form.value("defaults.cpus"), Some("2"));
    }

    #[test]
    fn test_invalid_value_is_logged_not_saved() {
        let ctx = ctx();
        let mut view = ConfigView::new();
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        view.form.set_value("ui.tick_ms", "soon");
        view.form.focus_key("save");
        let command = view.handle_nav(&key(KeyCode::Enter), &ctx).expect("handled");
        assert!(command.tags().is_empty());
        assert!(matches!(
            &command.messages()[..],
            [Msg::Log(line)] if line.contains("ui.tick_ms")
        ));
        assert_eq!(view.mode(), FocusMode::Form);
    }

    #[tokio::test]
    async fn test_save_round_trip_returns_to_sidebar() {
        let ctx = ctx();
        let mut view = ConfigView::new();
        view.handle_nav(&key(KeyCode::End), &ctx);
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        view.form.set_value("launch.terminal", "foot -e");
        view.form.focus_key("save");
        let command = view.handle_nav(&key(KeyCode::Enter), &ctx).expect("handled");
        assert_eq!(command.tags(), vec![&Tag::new("save-config", "settings")]);

        let msgs = run(command).await;
        let [Msg::ConfigSaved { settings, result: Ok(()) }] = &msgs[..] else {
            panic!("unexpected {msgs:?}");
        };
        assert_eq!(settings.launch.terminal, "foot -e");
        // the panel applies the saved value, not the tab
        assert_eq!(ctx.settings.launch.terminal, "");
        view.receive(&msgs[0], &ctx);
        assert_eq!(view.mode(), FocusMode::Sidebar);
    }

    #[test]
    fn test_form_reads_current_settings() {
        let mut ctx = ctx();
        let mut view = ConfigView::new();
        ctx.settings.ui.tick_ms = 250;
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        assert_eq!(view.form.value("ui.tick_ms"), Some("250"));
    }

    #[test]
    fn test_focus_and_blur_are_idempotent() {
        let mut view = ConfigView::new();
        view.focus();
        view.focus();
        assert!(view.focused());
        view.blur();
        view.blur();
        assert!(!view.focused());
    }

    #[test]
    fn test_theme_is_picked_from_a_list() {
        let ctx = ctx();
        let mut view = ConfigView::new();
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        view.form.focus_key("ui.theme");
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        assert_eq!(view.mode(), FocusMode::Modal);
        view.handle_modal(&key(KeyCode::Down), &ctx);
        view.handle_modal(&key(KeyCode::Enter), &ctx);
        assert_eq!(view.mode(), FocusMode::Form);
        assert_eq!(view.form.value("ui.theme"), Some("mono"));
    }

    #[test]
    fn test_escape_discards_edits() {
        let ctx = ctx();
        let mut view = ConfigView::new();
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        view.form.set_value("ui.tick_ms", "50");
        view.handle_nav(&key(KeyCode::Esc), &ctx);
        view.handle_nav(&key(KeyCode::Enter), &ctx);
        assert_eq!(view.form.value("ui.tick_ms"), Some("120"));
    }
}
