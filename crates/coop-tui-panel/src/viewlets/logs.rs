//! Logs tab: the operator log, newest at the bottom.

use coop_tui_fwk::{Command, Geometry, KeyCode, KeyEvent, Shortcut, Shortcuts, Viewlet};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use super::{render_heading, render_lines};
use crate::message::Msg;
use crate::state::Shared;

pub const KEYS: &[Shortcut] = &[
    Shortcut::new("↑/↓", "scroll one line"),
    Shortcut::new("PgUp/PgDn", "scroll one page"),
    Shortcut::new("Home/End", "oldest / follow newest"),
];

pub struct Logs {
    /// Lines between the bottom of the view and the newest entry. Zero
    /// follows the tail.
    scroll: usize,
    page: usize,
    focused: bool,
}

impl Logs {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            page: 1,
            focused: false,
        }
    }

    pub fn following(&self) -> bool {
        self.scroll == 0
    }

    fn max_scroll(&self, ctx: &Shared) -> usize {
        ctx.log.len().saturating_sub(self.page)
    }
}

impl Default for Logs {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewlet<Msg, Shared> for Logs {
    fn id(&self) -> &'static str {
        "logs"
    }

    fn title(&self) -> &'static str {
        "Logs"
    }

    fn navigable(&self) -> bool {
        false
    }

    fn handle_nav(&mut self, key: &KeyEvent, ctx: &Shared) -> Option<Command<Msg>> {
        let max = self.max_scroll(ctx);
        self.scroll = match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll + 1,
            KeyCode::Down | KeyCode::Char('j') => self.scroll.saturating_sub(1),
            KeyCode::PageUp => self.scroll + self.page,
            KeyCode::PageDown => self.scroll.saturating_sub(self.page),
            KeyCode::Home => max,
            KeyCode::End => 0,
            _ => return None,
        }
        .min(max);
        Some(Command::none())
    }

    fn receive(&mut self, _message: &Msg, ctx: &Shared) -> Command<Msg> {
        // The buffer may have shrunk after a capacity change.
        if !self.following() {
            self.scroll = self.scroll.min(self.max_scroll(ctx));
        }
        Command::none()
    }

    fn render(&self, frame: &mut Frame, geometry: &Geometry, ctx: &Shared) {
        let theme = &ctx.theme;
        let rect = geometry.full_width();
        let heading = if self.following() {
            format!("Operator log ({} entries)", ctx.log.len())
        } else {
            format!("Operator log ({} entries, {} newer below)", ctx.log.len(), self.scroll)
        };
        render_heading(frame, geometry, rect, &heading, theme);

        if ctx.log.is_empty() {
            render_lines(frame, rect, vec![Line::styled("nothing logged yet", theme.muted())]);
            return;
        }
        let lines = ctx
            .log
            .window(usize::from(rect.height), self.scroll)
            .map(|entry| {
                Line::from(vec![
                    Span::styled(entry.timestamp.format("%H:%M:%S ").to_string(), theme.muted()),
                    Span::styled(entry.text.clone(), theme.text()),
                ])
            })
            .collect();
        render_lines(frame, rect, lines);
    }

    fn resize(&mut self, geometry: &Geometry) {
        self.page = usize::from(geometry.body_height).max(1);
    }

    fn shortcuts(&self) -> Shortcuts {
        let mut hints = Shortcuts::new();
        hints.push(Shortcut::new("↑/↓", "scroll"));
        hints.push(Shortcut::new("PgUp/PgDn", "page"));
        hints.push(Shortcut::new("End", "follow"));
        hints
    }

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
        self.scroll = 0;
    }
}
