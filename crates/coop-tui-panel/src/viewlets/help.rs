//! Help tab: every keyboard shortcut, grouped by where it applies.

use coop_tui_fwk::{Command, Geometry, KeyCode, KeyEvent, Shortcut, Shortcuts, Viewlet};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use super::{config, fleet, hatchery, logs, render_heading, render_lines};
use crate::dispatch::GLOBAL_SHORTCUTS;
use crate::message::Msg;
use crate::state::Shared;
use crate::theme::Theme;

const MOUSE: &[Shortcut] = &[
    Shortcut::new("click tab", "switch tab"),
    Shortcut::new("click [x]", "quit"),
    Shortcut::new("click row", "select, click again to open"),
    Shortcut::new("wheel", "move the selection"),
];

pub struct Help {
    scroll: usize,
    focused: bool,
}

impl Help {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            focused: false,
        }
    }

    fn sections() -> Vec<(&'static str, Vec<Shortcut>)> {
        let global = GLOBAL_SHORTCUTS
            .iter()
            .map(|binding| Shortcut::new(binding.keys, binding.label))
            .fold(Vec::<Shortcut>::new(), |mut acc, hint| {
                // Bindings sharing keys are listed once.
                if !acc.iter().any(|h| h.keys == hint.keys) {
                    acc.push(hint);
                }
                acc
            });
        vec![
            ("Global", global),
            ("Fleet", fleet::KEYS.to_vec()),
            ("Hatchery", hatchery::KEYS.to_vec()),
            ("Config", config::KEYS.to_vec()),
            ("Logs", logs::KEYS.to_vec()),
            ("Mouse", MOUSE.to_vec()),
        ]
    }

    fn lines(theme: &Theme) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for (title, hints) in Self::sections() {
            lines.push(Line::styled(title, theme.heading()));
            for hint in hints {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<14}", hint.keys), theme.key_hint()),
                    Span::styled(hint.label, theme.text()),
                ]));
            }
            lines.push(Line::default());
        }
        lines
    }
}

impl Default for Help {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewlet<Msg, Shared> for Help {
    fn id(&self) -> &'static str {
        "help"
    }

    fn title(&self) -> &'static str {
        "Help"
    }

    fn navigable(&self) -> bool {
        false
    }

    fn handle_nav(&mut self, key: &KeyEvent, ctx: &Shared) -> Option<Command<Msg>> {
        let max = Self::lines(&ctx.theme).len().saturating_sub(1);
        self.scroll = match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll + 1,
            KeyCode::PageUp => self.scroll.saturating_sub(10),
            KeyCode::PageDown => self.scroll + 10,
            KeyCode::Home => 0,
            KeyCode::End => max,
            _ => return None,
        }
        .min(max);
        Some(Command::none())
    }

    fn render(&self, frame: &mut Frame, geometry: &Geometry, ctx: &Shared) {
        let rect = geometry.full_width();
        render_heading(frame, geometry, rect, "Keyboard and mouse", &ctx.theme);
        let lines = Self::lines(&ctx.theme).into_iter().skip(self.scroll).collect();
        render_lines(frame, rect, lines);
    }

    fn shortcuts(&self) -> Shortcuts {
        let mut hints = Shortcuts::new();
        hints.push(Shortcut::new("↑/↓", "scroll"));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::services;
    use crate::settings::Settings;
    use coop_tui_fwk::KeyModifiers;

    #[test]
    fn test_lists_global_and_tab_keys() {
        let text: Vec<String> = Help::lines(&Theme::default())
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(text.iter().any(|l| l.contains("Ctrl+C")));
        assert!(text.iter().any(|l| l.contains("prune unused")));
        assert!(text.iter().any(|l| l == "Logs"));
    }

    #[test]
    fn test_focus_and_blur_are_idempotent() {
        let mut help = Help::new();
        help.focus();
        help.focus();
        assert!(help.focused());
        help.blur();
        help.blur();
        assert!(!help.focused());
    }

    #[test]
    fn test_scroll_stops_at_last_line() {
        let ctx = Shared::new(Settings::default(), services());
        let last = Help::lines(&ctx.theme).len() - 1;
        let mut help = Help::new();
        help.handle_nav(&KeyEvent::new(KeyCode::End, KeyModifiers::NONE), &ctx);
        assert_eq!(help.scroll, last);
        help.handle_nav(&KeyEvent::new(KeyCode::PageDown, KeyModifiers::NONE), &ctx);
        assert_eq!(help.scroll, last);
        help.on_activate();
        assert_eq!(help.scroll, 0);
        assert!(help
            .handle_nav(&KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &ctx)
            .is_none());
    }
}
