//! Colour palette, built once at startup and passed to every render call.

use ratatui::style::{Color, Modifier, Style};

use crate::provider::VmState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub selection_bg: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(94, 164, 255),   // #5EA4FF
            text: Color::Rgb(220, 223, 228),    // #DCDFE4
            muted: Color::Rgb(120, 128, 140),   // #78808C
            border: Color::Rgb(70, 78, 92),     // #464E5C
            selection_bg: Color::Rgb(38, 52, 74),
            success: Color::Rgb(63, 185, 80),   // #3FB950
            warning: Color::Rgb(210, 153, 34),  // #D29922
            error: Color::Rgb(248, 81, 73),     // #F85149
        }
    }
}

impl Theme {
    /// Palette without colour, for terminals where colour is unwanted.
    pub fn mono() -> Self {
        Self {
            accent: Color::White,
            text: Color::Reset,
            muted: Color::Gray,
            border: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Reset,
            warning: Color::Reset,
            error: Color::Reset,
        }
    }

    /// Resolve a theme by its settings name, falling back to the default.
    pub fn named(name: &str) -> Self {
        match name {
            "mono" => Self::mono(),
            _ => Self::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Styles
    // ─────────────────────────────────────────────────────────────────────

    pub fn text(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn heading(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Highlighted row; dimmer when the list does not have focus.
    pub fn selected(&self, focused: bool) -> Style {
        let style = Style::default().bg(self.selection_bg).fg(self.text);
        if focused {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn active_tab(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    pub fn inactive_tab(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success)
    }

    pub fn key_hint(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn vm_state(&self, state: VmState) -> Style {
        match state {
            VmState::Running => self.success(),
            VmState::Starting | VmState::Stopping => self.warning(),
            VmState::Stopped => self.muted(),
            VmState::Failed => self.error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_falls_back() {
        assert_eq!(Theme::named("mono"), Theme::mono());
        assert_eq!(Theme::named("anything"), Theme::default());
    }
}
