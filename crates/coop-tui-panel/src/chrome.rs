//! Everything around the active tab: header, frame, status, log and hints.

use coop_tui_fwk::layout::{MIN_HEIGHT, MIN_WIDTH};
use coop_tui_fwk::{Geometry, HeaderTarget, Rect, Shortcut};
use ratatui::layout::{Alignment, Constraint, Layout};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, LineGauge, Paragraph};
use ratatui::Frame;

use crate::state::AppState;
use crate::theme::Theme;

const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Hints shown on every tab after the tab's own.
const GLOBAL_HINTS: &[Shortcut] = &[
    Shortcut::new("1-5", "tabs"),
    Shortcut::new("r", "refresh"),
    Shortcut::new("q", "quit"),
];

pub fn draw(frame: &mut Frame, state: &AppState) {
    let area = frame.area();
    // The stored geometry is what mouse hits are resolved against; it only
    // differs from the frame before the first resize arrives.
    let geometry = if (area.width, area.height) == (state.geometry.width, state.geometry.height) {
        state.geometry
    } else {
        Geometry::compute(area.width, area.height)
    };
    let theme = &state.shared.theme;

    if !geometry.viable {
        draw_advisory(frame, &geometry, theme);
        return;
    }

    draw_header(frame, &geometry, state, theme);
    frame.render_widget(
        Paragraph::new("─".repeat(usize::from(geometry.width))).style(theme.border(false)),
        Rect::new(0, 1, geometry.width, 1),
    );
    draw_body(frame, &geometry, state, theme);
    draw_status(frame, &geometry, state, theme);
    if let Some(entry) = state.shared.log.last() {
        frame.render_widget(
            Paragraph::new(Span::styled(entry.render(), theme.muted())),
            geometry.log_line(),
        );
    }
    draw_footer(frame, &geometry, state, theme);
}

fn draw_advisory(frame: &mut Frame, geometry: &Geometry, theme: &Theme) {
    let area = geometry.area();
    let lines = vec![
        Line::styled("Terminal too small", theme.warning()),
        Line::styled(
            format!(
                "{}x{}, need at least {MIN_WIDTH}x{MIN_HEIGHT}",
                geometry.width, geometry.height
            ),
            theme.muted(),
        ),
    ];
    let top = area.height.saturating_sub(2) / 2;
    let rect = Rect::new(0, top, area.width, area.height.saturating_sub(top).min(2));
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), rect);
}

fn draw_header(frame: &mut Frame, geometry: &Geometry, state: &AppState, theme: &Theme) {
    let active = state.tabs.active_index();
    for cell in state.tabs.header_layout(geometry.width) {
        let style = match cell.target {
            HeaderTarget::Tab(index) if index == active => theme.active_tab(),
            HeaderTarget::Tab(_) => theme.inactive_tab(),
            HeaderTarget::Exit => theme.error(),
        };
        frame.render_widget(Paragraph::new(Span::styled(cell.label, style)), cell.area);
    }
}

fn draw_body(frame: &mut Frame, geometry: &Geometry, state: &AppState, theme: &Theme) {
    let Some(tab) = state.tabs.active() else {
        return;
    };
    let body = geometry.body();
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border(tab.focused())),
        body,
    );

    if tab.navigable() {
        if let Some(x) = geometry.separator_x() {
            let rows = geometry.body_height + 1;
            let line: Vec<Line> = (0..rows).map(|_| Line::from("│")).collect();
            frame.render_widget(
                Paragraph::new(line).style(theme.border(false)),
                Rect::new(x, body.y + 1, 1, rows),
            );
        }
    }

    tab.render(frame, geometry, &state.shared);
}

fn draw_status(frame: &mut Frame, geometry: &Geometry, state: &AppState, theme: &Theme) {
    let [left, right] =
        Layout::horizontal([Constraint::Min(10), Constraint::Length(40)]).areas(geometry.status());

    if let Some(pending) = &state.pending {
        let spinner = SPINNER[state.spinner % SPINNER.len()];
        let elapsed = pending.started_at.elapsed().as_secs();
        let mut spans = vec![
            Span::styled(format!(" {spinner} "), theme.warning()),
            Span::styled(pending.tag.to_string(), theme.text()),
            Span::styled(format!(" {elapsed}s"), theme.muted()),
        ];
        let others = state.in_flight.len().saturating_sub(1);
        if others > 0 {
            spans.push(Span::styled(format!(" (+{others} more)"), theme.muted()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), left);
    }

    if let Some(download) = &state.download {
        let gauge = LineGauge::default()
            .ratio(f64::from(download.progress.clamp(0.0, 1.0)))
            .label(format!("{} {:>3.0}%", download.image, download.progress * 100.0))
            .filled_style(theme.success())
            .unfilled_style(theme.muted());
        frame.render_widget(gauge, right);
    }
}

fn draw_footer(frame: &mut Frame, geometry: &Geometry, state: &AppState, theme: &Theme) {
    let hints = state.tabs.active().map(|tab| tab.shortcuts()).unwrap_or_default();
    let mut spans = vec![Span::raw(" ")];
    for hint in hints.iter().chain(GLOBAL_HINTS) {
        spans.push(Span::styled(hint.keys, theme.key_hint()));
        spans.push(Span::styled(format!(" {}  ", hint.label), theme.muted()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), geometry.footer());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{buffer_text, services};
    use crate::settings::Settings;
    use crate::state::{DownloadState, Shared};
    use crate::viewlets::{Fleet, Logs};
    use coop_tui_fwk::{Tag, TabSet};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn app(width: u16, height: u16) -> AppState {
        let mut tabs = TabSet::new();
        tabs.add(Fleet::new());
        tabs.add(Logs::new());
        let mut state = AppState::new(tabs, Shared::new(Settings::default(), services()));
        state.geometry = Geometry::compute(width, height);
        state
    }

    fn render(state: &AppState) -> String {
        let geometry = state.geometry;
        let mut terminal =
            Terminal::new(TestBackend::new(geometry.width, geometry.height)).expect("terminal");
        terminal.draw(|frame| draw(frame, state)).expect("draw");
        buffer_text(terminal.backend().buffer())
    }

    fn row(text: &str, y: u16) -> &str {
        text.lines().nth(usize::from(y)).unwrap_or_default()
    }

    #[test]
    fn test_rows_land_where_geometry_says() {
        let mut state = app(120, 40);
        state.shared.log.push("web-1 started");
        state.track(Tag::new("stop", "db-1"));
        let text = render(&state);
        let geometry = state.geometry;

        assert!(row(&text, 0).contains("1 Fleet"));
        assert!(row(&text, 0).trim_end().ends_with("[x]"));
        assert!(row(&text, geometry.status().y).contains("stop db-1"));
        assert!(row(&text, geometry.log_line().y).contains("web-1 started"));
        assert!(row(&text, geometry.footer().y).contains("quit"));
        let separator = geometry.separator_x().expect("separator");
        let body_row = row(&text, geometry.sidebar().y);
        assert_eq!(body_row.chars().nth(usize::from(separator)), Some('│'));
    }

    #[test]
    fn test_download_gauge_in_status_row() {
        let mut state = app(120, 40);
        state.download = Some(DownloadState {
            image: "debian-12".into(),
            progress: 0.3,
        });
        let text = render(&state);
        let status = row(&text, state.geometry.status().y);
        assert!(status.contains("debian-12"));
        assert!(status.contains("30%"));
    }

    #[test]
    fn test_narrow_layout_has_no_separator() {
        let state = app(80, 24);
        let text = render(&state);
        let body_row = row(&text, state.geometry.content().y);
        assert_eq!(body_row.matches('│').count(), 2);
    }

    #[test]
    fn test_advisory_replaces_everything() {
        let state = app(59, 30);
        let text = render(&state);
        assert!(text.contains("Terminal too small"));
        assert!(text.contains("59x30"));
        assert!(!text.contains("[x]"));
    }
}
