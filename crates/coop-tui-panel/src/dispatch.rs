//! Event dispatch.
//!
//! Keys are routed by precedence, stopping at the first match:
//!
//! 1. an open modal takes every key;
//! 2. a global shortcut, unless its scope excludes the current focus;
//! 3. the active tab's navigation and item actions;
//! 4. the active tab's generic update (text editing).
//!
//! The first two steps are the pure [`route`] over [`GLOBAL_SHORTCUTS`];
//! the rest is delegated to the active viewlet.

use coop_tui_fwk::{
    Command, Event, FocusMode, Geometry, HeaderTarget, Hit, Input, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind, Program, Tag, TabSet,
};
use ratatui::Frame;

use crate::chrome;
use crate::message::{kind, Msg};
use crate::provider::Services;
use crate::settings::Settings;
use crate::state::{AppState, DownloadState, Shared};
use crate::viewlets::{ConfigView, Fleet, Hatchery, Help, Logs};

/// What the focus looks like when a key arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteContext {
    pub modal_open: bool,
    pub input_focused: bool,
    pub mode: FocusMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    Quit,
    SelectTab(usize),
    Refresh,
    NextTab,
    PrevTab,
}

/// Where a key goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Modal,
    Global(GlobalAction),
    Tab,
}

/// When a global shortcut applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Whenever no text input is focused.
    Chrome,
    /// Always, except under a modal.
    Anywhere,
    /// In the Sidebar mode with no text input focused.
    Sidebar,
}

impl Scope {
    fn allows(self, ctx: &RouteContext) -> bool {
        match self {
            Scope::Anywhere => true,
            Scope::Chrome => !ctx.input_focused,
            Scope::Sidebar => !ctx.input_focused && ctx.mode == FocusMode::Sidebar,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub code: KeyCode,
    pub ctrl: bool,
    pub action: GlobalAction,
    pub scope: Scope,
    pub keys: &'static str,
    pub label: &'static str,
}

impl Binding {
    const fn new(
        code: KeyCode,
        action: GlobalAction,
        scope: Scope,
        keys: &'static str,
        label: &'static str,
    ) -> Self {
        Self {
            code,
            ctrl: false,
            action,
            scope,
            keys,
            label,
        }
    }

    const fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    fn matches(&self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        key.code == self.code && ctrl == self.ctrl && !alt
    }
}

/// Global shortcuts, first match wins.
pub const GLOBAL_SHORTCUTS: &[Binding] = &[
    Binding::new(KeyCode::Char('c'), GlobalAction::Quit, Scope::Anywhere, "Ctrl+C", "quit").ctrl(),
    Binding::new(KeyCode::Char('q'), GlobalAction::Quit, Scope::Chrome, "q", "quit"),
    Binding::new(KeyCode::Char('1'), GlobalAction::SelectTab(0), Scope::Chrome, "1-5", "switch tab"),
    Binding::new(KeyCode::Char('2'), GlobalAction::SelectTab(1), Scope::Chrome, "1-5", "switch tab"),
    Binding::new(KeyCode::Char('3'), GlobalAction::SelectTab(2), Scope::Chrome, "1-5", "switch tab"),
    Binding::new(KeyCode::Char('4'), GlobalAction::SelectTab(3), Scope::Chrome, "1-5", "switch tab"),
    Binding::new(KeyCode::Char('5'), GlobalAction::SelectTab(4), Scope::Chrome, "1-5", "switch tab"),
    Binding::new(KeyCode::Char('r'), GlobalAction::Refresh, Scope::Chrome, "r", "refresh"),
    Binding::new(KeyCode::Tab, GlobalAction::NextTab, Scope::Sidebar, "Tab/→", "next tab"),
    Binding::new(KeyCode::Right, GlobalAction::NextTab, Scope::Sidebar, "Tab/→", "next tab"),
    Binding::new(KeyCode::BackTab, GlobalAction::PrevTab, Scope::Sidebar, "S-Tab/←", "previous tab"),
    Binding::new(KeyCode::Left, GlobalAction::PrevTab, Scope::Sidebar, "S-Tab/←", "previous tab"),
];

/// Decide where a key press goes.
pub fn route(ctx: RouteContext, key: &KeyEvent) -> Route {
    if ctx.modal_open {
        return Route::Modal;
    }
    GLOBAL_SHORTCUTS
        .iter()
        .find(|binding| binding.matches(key) && binding.scope.allows(&ctx))
        .map_or(Route::Tab, |binding| Route::Global(binding.action))
}

/// Reads may run twice at once; everything else is single-flight.
fn is_read(tag_kind: &str) -> bool {
    matches!(tag_kind, kind::REFRESH | kind::INFO)
}

/// The control panel program.
pub struct Panel {
    state: AppState,
}

impl Panel {
    pub fn new(settings: Settings, services: Services) -> Self {
        let mut tabs = TabSet::new();
        tabs.add(Fleet::new());
        tabs.add(Hatchery::new());
        tabs.add(ConfigView::new());
        tabs.add(Logs::new());
        tabs.add(Help::new());
        Self {
            state: AppState::new(tabs, Shared::new(settings, services)),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn route_context(&self) -> RouteContext {
        match self.state.tabs.active() {
            Some(tab) => RouteContext {
                modal_open: tab.has_modal(),
                input_focused: tab.input_focused(),
                mode: tab.mode(),
            },
            None => RouteContext {
                modal_open: false,
                input_focused: false,
                mode: FocusMode::Sidebar,
            },
        }
    }

    fn on_event(&mut self, event: Event) -> Command<Msg> {
        match &event {
            Event::Resize { width, height } => {
                self.state.geometry = Geometry::compute(*width, *height);
                tracing::debug!(
                    width,
                    height,
                    breakpoint = ?self.state.geometry.breakpoint,
                    viable = self.state.geometry.viable,
                    "resized"
                );
                let geometry = self.state.geometry;
                for tab in self.state.tabs.iter_mut() {
                    tab.resize(&geometry);
                }
                Command::none()
            }
            Event::Key(_) => match event.as_key_press() {
                Some(key) => self.on_key(*key),
                None => Command::none(),
            },
            Event::Mouse(mouse) => self.on_mouse(*mouse),
            Event::Paste(_) => {
                if self.state.modal_open() || !self.state.geometry.viable {
                    return Command::none();
                }
                match self.state.tabs.active_mut() {
                    Some(tab) => tab.update(&event, &self.state.shared).1,
                    None => Command::none(),
                }
            }
            Event::FocusGained | Event::FocusLost => Command::none(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Command<Msg> {
        let route = route(self.route_context(), &key);
        // Only the advisory is on screen, so only global shortcuts apply.
        if !self.state.geometry.viable && !matches!(route, Route::Global(_)) {
            return Command::none();
        }
        match route {
            Route::Global(action) => self.apply(action),
            Route::Modal => match self.state.tabs.active_mut() {
                Some(tab) => tab.handle_modal(&key, &self.state.shared),
                None => Command::none(),
            },
            Route::Tab => {
                let Some(tab) = self.state.tabs.active_mut() else {
                    return Command::none();
                };
                if let Some(command) = tab.handle_nav(&key, &self.state.shared) {
                    return command;
                }
                tab.update(&Event::Key(key), &self.state.shared).1
            }
        }
    }

    fn apply(&mut self, action: GlobalAction) -> Command<Msg> {
        match action {
            GlobalAction::Quit => {
                tracing::info!("quit requested");
                self.state.should_quit = true;
            }
            GlobalAction::SelectTab(index) => {
                self.state.tabs.select(index);
            }
            GlobalAction::NextTab => {
                self.state.tabs.select_next();
            }
            GlobalAction::PrevTab => {
                self.state.tabs.select_prev();
            }
            GlobalAction::Refresh => return Command::message(Msg::Refresh),
        }
        Command::none()
    }

    fn on_mouse(&mut self, mouse: MouseEvent) -> Command<Msg> {
        if self.state.modal_open() || !self.state.geometry.viable {
            return Command::none();
        }
        let geometry = self.state.geometry;
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if y == 0 => {
                match self.state.tabs.header_hit(geometry.width, x) {
                    Some(HeaderTarget::Tab(index)) => {
                        self.state.tabs.select(index);
                    }
                    Some(HeaderTarget::Exit) => {
                        self.apply(GlobalAction::Quit);
                    }
                    None => {}
                }
                Command::none()
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(tab) = self.state.tabs.active_mut() else {
                    return Command::none();
                };
                match tab.hit_test(x, y, &geometry) {
                    Hit::None => Command::none(),
                    hit => tab.click(hit, &self.state.shared),
                }
            }
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
                let code = if mouse.kind == MouseEventKind::ScrollUp {
                    KeyCode::Up
                } else {
                    KeyCode::Down
                };
                let key = KeyEvent::new(code, KeyModifiers::NONE);
                match self.state.tabs.active_mut() {
                    Some(tab) => tab.handle_nav(&key, &self.state.shared).unwrap_or_default(),
                    None => Command::none(),
                }
            }
            _ => Command::none(),
        }
    }

    fn on_message(&mut self, message: Msg) -> Command<Msg> {
        if let Some(tag) = message.completes() {
            if !self.state.settle(&tag) {
                tracing::debug!(%tag, "result for an operation that was not tracked");
            }
        }

        match &message {
            Msg::Tick => {
                self.state.spinner = self.state.spinner.wrapping_add(1);
                if self.state.busy() {
                    return Command::after(self.state.shared.settings.tick_interval(), Msg::Tick);
                }
                self.state.ticking = false;
                return Command::none();
            }
            Msg::DownloadProgress { image, fraction } => {
                if let Some(download) = self.state.download.as_mut().filter(|d| &d.image == image) {
                    download.progress = *fraction;
                }
            }
            Msg::DownloadFinished { image, .. } => {
                if self.state.download.as_ref().is_some_and(|d| &d.image == image) {
                    self.state.download = None;
                }
            }
            Msg::ConfigSaved {
                settings,
                result: Ok(()),
            } => self.state.shared.apply_settings((**settings).clone()),
            _ => {}
        }

        if let Some(line) = message.log_line() {
            self.state.shared.log.push(line);
        }

        let mut commands = Vec::new();
        for tab in self.state.tabs.iter_mut() {
            commands.push(tab.receive(&message, &self.state.shared));
        }
        self.finish(Command::batch(commands))
    }

    /// Apply the single-flight policy to `command` and start tracking what
    /// remains.
    pub(crate) fn finish(&mut self, command: Command<Msg>) -> Command<Msg> {
        let mut accepted: Vec<Tag> = Vec::new();
        let state = &self.state;
        let (mut command, rejected) = command.retain(&mut |tag: &Tag| {
            let duplicate =
                !is_read(tag.kind) && (state.is_in_flight(tag) || accepted.contains(tag));
            if !duplicate {
                accepted.push(tag.clone());
            }
            !duplicate
        });

        for tag in rejected {
            tracing::warn!(%tag, "dropped duplicate command");
            self.state.shared.log.push(format!("{tag} is already running"));
        }
        for tag in accepted {
            tracing::debug!(%tag, "scheduled");
            if tag.kind == kind::DOWNLOAD {
                self.state.download = Some(DownloadState {
                    image: tag.target.clone(),
                    progress: 0.0,
                });
            }
            self.state.track(tag);
        }

        if self.state.busy() && !self.state.ticking {
            self.state.ticking = true;
            command = command.and(Command::after(
                self.state.shared.settings.tick_interval(),
                Msg::Tick,
            ));
        }
        command
    }
}

impl Program for Panel {
    type Message = Msg;

    fn init(&mut self) -> Command<Msg> {
        tracing::info!(
            config = %self.state.shared.services.config.location(),
            "starting control panel"
        );
        let mut commands = Vec::new();
        for tab in self.state.tabs.iter_mut() {
            commands.push(tab.init(&self.state.shared));
        }
        self.finish(Command::batch(commands))
    }

    fn update(&mut self, input: Input<Msg>) -> Command<Msg> {
        match input {
            Input::Terminal(event) => {
                let command = self.on_event(event);
                self.finish(command)
            }
            Input::Message(message) => self.on_message(message),
        }
    }

    fn draw(&self, frame: &mut Frame) {
        chrome::draw(frame, &self.state);
    }

    fn should_quit(&self) -> bool {
        self.state.should_quit
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::commands::testing::{buffer_text, run, services};
    use coop_tui_fwk::{drive, KeyEventKind};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn ctx(input_focused: bool, mode: FocusMode, modal_open: bool) -> RouteContext {
        RouteContext {
            modal_open,
            input_focused,
            mode,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_c() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
    }

    fn press(panel: &mut Panel, code: KeyCode) -> Vec<Command<Msg>> {
        drive(panel, Input::Terminal(Event::key(code)))
    }

    fn resized(width: u16, height: u16) -> Panel {
        let mut panel = Panel::new(Settings::default(), services());
        drive(&mut panel, Input::Terminal(Event::Resize { width, height }));
        panel
    }

    /// Run tracked work to completion, feeding results back. Untracked
    /// units (ticks, launches) are dropped.
    async fn pump(panel: &mut Panel, commands: Vec<Command<Msg>>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            match command {
                Command::Batch(commands) => queue.extend(commands),
                Command::Message(msg) => queue.extend(drive(panel, Input::Message(msg))),
                command if command.tags().is_empty() => {}
                command => {
                    for msg in run(command).await {
                        queue.extend(drive(panel, Input::Message(msg)));
                    }
                }
            }
        }
    }

    async fn booted() -> Panel {
        let mut panel = resized(120, 40);
        let init = panel.init();
        pump(&mut panel, vec![init]).await;
        panel
    }

    fn screen(panel: &Panel, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|frame| panel.draw(frame)).expect("draw");
        buffer_text(terminal.backend().buffer())
    }

    fn active(panel: &Panel) -> usize {
        panel.state.tabs.active_index()
    }

    #[test]
    fn test_modal_takes_every_key() {
        let modal = ctx(false, FocusMode::Modal, true);
        for k in [key(KeyCode::Char('q')), key(KeyCode::Char('2')), ctrl_c(), key(KeyCode::Tab)] {
            assert_eq!(route(modal, &k), Route::Modal);
        }
    }

    #[test]
    fn test_printable_globals_yield_to_inputs() {
        let typing = ctx(true, FocusMode::Form, false);
        assert_eq!(route(typing, &key(KeyCode::Char('q'))), Route::Tab);
        assert_eq!(route(typing, &key(KeyCode::Char('1'))), Route::Tab);
        assert_eq!(route(typing, &key(KeyCode::Char('r'))), Route::Tab);
        assert_eq!(route(typing, &ctrl_c()), Route::Global(GlobalAction::Quit));
    }

    #[test]
    fn test_tab_cycling_only_from_sidebar() {
        let sidebar = ctx(false, FocusMode::Sidebar, false);
        let form = ctx(false, FocusMode::Form, false);
        assert_eq!(route(sidebar, &key(KeyCode::Tab)), Route::Global(GlobalAction::NextTab));
        assert_eq!(route(sidebar, &key(KeyCode::Left)), Route::Global(GlobalAction::PrevTab));
        assert_eq!(route(form, &key(KeyCode::Tab)), Route::Tab);
        assert_eq!(route(form, &key(KeyCode::Right)), Route::Tab);
        assert_eq!(route(form, &key(KeyCode::Char('q'))), Route::Global(GlobalAction::Quit));
    }

    #[test]
    fn test_alt_modified_keys_are_not_shortcuts() {
        let sidebar = ctx(false, FocusMode::Sidebar, false);
        let alt_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::ALT);
        assert_eq!(route(sidebar, &alt_q), Route::Tab);
    }

    #[test]
    fn test_number_keys_select_tabs() {
        let mut panel = resized(120, 40);
        for (n, expected) in [('3', 2), ('5', 4), ('1', 0), ('4', 3), ('2', 1)] {
            press(&mut panel, KeyCode::Char(n));
            assert_eq!(active(&panel), expected);
            let focused = panel.state.tabs.iter().filter(|tab| tab.focused()).count();
            assert_eq!(focused, 1);
        }
    }

    #[test]
    fn test_release_events_are_ignored() {
        let mut panel = resized(120, 40);
        let release =
            KeyEvent::new_with_kind(KeyCode::Char('3'), KeyModifiers::NONE, KeyEventKind::Release);
        drive(&mut panel, Input::Terminal(Event::Key(release)));
        assert_eq!(active(&panel), 0);
    }

    #[test]
    fn test_non_viable_terminal_shows_only_advisory() {
        let mut panel = resized(50, 10);
        assert!(!panel.state.geometry.viable);
        let text = screen(&panel, 50, 10);
        assert!(text.contains("too small"));
        assert!(!text.contains("Fleet"));

        // Tab-local keys do nothing while hidden; globals still work.
        press(&mut panel, KeyCode::Down);
        press(&mut panel, KeyCode::Char('4'));
        assert_eq!(active(&panel), 3);

        drive(&mut panel, Input::Terminal(Event::Resize { width: 120, height: 40 }));
        let text = screen(&panel, 120, 40);
        assert!(!text.contains("too small"));
        assert!(text.contains("1 Fleet"));
    }

    #[tokio::test]
    async fn test_regular_layout_renders_fleet() {
        let panel = booted().await;
        let text = screen(&panel, 120, 40);
        assert!(text.contains("web-1"));
        assert!(text.contains("db-1"));
        assert!(text.contains(coop_tui_fwk::EXIT_LABEL));
        assert!(panel.state.pending.is_none());
    }

    #[tokio::test]
    async fn test_modal_preempts_globals_end_to_end() {
        let mut panel = booted().await;
        press(&mut panel, KeyCode::End);
        press(&mut panel, KeyCode::Enter);
        assert_eq!(panel.state.focus_target(), coop_tui_fwk::FocusTarget::TabForm);

        // "q" goes into the name field.
        press(&mut panel, KeyCode::Char('q'));
        assert!(!panel.state.should_quit);

        press(&mut panel, KeyCode::Down);
        press(&mut panel, KeyCode::Enter);
        assert!(panel.state.modal_open());

        press(&mut panel, KeyCode::Char('q'));
        press(&mut panel, KeyCode::Char('3'));
        drive(&mut panel, Input::Terminal(Event::Key(ctrl_c())));
        drive(&mut panel, Input::Terminal(Event::click(12, 0)));
        assert!(!panel.state.should_quit);
        assert_eq!(active(&panel), 0);
        assert!(panel.state.modal_open());

        press(&mut panel, KeyCode::Esc);
        assert!(!panel.state.modal_open());
        assert_eq!(panel.state.focus_target(), coop_tui_fwk::FocusTarget::TabForm);

        // Back on the name field, Ctrl+C still quits.
        press(&mut panel, KeyCode::Up);
        drive(&mut panel, Input::Terminal(Event::Key(ctrl_c())));
        assert!(panel.state.should_quit);
    }

    #[tokio::test]
    async fn test_confirm_on_running_vm_stops_it() {
        let mut panel = booted().await;
        let commands = press(&mut panel, KeyCode::Enter);
        let pending = panel.state.pending.as_ref().expect("pending");
        assert_eq!(pending.kind(), "stop");
        assert_eq!(pending.tag.target, "web-1");
        assert!(commands.iter().any(|c| c.tags().contains(&&Tag::new("stop", "web-1"))));

        // A second press before the result arrives is dropped.
        let before = panel.state.in_flight.len();
        let again = press(&mut panel, KeyCode::Enter);
        assert!(again.iter().all(|c| !c.tags().contains(&&Tag::new("stop", "web-1"))));
        assert_eq!(panel.state.in_flight.len(), before);
        let last = panel.state.shared.log.last().expect("log line");
        assert_eq!(last.text, "stop web-1 is already running");

        pump(&mut panel, commands).await;
        assert!(panel.state.pending.is_none());
        assert!(panel.state.in_flight.is_empty());
        assert!(panel.state.shared.log.iter().any(|e| e.text == "stopped web-1"));
    }

    #[tokio::test]
    async fn test_delete_asks_before_running() {
        let mut panel = booted().await;
        let asked = press(&mut panel, KeyCode::Char('d'));
        assert!(asked.iter().all(|c| c.tags().is_empty()));
        assert!(panel.state.modal_open());

        press(&mut panel, KeyCode::Char('q'));
        assert!(!panel.state.should_quit);
        press(&mut panel, KeyCode::Esc);
        assert!(!panel.state.modal_open());
        assert!(panel.state.in_flight.is_empty());

        press(&mut panel, KeyCode::Char('d'));
        let commands = press(&mut panel, KeyCode::Enter);
        assert!(commands.iter().any(|c| c.tags().contains(&&Tag::new("delete", "web-1"))));
        assert!(!panel.state.modal_open());
    }

    #[test]
    fn test_download_progress_then_success() {
        let mut panel = resized(120, 40);
        let tag = Tag::new(kind::DOWNLOAD, "alpine-3.20");
        let scheduled = panel.finish(Command::stream(tag.clone(), futures::stream::empty::<Msg>()));
        assert!(panel.state.is_downloading());
        assert!(panel.state.ticking);
        assert_eq!(scheduled.tags(), vec![&tag]);

        for fraction in [0.0, 0.3, 0.7] {
            drive(
                &mut panel,
                Input::Message(Msg::DownloadProgress {
                    image: "alpine-3.20".into(),
                    fraction,
                }),
            );
        }
        assert_eq!(panel.state.download.as_ref().map(|d| d.progress), Some(0.7));
        let lines_before = panel.state.shared.log.len();

        drive(
            &mut panel,
            Input::Message(Msg::DownloadFinished {
                image: "alpine-3.20".into(),
                result: Ok("/tmp/alpine-3.20.qcow2".into()),
            }),
        );
        assert!(!panel.state.is_downloading());
        assert!(!panel.state.is_in_flight(&tag));
        assert_eq!(panel.state.shared.log.len(), lines_before + 1);
        let completions = panel
            .state
            .shared
            .log
            .iter()
            .filter(|e| e.text.starts_with("downloaded alpine-3.20"))
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_tick_lapses_when_idle() {
        let mut panel = resized(120, 40);
        let tag = Tag::new(kind::PRUNE, "unused");
        panel.finish(Command::tracked(tag.clone(), async { Msg::Refresh }));
        assert!(panel.state.ticking);

        let rearmed = drive(&mut panel, Input::Message(Msg::Tick));
        assert_eq!(rearmed.len(), 1);
        assert_eq!(panel.state.spinner, 1);

        panel.state.settle(&tag);
        let lapsed = drive(&mut panel, Input::Message(Msg::Tick));
        assert!(lapsed.is_empty());
        assert!(!panel.state.ticking);
    }

    #[test]
    fn test_header_clicks_switch_tabs_and_quit() {
        let mut panel = resized(120, 40);
        let cells = panel.state.tabs.header_layout(120);
        let logs = cells[3].area;
        drive(&mut panel, Input::Terminal(Event::click(logs.x + 1, 0)));
        assert_eq!(active(&panel), 3);

        // Off the end of the labels, nothing happens.
        drive(&mut panel, Input::Terminal(Event::click(90, 0)));
        assert_eq!(active(&panel), 3);
        assert!(!panel.state.should_quit);

        let exit = cells.last().expect("exit").area;
        drive(&mut panel, Input::Terminal(Event::click(exit.x, 0)));
        assert!(panel.state.should_quit);
    }

    #[tokio::test]
    async fn test_refresh_key_reloads_everything() {
        let mut panel = booted().await;
        let commands = press(&mut panel, KeyCode::Char('r'));
        let tags: Vec<String> = commands
            .iter()
            .flat_map(|c| c.tags())
            .map(ToString::to_string)
            .collect();
        assert!(tags.contains(&"refresh fleet".to_string()));
        assert!(tags.contains(&"refresh catalog".to_string()));
        assert!(tags.contains(&"refresh cache".to_string()));
    }

    #[tokio::test]
    async fn test_wheel_moves_selection() {
        let mut panel = booted().await;
        let wheel = |kind| {
            Event::Mouse(MouseEvent {
                kind,
                column: 5,
                row: 6,
                modifiers: KeyModifiers::NONE,
            })
        };
        let commands = drive(&mut panel, Input::Terminal(wheel(MouseEventKind::ScrollDown)));
        assert!(commands.iter().any(|c| c.tags().contains(&&Tag::new("info", "db-1"))));
    }
}
