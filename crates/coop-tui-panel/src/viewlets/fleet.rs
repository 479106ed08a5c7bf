//! Fleet tab: running instances, their details and quick spawning.

use coop_tui_fwk::{
    Command, Event, EventResult, FocusMode, Geometry, Hit, KeyCode, KeyEvent, Shortcut,
    Shortcuts, Viewlet,
};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use super::{pair, render_heading, render_lines, spawn_fields, spawn_form, SidebarItem};
use crate::commands;
use crate::message::{LaunchKind, Msg, OpKind};
use crate::provider::{SpawnOptions, SpawnSource, VmDetail, VmSummary};
use crate::state::Shared;
use crate::widgets::{list, Field, FieldKind, Form, Picker, PickerOutcome};

const CONFIRM: &str = "confirm";
const CANCEL: &str = "cancel";

/// Keys listed on the help tab.
pub const KEYS: &[Shortcut] = &[
    Shortcut::new("↑/↓ j/k", "select VM"),
    Shortcut::new("Enter", "start / stop, open spawn form"),
    Shortcut::new("f", "force-stop, after confirming"),
    Shortcut::new("d / Del", "delete, after confirming"),
    Shortcut::new("s", "open SSH in a terminal"),
    Shortcut::new("v", "open VNC viewer"),
    Shortcut::new("Esc", "leave the spawn form"),
];

pub struct Fleet {
    items: Vec<SidebarItem>,
    selected: usize,
    mode: FocusMode,
    focused: bool,
    /// VM whose detail is wanted; other info results are stale.
    detail_target: Option<String>,
    detail: Option<VmDetail>,
    form: Form,
    picker: Option<Picker>,
    /// Destructive operation waiting for a yes in the picker.
    confirm: Option<(OpKind, String)>,
    templates: Vec<String>,
    /// VM the spawn form submitted, until its result arrives.
    spawning: Option<String>,
    loaded: bool,
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            items: vec![SidebarItem::SpawnAction],
            selected: 0,
            mode: FocusMode::Sidebar,
            focused: false,
            detail_target: None,
            detail: None,
            form: Form::default(),
            picker: None,
            confirm: None,
            templates: Vec::new(),
            spawning: None,
            loaded: false,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn detail(&self) -> Option<&VmDetail> {
        self.detail.as_ref()
    }

    pub fn detail_target(&self) -> Option<&str> {
        self.detail_target.as_deref()
    }

    fn selected_vm(&self) -> Option<&VmSummary> {
        match self.items.get(self.selected) {
            Some(SidebarItem::Vm(vm)) => Some(vm),
            _ => None,
        }
    }

    /// Move the selection and ask for the detail of the VM under it.
    fn select(&mut self, index: usize, ctx: &Shared) -> Command<Msg> {
        self.selected = index.min(self.items.len().saturating_sub(1));
        let Some(name) = self.selected_vm().map(|vm| vm.name.clone()) else {
            self.detail_target = None;
            self.detail = None;
            return Command::none();
        };
        if self.detail.as_ref().is_some_and(|d| d.summary.name != name) {
            self.detail = None;
        }
        let command = commands::vm_info(&ctx.services, &name);
        self.detail_target = Some(name);
        command
    }

    /// Ask before running `op` on the selected VM.
    fn ask(&mut self, op: OpKind) -> Command<Msg> {
        let Some(name) = self.selected_vm().map(|vm| vm.name.clone()) else {
            return Command::none();
        };
        let yes = format!("{} {name}", op.as_str());
        let items = vec![yes.clone(), CANCEL.to_string()];
        self.picker = Some(Picker::new(CONFIRM, "Are you sure?", items, &yes));
        self.confirm = Some((op, name));
        // The FSM only reaches Modal from a form; this one sits over the list.
        self.mode = FocusMode::Modal;
        Command::none()
    }

    /// Close the confirmation, running the operation if `yes`.
    fn answer(&mut self, yes: bool, ctx: &Shared) -> Command<Msg> {
        self.picker = None;
        self.mode = FocusMode::Sidebar;
        match self.confirm.take() {
            Some((op, name)) if yes => commands::vm_operation(&ctx.services, op, &name),
            _ => Command::none(),
        }
    }

    fn launch(&self, kind: LaunchKind, ctx: &Shared) -> Command<Msg> {
        match self.selected_vm() {
            Some(vm) => commands::launch(&ctx.services, &ctx.settings.launch, kind, vm.clone()),
            None => Command::none(),
        }
    }

    /// Enter on the selected row.
    fn activate(&mut self, ctx: &Shared) -> Command<Msg> {
        match self.items.get(self.selected) {
            Some(SidebarItem::Vm(vm)) => {
                let op = if vm.state.is_running() {
                    OpKind::Stop
                } else {
                    OpKind::Start
                };
                commands::vm_operation(&ctx.services, op, &vm.name)
            }
            Some(SidebarItem::SpawnAction) => {
                self.open_form(ctx);
                Command::none()
            }
            Some(SidebarItem::HatchType(_) | SidebarItem::Section(_))
            | None => Command::none(),
        }
    }

    fn open_form(&mut self, ctx: &Shared) {
        let defaults = &ctx.settings.defaults;
        self.form = spawn_form(
            Field::select("template", "Template", defaults.template.clone()),
            defaults,
            "Spawn",
        );
        self.form.activate();
        self.mode = self.mode.activate();
    }

    fn close_form(&mut self) {
        self.picker = None;
        self.confirm = None;
        self.form.deactivate();
        self.mode = FocusMode::Sidebar;
    }

    fn open_picker(&mut self) {
        let current = self.form.value("template").unwrap_or_default().to_string();
        self.picker = Some(Picker::new(
            "template",
            "Template",
            self.templates.clone(),
            &current,
        ));
        self.mode = self.mode.open_modal();
    }

    /// Enter on the focused form field.
    fn press_field(&mut self, ctx: &Shared) -> Command<Msg> {
        let kind = self.form.focused().map(|f| f.kind.clone());
        match kind {
            Some(FieldKind::Text(_)) => {
                self.form.focus_next();
                Command::none()
            }
            Some(FieldKind::Select(_)) => {
                self.open_picker();
                Command::none()
            }
            Some(FieldKind::Button) => self.submit(ctx),
            None => Command::none(),
        }
    }

    fn submit(&mut self, ctx: &Shared) -> Command<Msg> {
        let fields = match spawn_fields(&self.form, "template", "template") {
            Ok(fields) => fields,
            Err(line) => return Command::message(Msg::Log(line)),
        };
        self.spawning = Some(fields.name.clone());
        commands::spawn(
            &ctx.services,
            SpawnOptions {
                name: fields.name,
                source: SpawnSource::Template(fields.source),
                cpus: fields.cpus,
                memory_mb: fields.memory_mb,
                ssh_user: ctx.settings.defaults.ssh_user.clone(),
            },
        )
    }

    fn apply_fleet(&mut self, vms: &[VmSummary], ctx: &Shared) -> Command<Msg> {
        let keep = self
            .detail_target
            .clone()
            .or_else(|| self.selected_vm().map(|vm| vm.name.clone()));
        self.items = vms
            .iter()
            .cloned()
            .map(SidebarItem::Vm)
            .chain([SidebarItem::SpawnAction])
            .collect();
        self.loaded = true;

        let index = keep
            .and_then(|name| vms.iter().position(|vm| vm.name == name))
            .unwrap_or(self.selected);
        self.select(index, ctx)
    }

    fn list_hit(&self, x: u16, y: u16, geometry: &Geometry) -> Option<usize> {
        let rect = geometry.list_rect(self.mode == FocusMode::Sidebar)?;
        list::hit_row(rect, x, y, self.selected, self.items.len())
    }

    fn detail_lines(&self, ctx: &Shared) -> Vec<Line<'static>> {
        let theme = &ctx.theme;
        match self.items.get(self.selected) {
            Some(SidebarItem::Vm(vm)) => {
                let port = |p: Option<u16>| p.map_or_else(|| "-".to_string(), |p| p.to_string());
                let mut lines = vec![
                    pair("Name", vm.name.clone(), theme),
                    Line::from(vec![
                        Span::styled(format!("{:<12}", "State"), theme.muted()),
                        Span::styled(vm.state.to_string(), theme.vm_state(vm.state)),
                    ]),
                    pair("PID", vm.pid.map_or_else(|| "-".into(), |p| p.to_string()), theme),
                    pair("SSH port", port(vm.ssh_port), theme),
                    pair("VNC port", port(vm.vnc_port), theme),
                    pair("SSH user", vm.ssh_user.clone(), theme),
                ];
                match self.detail.as_ref().filter(|d| d.summary.name == vm.name) {
                    Some(detail) => {
                        lines.push(pair("CPUs", detail.cpus.to_string(), theme));
                        lines.push(pair("Memory", format!("{} MiB", detail.memory_mb), theme));
                        lines.push(pair("Image", detail.image.clone(), theme));
                        if let Some(started) = detail.started_at {
                            lines.push(pair("Up since", started.format("%Y-%m-%d %H:%M").to_string(), theme));
                        }
                    }
                    None => lines.push(Line::styled("loading details…", theme.muted())),
                }
                if let Some(port) = vm.ssh_port {
                    lines.push(Line::default());
                    lines.push(Line::styled(
                        format!("ssh -p {port} {}@127.0.0.1", vm.ssh_user),
                        theme.muted(),
                    ));
                }
                lines
            }
            Some(SidebarItem::SpawnAction) => vec![
                Line::styled("Spawn a VM from a template.", theme.text()),
                Line::styled("Press Enter to open the form.", theme.muted()),
            ],
            Some(SidebarItem::HatchType(_) | SidebarItem::Section(_))
            | None => Vec::new(),
        }
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewlet<Msg, Shared> for Fleet {
    fn id(&self) -> &'static str {
        "fleet"
    }

    fn title(&self) -> &'static str {
        "Fleet"
    }

    fn init(&mut self, ctx: &Shared) -> Command<Msg> {
        commands::refresh_fleet(&ctx.services)
    }

    fn mode(&self) -> FocusMode {
        self.mode
    }

    fn input_focused(&self) -> bool {
        self.focused && self.mode == FocusMode::Form && self.form.input_focused()
    }

    fn handle_modal(&mut self, key: &KeyEvent, ctx: &Shared) -> Command<Msg> {
        let Some(picker) = self.picker.as_mut() else {
            self.confirm = None;
            self.mode = self.mode.dismiss();
            return Command::none();
        };
        if self.confirm.is_some() {
            return match picker.handle_key(key) {
                PickerOutcome::Open => Command::none(),
                PickerOutcome::Confirmed(choice) => self.answer(choice != CANCEL, ctx),
                PickerOutcome::Dismissed => self.answer(false, ctx),
            };
        }
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
        let command = match self.mode {
            FocusMode::Sidebar => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.select(self.selected.saturating_sub(1), ctx),
                KeyCode::Down | KeyCode::Char('j') => self.select(self.selected + 1, ctx),
                KeyCode::Home => self.select(0, ctx),
                KeyCode::End => self.select(usize::MAX, ctx),
                KeyCode::Enter => self.activate(ctx),
                KeyCode::Char('f') => self.ask(OpKind::ForceStop),
                KeyCode::Char('d') | KeyCode::Delete => self.ask(OpKind::Delete),
                KeyCode::Char('s') => self.launch(LaunchKind::Ssh, ctx),
                KeyCode::Char('v') => self.launch(LaunchKind::Vnc, ctx),
                _ => return None,
            },
            FocusMode::Form => match key.code {
                KeyCode::Esc => {
                    self.close_form();
                    Command::none()
                }
                KeyCode::Up | KeyCode::BackTab => {
                    self.form.focus_prev();
                    Command::none()
                }
                KeyCode::Down | KeyCode::Tab => {
                    self.form.focus_next();
                    Command::none()
                }
                KeyCode::Enter => self.press_field(ctx),
                _ => return None,
            },
            FocusMode::Modal => return None,
        };
        Some(command)
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

    fn receive(&mut self, message: &Msg, ctx: &Shared) -> Command<Msg> {
        match message {
            Msg::Refresh => commands::refresh_fleet(&ctx.services),
            Msg::Fleet(Ok(vms)) => self.apply_fleet(vms, ctx),
            Msg::Info { name, result } => {
                if self.detail_target.as_deref() != Some(name.as_str()) {
                    tracing::debug!(%name, "dropping stale info result");
                    return Command::none();
                }
                match result {
                    Ok(detail) => self.detail = Some(detail.clone()),
                    Err(err) if err.is_not_found() => {
                        self.detail = None;
                        self.detail_target = None;
                    }
                    Err(_) => {}
                }
                Command::none()
            }
            Msg::Operation { kind, name, result } => {
                if *kind == OpKind::Spawn && self.spawning.as_deref() == Some(name.as_str()) {
                    self.spawning = None;
                    if result.is_ok() {
                        self.close_form();
                        self.detail_target = Some(name.clone());
                    }
                }
                commands::refresh_fleet(&ctx.services)
            }
            Msg::Templates(Ok(templates)) => {
                self.templates = templates.clone();
                Command::none()
            }
            _ => Command::none(),
        }
    }

    fn hit_test(&self, x: u16, y: u16, geometry: &Geometry) -> Hit {
        if let Some(row) = self.list_hit(x, y, geometry) {
            return Hit::Row(row);
        }
        if self.mode == FocusMode::Form {
            if let Some(rect) = geometry.detail_rect(false) {
                if let Some(key) = self.form.hit_test(rect, x, y) {
                    return Hit::Action(key);
                }
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
                if index == self.selected
                    && matches!(self.items.get(index), Some(SidebarItem::SpawnAction))
                {
                    return self.activate(ctx);
                }
                self.select(index, ctx)
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
        let list_focused = self.mode == FocusMode::Sidebar || self.confirm.is_some();

        if let Some(rect) = geometry.list_rect(list_focused) {
            render_heading(frame, geometry, rect, "VMs", theme);
            let rows = self.items.iter().map(|item| item.line(theme)).collect();
            list::render_list(frame, rect, rows, self.selected, self.focused && list_focused, theme);
        }

        if let Some(rect) = geometry.detail_rect(list_focused) {
            if list_focused {
                render_heading(frame, geometry, rect, "Details", theme);
                if !self.loaded {
                    render_lines(frame, rect, vec![Line::styled("loading fleet…", theme.muted())]);
                } else {
                    render_lines(frame, rect, self.detail_lines(ctx));
                }
            } else {
                render_heading(frame, geometry, rect, "Spawn new VM", theme);
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
            FocusMode::Sidebar => {
                hints.push(Shortcut::new("Enter", "start/stop"));
                hints.push(Shortcut::new("f", "force-stop"));
                hints.push(Shortcut::new("d", "delete"));
                hints.push(Shortcut::new("s", "ssh"));
                hints.push(Shortcut::new("v", "vnc"));
            }
            FocusMode::Form => {
                hints.push(Shortcut::new("↑/↓", "field"));
                hints.push(Shortcut::new("Enter", "choose/spawn"));
                hints.push(Shortcut::new("Esc", "back"));
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
