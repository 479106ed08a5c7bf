//! Hatchery tab: create VMs from cloud images, local images or templates,
//! and manage the image cache.
//!
//! A cloud-image hatch runs in three steps, each started by the result of
//! the previous one: resolve the image in the catalog, download it, spawn
//! from the downloaded file. Results for any other hatch are ignored.

use std::path::PathBuf;

use coop_tui_fwk::{
    Command, Event, EventResult, FocusMode, Geometry, Hit, KeyCode, KeyEvent, Rect, Shortcut,
    Shortcuts, Viewlet,
};
use ratatui::text::{Line, Span};
use ratatui::Frame;

use super::{
    pair, render_heading, render_lines, spawn_fields, spawn_form, HatchKind, SidebarItem,
    SpawnFields,
};
use crate::commands::{self, image_id};
use crate::error::PanelError;
use crate::message::{human_bytes, Msg, OpKind};
use crate::provider::{CacheEntry, CacheStats, ImageRef, SpawnOptions, SpawnSource};
use crate::state::Shared;
use crate::widgets::{list, Field, FieldKind, Form, Picker, PickerOutcome};

pub const KEYS: &[Shortcut] = &[
    Shortcut::new("↑/↓", "select a hatch type"),
    Shortcut::new("Enter", "open its form, pick a source, submit"),
    Shortcut::new("p", "prune unused cached images"),
    Shortcut::new("P", "prune every cached image"),
    Shortcut::new("Esc", "leave the form"),
];

const SOURCE: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    Resolving { query: String },
    Downloading { image: String },
    Spawning,
}

/// A hatch in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Hatch {
    fields: SpawnFields,
    stage: Stage,
}

pub struct Hatchery {
    selected: usize,
    mode: FocusMode,
    focused: bool,
    form: Form,
    form_kind: Option<HatchKind>,
    picker: Option<Picker>,
    catalog: Vec<ImageRef>,
    images: Vec<String>,
    templates: Vec<String>,
    cache: Vec<CacheEntry>,
    stats: Option<CacheStats>,
    hatch: Option<Hatch>,
}

impl Hatchery {
    pub fn new() -> Self {
        Self {
            selected: 0,
            mode: FocusMode::Sidebar,
            focused: false,
            form: Form::default(),
            form_kind: None,
            picker: None,
            catalog: Vec::new(),
            images: Vec::new(),
            templates: Vec::new(),
            cache: Vec::new(),
            stats: None,
            hatch: None,
        }
    }

    fn kind(&self) -> HatchKind {
        HatchKind::ALL[self.selected.min(HatchKind::ALL.len() - 1)]
    }

    fn reload(&self, ctx: &Shared) -> Command<Msg> {
        let services = &ctx.services;
        Command::batch([
            commands::load_catalog(services, &ctx.settings),
            commands::load_images(services),
            commands::load_templates(services),
            commands::load_cache(services),
        ])
    }

    fn sources(&self, kind: HatchKind) -> Vec<String> {
        match kind {
            HatchKind::CloudImage => self
                .catalog
                .iter()
                .map(|image| format!("{} {}", image.name, image.version))
                .collect(),
            HatchKind::LocalImage => self.images.clone(),
            HatchKind::Template => self.templates.clone(),
            HatchKind::ImageCache => Vec::new(),
        }
    }

    fn source_label(kind: HatchKind) -> &'static str {
        match kind {
            HatchKind::Template => "template",
            _ => "image",
        }
    }

    fn open_form(&mut self, ctx: &Shared) -> Command<Msg> {
        let kind = self.kind();
        let defaults = &ctx.settings.defaults;
        let (source, button) = match kind {
            HatchKind::CloudImage => (Field::select(SOURCE, "Image", ""), "Download & spawn"),
            HatchKind::LocalImage => (Field::select(SOURCE, "Image", ""), "Spawn"),
            HatchKind::Template => (
                Field::select(SOURCE, "Template", defaults.template.clone()),
                "Spawn",
            ),
            // The cache has no form; Enter reloads it.
            HatchKind::ImageCache => return commands::load_cache(&ctx.services),
        };
        self.form = spawn_form(source, defaults, button);
        self.form.activate();
        self.form_kind = Some(kind);
        self.mode = self.mode.activate();
        Command::none()
    }

    fn close_form(&mut self) {
        self.picker = None;
        self.form.deactivate();
        self.mode = FocusMode::Sidebar;
    }

    fn press_field(&mut self, ctx: &Shared) -> Command<Msg> {
        let kind = self.form.focused().map(|f| f.kind.clone());
        match kind {
            Some(FieldKind::Text(_)) => {
                self.form.focus_next();
                Command::none()
            }
            Some(FieldKind::Select(current)) => {
                let form_kind = self.form_kind.unwrap_or(HatchKind::Template);
                let title = match form_kind {
                    HatchKind::Template => "Template",
                    _ => "Image",
                };
                self.picker = Some(Picker::new(SOURCE, title, self.sources(form_kind), &current));
                self.mode = self.mode.open_modal();
                Command::none()
            }
            Some(FieldKind::Button) => self.submit(ctx),
            None => Command::none(),
        }
    }

    fn submit(&mut self, ctx: &Shared) -> Command<Msg> {
        let Some(kind) = self.form_kind else {
            return Command::none();
        };
        if let Some(hatch) = &self.hatch {
            return Command::message(Msg::Log(format!(
                "still hatching {}, wait for it to finish",
                hatch.fields.name
            )));
        }
        let fields = match spawn_fields(&self.form, SOURCE, Self::source_label(kind)) {
            Ok(fields) => fields,
            Err(line) => return Command::message(Msg::Log(line)),
        };

        match kind {
            HatchKind::CloudImage => {
                let query = fields.source.clone();
                self.hatch = Some(Hatch {
                    fields,
                    stage: Stage::Resolving {
                        query: query.clone(),
                    },
                });
                commands::resolve_image(&ctx.services, &query)
            }
            HatchKind::LocalImage => {
                let path = ctx.settings.image_dir().join(format!("{}.qcow2", fields.source));
                self.spawn(SpawnSource::Image(path), fields, ctx)
            }
            HatchKind::Template => {
                let source = SpawnSource::Template(fields.source.clone());
                self.spawn(source, fields, ctx)
            }
            HatchKind::ImageCache => Command::none(),
        }
    }

    fn spawn(&mut self, source: SpawnSource, fields: SpawnFields, ctx: &Shared) -> Command<Msg> {
        let options = SpawnOptions {
            name: fields.name.clone(),
            source,
            cpus: fields.cpus,
            memory_mb: fields.memory_mb,
            ssh_user: ctx.settings.defaults.ssh_user.clone(),
        };
        self.hatch = Some(Hatch {
            fields,
            stage: Stage::Spawning,
        });
        commands::spawn(&ctx.services, options)
    }

    fn on_resolved(
        &mut self,
        query: &str,
        result: &Result<ImageRef, PanelError>,
        ctx: &Shared,
    ) -> Command<Msg> {
        let Some(hatch) = self.hatch.as_mut() else {
            return Command::none();
        };
        if hatch.stage != (Stage::Resolving { query: query.to_string() }) {
            return Command::none();
        }
        match result {
            Ok(image) => {
                hatch.stage = Stage::Downloading {
                    image: image_id(image),
                };
                commands::download(&ctx.services, image, ctx.settings.image_dir())
            }
            Err(_) => {
                self.hatch = None;
                Command::none()
            }
        }
    }

    fn on_downloaded(
        &mut self,
        image: &str,
        result: &Result<PathBuf, PanelError>,
        ctx: &Shared,
    ) -> Command<Msg> {
        let reload = Command::batch([
            commands::load_images(&ctx.services),
            commands::load_cache(&ctx.services),
        ]);
        let Some(hatch) = self.hatch.take() else {
            return reload;
        };
        if hatch.stage != (Stage::Downloading { image: image.to_string() }) {
            self.hatch = Some(hatch);
            return reload;
        }
        match result {
            Ok(path) => self
                .spawn(SpawnSource::Image(path.clone()), hatch.fields, ctx)
                .and(reload),
            Err(_) => reload,
        }
    }

    fn status_line(&self, ctx: &Shared) -> Option<Line<'static>> {
        let hatch = self.hatch.as_ref()?;
        let text = match &hatch.stage {
            Stage::Resolving { query } => format!("resolving {query}…"),
            Stage::Downloading { image } => format!("downloading {image}…"),
            Stage::Spawning => format!("spawning {}…", hatch.fields.name),
        };
        Some(Line::styled(text, ctx.theme.warning()))
    }

    fn cache_lines(&self, ctx: &Shared) -> Vec<Line<'static>> {
        let theme = &ctx.theme;
        let mut lines = Vec::new();
        match self.stats {
            Some(stats) => {
                lines.push(pair("Images", stats.entries.to_string(), theme));
                lines.push(pair("Total", human_bytes(stats.total_bytes), theme));
                lines.push(pair("Unused", human_bytes(stats.unused_bytes), theme));
            }
            None => lines.push(Line::styled("reading cache…", theme.muted())),
        }
        lines.push(Line::default());
        for entry in &self.cache {
            let (mark, style) = if entry.in_use {
                ("●", theme.success())
            } else {
                ("○", theme.muted())
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{mark} "), style),
                Span::styled(format!("{:<24}", entry.name), theme.text()),
                Span::styled(human_bytes(entry.size_bytes), theme.muted()),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::styled("p prunes unused images, P prunes all", theme.muted()));
        lines
    }

    fn description(&self, ctx: &Shared) -> Vec<Line<'static>> {
        let theme = &ctx.theme;
        let text = match self.kind() {
            HatchKind::CloudImage => {
                "Download an image from the catalog, then spawn a VM from it."
            }
            HatchKind::LocalImage => "Spawn a VM from an image already in the cache.",
            HatchKind::Template => "Spawn a VM from a provider template.",
            HatchKind::ImageCache => return self.cache_lines(ctx),
        };
        let mut lines = vec![
            Line::styled(text, theme.text()),
            Line::styled("Press Enter to open the form.", theme.muted()),
        ];
        if let Some(status) = self.status_line(ctx) {
            lines.push(Line::default());
            lines.push(status);
        }
        lines
    }
}

impl Default for Hatchery {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewlet<Msg, Shared> for Hatchery {
    fn id(&self) -> &'static str {
        "hatchery"
    }

    fn title(&self) -> &'static str {
        "Hatchery"
    }

    fn init(&mut self, ctx: &Shared) -> Command<Msg> {
        self.reload(ctx)
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
        let last = HatchKind::ALL.len() - 1;
        let command = match self.mode {
            FocusMode::Sidebar => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.selected = self.selected.saturating_sub(1);
                    Command::none()
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.selected = (self.selected + 1).min(last);
                    Command::none()
                }
                KeyCode::Home => {
                    self.selected = 0;
                    Command::none()
                }
                KeyCode::End => {
                    self.selected = last;
                    Command::none()
                }
                KeyCode::Enter => self.open_form(ctx),
                KeyCode::Char('p') if self.kind() == HatchKind::ImageCache => {
                    commands::prune_cache(&ctx.services, true)
                }
                KeyCode::Char('P') if self.kind() == HatchKind::ImageCache => {
                    commands::prune_cache(&ctx.services, false)
                }
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
            Msg::Refresh => self.reload(ctx),
            Msg::Catalog(Ok(catalog)) => {
                self.catalog = catalog.images.clone();
                Command::none()
            }
            Msg::Images(Ok(images)) => {
                self.images = images.clone();
                Command::none()
            }
            Msg::Templates(Ok(templates)) => {
                self.templates = templates.clone();
                Command::none()
            }
            Msg::Cache(Ok((entries, stats))) => {
                self.cache = entries.clone();
                self.stats = Some(*stats);
                Command::none()
            }
            Msg::Pruned { .. } => Command::batch([
                commands::load_cache(&ctx.services),
                commands::load_images(&ctx.services),
            ]),
            Msg::ImageResolved { query, result } => self.on_resolved(query, result, ctx),
            Msg::DownloadFinished { image, result } => self.on_downloaded(image, result, ctx),
            Msg::Operation {
                kind: OpKind::Spawn,
                name,
                result,
            } => {
                let ours = self.hatch.as_ref().is_some_and(|h| {
                    h.stage == Stage::Spawning && h.fields.name == *name
                });
                if ours {
                    self.hatch = None;
                    if result.is_ok() {
                        self.close_form();
                    }
                    return commands::load_cache(&ctx.services);
                }
                Command::none()
            }
            _ => Command::none(),
        }
    }

    fn hit_test(&self, x: u16, y: u16, geometry: &Geometry) -> Hit {
        if let Some(rect) = geometry.list_rect(self.mode == FocusMode::Sidebar) {
            if let Some(row) = list::hit_row(rect, x, y, self.selected, HatchKind::ALL.len()) {
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
                    return self.open_form(ctx);
                }
                self.selected = index.min(HatchKind::ALL.len() - 1);
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
            render_heading(frame, geometry, rect, "Hatch", theme);
            let rows = HatchKind::ALL
                .iter()
                .map(|kind| SidebarItem::HatchType(*kind).line(theme))
                .collect();
            list::render_list(frame, rect, rows, self.selected, self.focused && list_focused, theme);
        }

        if let Some(rect) = geometry.detail_rect(list_focused) {
            render_heading(frame, geometry, rect, self.kind().label(), theme);
            if list_focused {
                render_lines(frame, rect, self.description(ctx));
            } else {
                self.form.render(frame, rect, theme);
                let used = u16::try_from(self.form.fields().len() + 1).unwrap_or(u16::MAX);
                if let Some(status) = self.status_line(ctx) {
                    if used < rect.height {
                        let row = Rect::new(rect.x, rect.y + used, rect.width, 1);
                        render_lines(frame, row, vec![status]);
                    }
                }
            }
        }

        if let Some(picker) = &self.picker {
            picker.render(frame, geometry, theme);
        }
    }

    fn shortcuts(&self) -> Shortcuts {
        let mut hints = Shortcuts::new();
        match self.mode {
            FocusMode::Sidebar if self.kind() == HatchKind::ImageCache => {
                hints.push(Shortcut::new("p", "prune unused"));
                hints.push(Shortcut::new("P", "prune all"));
                hints.push(Shortcut::new("Enter", "reload"));
            }
            FocusMode::Sidebar => hints.push(Shortcut::new("Enter", "open form")),
            FocusMode::Form => {
                hints.push(Shortcut::new("↑/↓", "field"));
                hints.push(Shortcut::new("Enter", "choose/submit"));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{run, services};
    use crate::settings::Settings;
    use coop_tui_fwk::{KeyModifiers, Tag};
    use std::collections::VecDeque;

    fn ctx() -> Shared {
        Shared::new(Settings::default(), services())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn loaded(ctx: &Shared) -> Hatchery {
        let mut hatchery = Hatchery::new();
        hatchery.focus();
        for msg in run(hatchery.init(ctx)).await {
            hatchery.receive(&msg, ctx);
        }
        hatchery
    }

    fn fill(hatchery: &mut Hatchery, name: &str, source: &str) {
        hatchery.form.set_value("name", name);
        hatchery.form.set_value(SOURCE, source);
        hatchery.form.focus_key("submit");
    }

    #[tokio::test]
    async fn test_init_loads_sources() {
        let ctx = ctx();
        let hatchery = loaded(&ctx).await;
        assert_eq!(hatchery.catalog.len(), 6);
        assert_eq!(hatchery.templates.len(), 3);
        assert_eq!(hatchery.stats.map(|s| s.entries), Some(3));
    }

    #[tokio::test]
    async fn test_cloud_hatch_chains_resolve_download_spawn() {
        let ctx = ctx();
        let mut hatchery = loaded(&ctx).await;
        hatchery.handle_nav(&key(KeyCode::Enter), &ctx);
        assert_eq!(hatchery.mode(), FocusMode::Form);
        fill(&mut hatchery, "edge", "alpine 3.20");

        let command = hatchery.handle_nav(&key(KeyCode::Enter), &ctx).expect("handled");
        assert_eq!(command.tags(), vec![&Tag::new("find", "alpine 3.20")]);

        let mut spawned = false;
        let mut queue: VecDeque<Msg> = run(command).await.into();
        while let Some(msg) = queue.pop_front() {
            if let Msg::Operation { kind: OpKind::Spawn, name, result } = &msg {
                assert_eq!(name, "edge");
                assert!(result.is_ok());
                spawned = true;
            }
            let next = hatchery.receive(&msg, &ctx);
            queue.extend(run(next).await);
        }
        assert!(spawned);
        assert!(hatchery.hatch.is_none());
        assert_eq!(hatchery.mode(), FocusMode::Sidebar);
    }

    #[test]
    fn test_focus_and_blur_are_idempotent() {
        let mut hatchery = Hatchery::new();
        hatchery.focus();
        hatchery.focus();
        assert!(hatchery.focused());
        hatchery.blur();
        hatchery.blur();
        assert!(!hatchery.focused());
        assert!(!hatchery.input_focused());
    }

    #[test]
    fn test_results_for_other_hatches_are_ignored() {
        let ctx = ctx();
        let mut hatchery = Hatchery::new();
        hatchery.hatch = Some(Hatch {
            fields: SpawnFields {
                name: "edge".into(),
                source: "alpine 3.20".into(),
                cpus: 1,
                memory_mb: 512,
            },
            stage: Stage::Downloading {
                image: "alpine-3.20".into(),
            },
        });
        let command = hatchery.receive(
            &Msg::DownloadFinished {
                image: "debian-12".into(),
                result: Ok("/tmp/debian-12.qcow2".into()),
            },
            &ctx,
        );
        assert!(!command.tags().iter().any(|t| t.kind == "spawn"));
        assert!(hatchery.hatch.is_some());

        let command = hatchery.receive(
            &Msg::DownloadFinished {
                image: "alpine-3.20".into(),
                result: Err(PanelError::provider("disk full")),
            },
            &ctx,
        );
        assert!(!command.tags().iter().any(|t| t.kind == "spawn"));
        assert!(hatchery.hatch.is_none());
    }

    #[test]
    fn test_second_hatch_waits() {
        let ctx = ctx();
        let mut hatchery = Hatchery::new();
        hatchery.selected = 2;
        hatchery.handle_nav(&key(KeyCode::Enter), &ctx);
        fill(&mut hatchery, "a", "debian-12");
        let first = hatchery.handle_nav(&key(KeyCode::Enter), &ctx).expect("handled");
        assert_eq!(first.tags(), vec![&Tag::new("spawn", "a")]);
        let second = hatchery.handle_nav(&key(KeyCode::Enter), &ctx).expect("handled");
        assert!(second.tags().is_empty());
    }

    #[test]
    fn test_prune_keys_only_on_cache() {
        let ctx = ctx();
        let mut hatchery = Hatchery::new();
        assert!(hatchery.handle_nav(&key(KeyCode::Char('p')), &ctx).is_none());
        hatchery.handle_nav(&key(KeyCode::End), &ctx);
        let command = hatchery
            .handle_nav(&KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT), &ctx)
            .expect("handled");
        assert_eq!(command.tags(), vec![&Tag::new("prune", "all")]);
    }

    #[test]
    fn test_local_image_spawns_without_download() {
        let mut settings = Settings::default();
        settings.paths.image_dir = "/srv/images".into();
        let ctx = Shared::new(settings, services());
        let mut hatchery = Hatchery::new();
        hatchery.selected = 1;
        hatchery.handle_nav(&key(KeyCode::Enter), &ctx);
        fill(&mut hatchery, "box", "debian-12");
        let command = hatchery.handle_nav(&key(KeyCode::Enter), &ctx).expect("handled");
        assert_eq!(command.tags(), vec![&Tag::new("spawn", "box")]);
        assert_eq!(hatchery.hatch.as_ref().map(|h| &h.stage), Some(&Stage::Spawning));
    }
}
