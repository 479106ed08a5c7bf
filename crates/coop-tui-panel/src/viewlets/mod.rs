//! Tab contents.
//!
//! Sidebar rows are a closed set of item kinds; handlers match on them
//! exhaustively instead of asking a row what it is at runtime.

pub mod config;
pub mod fleet;
pub mod hatchery;
pub mod help;
pub mod logs;

use coop_tui_fwk::{Geometry, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::provider::VmSummary;
use crate::settings::SpawnDefaults;
use crate::theme::Theme;
use crate::widgets::{Field, Form};

pub use config::ConfigView;
pub use fleet::Fleet;
pub use hatchery::Hatchery;
pub use help::Help;
pub use logs::Logs;

/// Ways to create a VM offered by the hatchery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatchKind {
    CloudImage,
    LocalImage,
    Template,
    ImageCache,
}

impl HatchKind {
    pub const ALL: [HatchKind; 4] = [
        HatchKind::CloudImage,
        HatchKind::LocalImage,
        HatchKind::Template,
        HatchKind::ImageCache,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HatchKind::CloudImage => "Cloud image",
            HatchKind::LocalImage => "Local image",
            HatchKind::Template => "Template",
            HatchKind::ImageCache => "Image cache",
        }
    }
}

/// Settings groups shown by the config tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    General,
    Defaults,
    Paths,
    Launch,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 4] = [
        ConfigSection::General,
        ConfigSection::Defaults,
        ConfigSection::Paths,
        ConfigSection::Launch,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConfigSection::General => "General",
            ConfigSection::Defaults => "Defaults",
            ConfigSection::Paths => "Paths",
            ConfigSection::Launch => "Launch",
        }
    }

    /// Key prefix of the settings in this section.
    pub fn prefix(self) -> &'static str {
        match self {
            ConfigSection::General => "ui.",
            ConfigSection::Defaults => "defaults.",
            ConfigSection::Paths => "paths.",
            ConfigSection::Launch => "launch.",
        }
    }
}

/// One sidebar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarItem {
    Vm(VmSummary),
    SpawnAction,
    HatchType(HatchKind),
    Section(ConfigSection),
}

impl SidebarItem {
    pub fn line(&self, theme: &Theme) -> Line<'static> {
        match self {
            SidebarItem::Vm(vm) => Line::from(vec![
                Span::styled("● ", theme.vm_state(vm.state)),
                Span::styled(vm.name.clone(), theme.text()),
            ]),
            SidebarItem::SpawnAction => Line::styled("+ Spawn new VM", theme.heading()),
            SidebarItem::HatchType(kind) => Line::styled(kind.label(), theme.text()),
            SidebarItem::Section(section) => Line::styled(section.label(), theme.text()),
        }
    }
}

/// Draw a heading row above `rect`.
pub(crate) fn render_heading(frame: &mut Frame, geometry: &Geometry, rect: Rect, text: &str, theme: &Theme) {
    frame.render_widget(
        Paragraph::new(Span::styled(text.to_string(), theme.heading())),
        geometry.heading_for(rect),
    );
}

/// Render `lines` into `rect`, clipped to its height.
pub(crate) fn render_lines(frame: &mut Frame, rect: Rect, lines: Vec<Line<'_>>) {
    frame.render_widget(Paragraph::new(lines), rect);
}

/// Label-value line for detail panes.
pub(crate) fn pair(label: &str, value: impl Into<String>, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<12}"), theme.muted()),
        Span::styled(value.into(), theme.text()),
    ])
}

/// Validated values of a spawn form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpawnFields {
    pub name: String,
    pub source: String,
    pub cpus: u32,
    pub memory_mb: u32,
}

/// Read a spawn form with `name`, `source_key`, `cpus` and `memory` fields.
///
/// The error is a line for the operator log.
pub(crate) fn spawn_fields(
    form: &Form,
    source_key: &str,
    source_label: &str,
) -> Result<SpawnFields, String> {
    let value = |key: &str| form.value(key).unwrap_or_default().trim().to_string();
    let name = value("name");
    if name.is_empty() {
        return Err("a VM needs a name".to_string());
    }
    if name.contains(char::is_whitespace) {
        return Err(format!("VM name {name:?} must not contain spaces"));
    }
    let source = value(source_key);
    if source.is_empty() {
        return Err(format!("choose a {source_label} first"));
    }
    let cpus = value("cpus")
        .parse::<u32>()
        .map_err(|_| "CPUs must be a number".to_string())?;
    let memory_mb = value("memory")
        .parse::<u32>()
        .map_err(|_| "memory must be a number of MiB".to_string())?;
    Ok(SpawnFields {
        name,
        source,
        cpus: cpus.max(1),
        memory_mb,
    })
}

/// The fields every spawn form shares, around its source field.
pub(crate) fn spawn_form(source: Field, defaults: &SpawnDefaults, button: &'static str) -> Form {
    Form::new(vec![
        Field::text("name", "Name", ""),
        source,
        Field::text("cpus", "CPUs", defaults.cpus.to_string()),
        Field::text("memory", "Memory (MiB)", defaults.memory_mb.to_string()),
        Field::button("submit", button),
    ])
}
