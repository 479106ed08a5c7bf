//! Settings loading, editing and persistence.
//!
//! Settings live in a TOML file, by default `~/.config/coop/config.toml`.
//! A missing or empty file means defaults; unknown keys are ignored and
//! missing keys take their default, so older files keep loading.
//!
//! ```toml
//! [ui]
//! tick_ms = 120
//! log_capacity = 500
//! mouse = true
//! theme = "default"
//!
//! [defaults]
//! cpus = 2
//! memory_mb = 2048
//! template = "debian-12"
//! ssh_user = "coop"
//!
//! [paths]
//! image_dir = "~/.cache/coop/images"
//! catalog_ttl_hours = 24
//!
//! [launch]
//! terminal = "alacritty -e"
//! vnc_viewer = "vncviewer"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PanelError;

const DEFAULT_TICK_MS: u64 = 120;
const MIN_TICK_MS: u64 = 16;
const DEFAULT_LOG_CAPACITY: usize = 500;
const DEFAULT_IMAGE_DIR: &str = "~/.cache/coop/images";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ui: UiSettings,
    pub defaults: SpawnDefaults,
    pub paths: PathSettings,
    pub launch: LaunchSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Spinner tick while operations are pending.
    pub tick_ms: u64,
    /// In-UI log lines kept before the oldest are dropped.
    pub log_capacity: usize,
    pub mouse: bool,
    /// `"default"` or `"mono"`.
    pub theme: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            log_capacity: DEFAULT_LOG_CAPACITY,
            mouse: true,
            theme: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnDefaults {
    pub cpus: u32,
    pub memory_mb: u32,
    pub template: String,
    pub ssh_user: String,
}

impl Default for SpawnDefaults {
    fn default() -> Self {
        Self {
            cpus: 2,
            memory_mb: 2048,
            template: String::new(),
            ssh_user: "coop".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub image_dir: String,
    pub catalog_ttl_hours: u64,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            catalog_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    /// Terminal command prefix, e.g. `"alacritty -e"`. Empty searches PATH.
    pub terminal: String,
    /// VNC viewer command. Empty searches PATH.
    pub vnc_viewer: String,
}

/// Every editable setting, as `(key, label)`.
pub const FIELDS: &[(&str, &str)] = &[
    ("ui.tick_ms", "Tick (ms)"),
    ("ui.log_capacity", "Log lines kept"),
    ("ui.mouse", "Mouse capture"),
    ("ui.theme", "Theme"),
    ("defaults.cpus", "CPUs"),
    ("defaults.memory_mb", "Memory (MiB)"),
    ("defaults.template", "Template"),
    ("defaults.ssh_user", "SSH user"),
    ("paths.image_dir", "Image directory"),
    ("paths.catalog_ttl_hours", "Catalog TTL (h)"),
    ("launch.terminal", "Terminal"),
    ("launch.vnc_viewer", "VNC viewer"),
];

impl Settings {
    /// Interval of the loading-indicator tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.ui.tick_ms.max(MIN_TICK_MS))
    }

    /// How long a downloaded catalog stays fresh.
    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.paths.catalog_ttl_hours.saturating_mul(3600))
    }

    /// Image directory with a leading `~` expanded.
    pub fn image_dir(&self) -> PathBuf {
        expand_home(&self.paths.image_dir)
    }

    /// Current value of a setting as text.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "ui.tick_ms" => self.ui.tick_ms.to_string(),
            "ui.log_capacity" => self.ui.log_capacity.to_string(),
            "ui.mouse" => self.ui.mouse.to_string(),
            "ui.theme" => self.ui.theme.clone(),
            "defaults.cpus" => self.defaults.cpus.to_string(),
            "defaults.memory_mb" => self.defaults.memory_mb.to_string(),
            "defaults.template" => self.defaults.template.clone(),
            "defaults.ssh_user" => self.defaults.ssh_user.clone(),
            "paths.image_dir" => self.paths.image_dir.clone(),
            "paths.catalog_ttl_hours" => self.paths.catalog_ttl_hours.to_string(),
            "launch.terminal" => self.launch.terminal.clone(),
            "launch.vnc_viewer" => self.launch.vnc_viewer.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Set a setting from text, validating numbers and booleans.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), PanelError> {
        let value = value.trim();
        match key {
            "ui.tick_ms" => self.ui.tick_ms = parse(key, value)?,
            "ui.log_capacity" => self.ui.log_capacity = parse::<usize>(key, value)?.max(1),
            "ui.mouse" => self.ui.mouse = parse_bool(key, value)?,
            "ui.theme" => match value {
                "default" | "mono" => self.ui.theme = value.to_string(),
                _ => return Err(invalid(key, value)),
            },
            "defaults.cpus" => self.defaults.cpus = parse::<u32>(key, value)?.max(1),
            "defaults.memory_mb" => self.defaults.memory_mb = parse::<u32>(key, value)?.max(64),
            "defaults.template" => self.defaults.template = value.to_string(),
            "defaults.ssh_user" => self.defaults.ssh_user = value.to_string(),
            "paths.image_dir" => self.paths.image_dir = value.to_string(),
            "paths.catalog_ttl_hours" => self.paths.catalog_ttl_hours = parse(key, value)?,
            "launch.terminal" => self.launch.terminal = value.to_string(),
            "launch.vnc_viewer" => self.launch.vnc_viewer = value.to_string(),
            _ => return Err(PanelError::Config(format!("unknown setting {key}"))),
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, PanelError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, PanelError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> PanelError {
    PanelError::Config(format!("invalid value {value:?} for {key}"))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Default settings file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("coop").join("config.toml"))
}

/// Persistence collaborator for settings.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Settings, PanelError>;
    fn save(&self, settings: &Settings) -> Result<(), PanelError>;
    /// Human-readable location, for log lines.
    fn location(&self) -> String;
}

/// Settings stored as a TOML file.
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<Settings, PanelError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(toml::from_str(&contents)?)
    }

    fn save(&self, settings: &Settings) -> Result<(), PanelError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(settings)?;
        fs::write(&self.path, contents)?;
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
