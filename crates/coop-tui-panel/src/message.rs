//! Messages flowing through the dispatcher.
//!
//! Every backend result carries the identity of the operation that produced
//! it: [`Msg::completes`] names the tracked tag it settles and the payloads
//! carry target names, so receivers can drop results that no longer match
//! what they show.

use std::path::PathBuf;

use coop_tui_fwk::Tag;

use crate::error::PanelError;
use crate::provider::{CacheEntry, CacheStats, Catalog, ImageRef, PruneReport, VmDetail, VmSummary};
use crate::settings::Settings;

/// Tag kinds that are not VM operations.
pub mod kind {
    pub const REFRESH: &str = "refresh";
    pub const INFO: &str = "info";
    pub const FIND: &str = "find";
    pub const DOWNLOAD: &str = "download";
    pub const PRUNE: &str = "prune";
    pub const SAVE_CONFIG: &str = "save-config";
}

/// Refresh targets.
pub mod target {
    pub const FLEET: &str = "fleet";
    pub const IMAGES: &str = "images";
    pub const TEMPLATES: &str = "templates";
    pub const CACHE: &str = "cache";
    pub const CATALOG: &str = "catalog";
    pub const SETTINGS: &str = "settings";
}

/// Operations that change a single VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Spawn,
    Start,
    Stop,
    ForceStop,
    Delete,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Spawn => "spawn",
            OpKind::Start => "start",
            OpKind::Stop => "stop",
            OpKind::ForceStop => "force-stop",
            OpKind::Delete => "delete",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            OpKind::Spawn => "spawned",
            OpKind::Start => "started",
            OpKind::Stop => "stopped",
            OpKind::ForceStop => "force-stopped",
            OpKind::Delete => "deleted",
        }
    }

    pub fn tag(self, name: &str) -> Tag {
        Tag::new(self.as_str(), name)
    }
}

/// External program opened for a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    Ssh,
    Vnc,
}

impl LaunchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LaunchKind::Ssh => "ssh",
            LaunchKind::Vnc => "vnc",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Msg {
    /// Loading-indicator animation step.
    Tick,
    /// Operator asked every tab to reload.
    Refresh,
    /// Free-form line for the log buffer.
    Log(String),

    Fleet(Result<Vec<VmSummary>, PanelError>),
    Info {
        name: String,
        result: Result<VmDetail, PanelError>,
    },
    Operation {
        kind: OpKind,
        name: String,
        result: Result<(), PanelError>,
    },
    Launched {
        kind: LaunchKind,
        name: String,
        result: Result<(), PanelError>,
    },

    Images(Result<Vec<String>, PanelError>),
    Templates(Result<Vec<String>, PanelError>),
    Cache(Result<(Vec<CacheEntry>, CacheStats), PanelError>),
    Pruned {
        unused_only: bool,
        result: Result<PruneReport, PanelError>,
    },

    Catalog(Result<Catalog, PanelError>),
    /// `query` is the `"name version"` string the lookup was issued for.
    ImageResolved {
        query: String,
        result: Result<ImageRef, PanelError>,
    },
    DownloadProgress {
        image: String,
        fraction: f32,
    },
    DownloadFinished {
        image: String,
        result: Result<PathBuf, PanelError>,
    },

    ConfigSaved {
        settings: Box<Settings>,
        result: Result<(), PanelError>,
    },
}

pub fn prune_target(unused_only: bool) -> &'static str {
    if unused_only {
        "unused"
    } else {
        "all"
    }
}

impl Msg {
    /// The tracked operation this message completes, if any.
    ///
    /// Progress messages complete nothing; only the final download message
    /// settles the download.
    pub fn completes(&self) -> Option<Tag> {
        let tag = match self {
            Msg::Fleet(_) => Tag::new(kind::REFRESH, target::FLEET),
            Msg::Images(_) => Tag::new(kind::REFRESH, target::IMAGES),
            Msg::Templates(_) => Tag::new(kind::REFRESH, target::TEMPLATES),
            Msg::Cache(_) => Tag::new(kind::REFRESH, target::CACHE),
            Msg::Catalog(_) => Tag::new(kind::REFRESH, target::CATALOG),
            Msg::Info { name, .. } => Tag::new(kind::INFO, name.as_str()),
            Msg::Operation { kind, name, .. } => kind.tag(name),
            Msg::Pruned { unused_only, .. } => Tag::new(kind::PRUNE, prune_target(*unused_only)),
            Msg::ImageResolved { query, .. } => Tag::new(kind::FIND, query.as_str()),
            Msg::DownloadFinished { image, .. } => Tag::new(kind::DOWNLOAD, image.as_str()),
            Msg::ConfigSaved { .. } => Tag::new(kind::SAVE_CONFIG, target::SETTINGS),
            Msg::Tick
            | Msg::Refresh
            | Msg::Log(_)
            | Msg::Launched { .. }
            | Msg::DownloadProgress { .. } => return None,
        };
        Some(tag)
    }

    /// Line to append to the operator log, if this message warrants one.
    ///
    /// Failures always produce a line. Routine reloads succeed silently.
    pub fn log_line(&self) -> Option<String> {
        match self {
            Msg::Log(text) => Some(text.clone()),
            Msg::Fleet(Err(err)) => Some(format!("listing VMs failed: {err}")),
            Msg::Info {
                result: Err(err), ..
            } => Some(err.to_string()),
            Msg::Operation { kind, name, result } => Some(match result {
                Ok(()) => format!("{} {name}", kind.past_tense()),
                Err(err) => format!("{} {name} failed: {err}", kind.as_str()),
            }),
            Msg::Launched { kind, name, result } => Some(match result {
                Ok(()) => format!("opened {} for {name}", kind.as_str()),
                Err(err) => format!("{} {name}: {err}", kind.as_str()),
            }),
            Msg::Images(Err(err)) => Some(format!("listing images failed: {err}")),
            Msg::Templates(Err(err)) => Some(format!("listing templates failed: {err}")),
            Msg::Cache(Err(err)) => Some(format!("reading image cache failed: {err}")),
            Msg::Catalog(Err(err)) => Some(format!("loading catalog failed: {err}")),
            Msg::Pruned {
                result: Ok(report),
                unused_only,
            } => Some(format!(
                "pruned {} {} image(s), freed {}",
                report.removed,
                prune_target(*unused_only),
                human_bytes(report.freed_bytes)
            )),
            Msg::Pruned {
                result: Err(err), ..
            } => Some(format!("prune failed: {err}")),
            Msg::ImageResolved {
                query,
                result: Err(err),
            } => Some(format!("cannot resolve {query}: {err}")),
            Msg::DownloadFinished { image, result } => Some(match result {
                Ok(path) => format!("downloaded {image} to {}", path.display()),
                Err(err) => format!("download of {image} failed: {err}"),
            }),
            Msg::ConfigSaved { result, .. } => Some(match result {
                Ok(()) => "settings saved".to_string(),
                Err(err) => format!("saving settings failed: {err}"),
            }),
            _ => None,
        }
    }
}

/// Format a byte count with a binary unit.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_completes_nothing() {
        let progress = Msg::DownloadProgress {
            image: "debian-12".into(),
            fraction: 0.5,
        };
        assert_eq!(progress.completes(), None);
        assert_eq!(progress.log_line(), None);

        let done = Msg::DownloadFinished {
            image: "debian-12".into(),
            result: Ok(PathBuf::from("/img/debian-12.qcow2")),
        };
        assert_eq!(done.completes(), Some(Tag::new("download", "debian-12")));
    }

    #[test]
    fn test_operation_identity() {
        let msg = Msg::Operation {
            kind: OpKind::ForceStop,
            name: "web-1".into(),
            result: Err(PanelError::provider("boom")),
        };
        assert_eq!(msg.completes(), Some(Tag::new("force-stop", "web-1")));
        assert_eq!(
            msg.log_line().as_deref(),
            Some("force-stop web-1 failed: provider error: boom")
        );
    }

    #[test]
    fn test_successful_reload_is_silent() {
        assert_eq!(Msg::Fleet(Ok(Vec::new())).log_line(), None);
        assert!(Msg::Fleet(Err(PanelError::provider("x"))).log_line().is_some());
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(48 << 20), "48.0 MiB");
        assert_eq!(human_bytes(3 << 30), "3.0 GiB");
    }
}
