//! Collaborator boundary.
//!
//! The panel never implements VM policy itself. It talks to a
//! [`VmProvider`], an [`ImageCatalog`] and a [`Launcher`] through these
//! traits; [`demo`] ships in-memory implementations so the binary runs
//! standalone, and [`launcher`] opens external terminals and viewers.

pub mod demo;
pub mod launcher;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures::stream::BoxStream;

use crate::error::PanelError;
use crate::settings::{ConfigStore, LaunchSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Fleet
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Starting,
    Stopping,
    Stopped,
    Failed,
}

impl VmState {
    pub fn as_str(self) -> &'static str {
        match self {
            VmState::Running => "running",
            VmState::Starting => "starting",
            VmState::Stopping => "stopping",
            VmState::Stopped => "stopped",
            VmState::Failed => "failed",
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, VmState::Running | VmState::Starting)
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the fleet listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSummary {
    pub name: String,
    pub state: VmState,
    pub pid: Option<u32>,
    pub ssh_port: Option<u16>,
    pub vnc_port: Option<u16>,
    pub ssh_user: String,
}

/// Detail record returned by an info lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmDetail {
    pub summary: VmSummary,
    pub cpus: u32,
    pub memory_mb: u32,
    pub image: String,
    pub started_at: Option<DateTime<Local>>,
}

/// Where a new VM boots from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnSource {
    Template(String),
    Image(PathBuf),
}

impl fmt::Display for SpawnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnSource::Template(name) => write!(f, "template {name}"),
            SpawnSource::Image(path) => write!(f, "image {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnOptions {
    pub name: String,
    pub source: SpawnSource,
    pub cpus: u32,
    pub memory_mb: u32,
    pub ssh_user: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopOptions {
    pub force: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Image cache
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub size_bytes: u64,
    pub in_use: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
    pub unused_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: usize,
    pub freed_bytes: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub version: String,
    pub url: String,
    pub size_bytes: u64,
}

impl ImageRef {
    /// File name the download is stored under.
    pub fn file_name(&self) -> String {
        format!("{}-{}.qcow2", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub images: Vec<ImageRef>,
    pub fetched_at: DateTime<Local>,
}

/// One step of a download.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Fraction done, in `0.0..=1.0`.
    Progress(f32),
    /// Terminal event, always last.
    Finished(Result<PathBuf, PanelError>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait VmProvider: Send + Sync {
    async fn list(&self) -> Result<Vec<VmSummary>, PanelError>;

    /// Fails with [`PanelError::NotFound`] when the VM is gone.
    async fn info(&self, name: &str) -> Result<VmDetail, PanelError>;

    async fn spawn(&self, options: SpawnOptions) -> Result<VmSummary, PanelError>;
    async fn start(&self, name: &str) -> Result<(), PanelError>;
    async fn stop(&self, name: &str, options: StopOptions) -> Result<(), PanelError>;
    async fn delete(&self, name: &str) -> Result<(), PanelError>;

    /// Locally available base images.
    async fn list_images(&self) -> Result<Vec<String>, PanelError>;
    async fn list_templates(&self) -> Result<Vec<String>, PanelError>;

    async fn cache_list(&self) -> Result<Vec<CacheEntry>, PanelError>;
    async fn cache_info(&self) -> Result<CacheStats, PanelError>;
    async fn cache_prune(&self, unused_only: bool) -> Result<PruneReport, PanelError>;
}

#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Load the catalog, reusing a copy in `dir` younger than `ttl`.
    async fn load_catalog(&self, dir: &Path, ttl: Duration) -> Result<Catalog, PanelError>;

    /// Resolve an image; an empty `version` picks the newest.
    async fn find_image(&self, name: &str, version: &str) -> Result<ImageRef, PanelError>;

    /// Download `image` into `dest`. The stream ends after
    /// [`DownloadEvent::Finished`].
    fn download(&self, image: &ImageRef, dest: &Path) -> BoxStream<'static, DownloadEvent>;
}

/// Opens external programs attached to a VM.
pub trait Launcher: Send + Sync {
    /// Fails with [`PanelError::ResourceUnavailable`] when no terminal exists.
    fn open_ssh(&self, vm: &VmSummary, settings: &LaunchSettings) -> Result<(), PanelError>;

    /// Fails with [`PanelError::ResourceUnavailable`] when no viewer exists.
    fn open_vnc(&self, vm: &VmSummary, settings: &LaunchSettings) -> Result<(), PanelError>;
}

/// All collaborators, shared with command workers.
#[derive(Clone)]
pub struct Services {
    pub provider: Arc<dyn VmProvider>,
    pub catalog: Arc<dyn ImageCatalog>,
    pub launcher: Arc<dyn Launcher>,
    pub config: Arc<dyn ConfigStore>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config.location())
            .finish_non_exhaustive()
    }
}
