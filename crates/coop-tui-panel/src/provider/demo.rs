//! In-memory provider and catalog for demos and tests.
//!
//! State lives behind a `std::sync::Mutex`; no lock is held across an
//! `.await`. An optional latency makes operations visibly asynchronous.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use futures::stream::{self, BoxStream, StreamExt};

use super::{
    CacheEntry, CacheStats, Catalog, DownloadEvent, ImageCatalog, ImageRef, PruneReport,
    SpawnOptions, SpawnSource, StopOptions, VmDetail, VmProvider, VmState, VmSummary,
};
use crate::error::PanelError;

const FIRST_SSH_PORT: u16 = 2222;
const FIRST_VNC_PORT: u16 = 5900;
const DOWNLOAD_STEPS: u32 = 10;

#[derive(Debug, Clone)]
struct DemoVm {
    detail: VmDetail,
}

#[derive(Debug)]
struct Fleet {
    vms: Vec<DemoVm>,
    cache: Vec<CacheEntry>,
    next_pid: u32,
    next_port: u16,
}

impl Fleet {
    fn find(&mut self, name: &str) -> Result<&mut VmDetail, PanelError> {
        self.vms
            .iter_mut()
            .map(|vm| &mut vm.detail)
            .find(|detail| detail.summary.name == name)
            .ok_or_else(|| PanelError::NotFound(name.to_string()))
    }

    fn boot(&mut self, name: &str) -> Result<(), PanelError> {
        let pid = self.next_pid;
        let port = self.next_port;
        let detail = self.find(name)?;
        if detail.summary.state.is_running() {
            return Err(PanelError::provider(format!("{name} is already running")));
        }
        detail.summary.state = VmState::Running;
        detail.summary.pid = Some(pid);
        detail.summary.ssh_port = Some(FIRST_SSH_PORT + port);
        detail.summary.vnc_port = Some(FIRST_VNC_PORT + port);
        detail.started_at = Some(Local::now());
        self.next_pid += 1;
        self.next_port += 1;
        Ok(())
    }

    fn refresh_cache_usage(&mut self) {
        for entry in &mut self.cache {
            entry.in_use = self.vms.iter().any(|vm| vm.detail.image == entry.name);
        }
    }
}

/// In-memory [`VmProvider`].
#[derive(Debug)]
pub struct DemoProvider {
    fleet: Mutex<Fleet>,
    templates: Vec<String>,
    latency: Duration,
}

impl DemoProvider {
    /// Empty fleet without latency.
    pub fn new() -> Self {
        Self {
            fleet: Mutex::new(Fleet {
                vms: Vec::new(),
                cache: Vec::new(),
                next_pid: 4100,
                next_port: 0,
            }),
            templates: vec![
                "alpine-3.20".to_string(),
                "debian-12".to_string(),
                "ubuntu-24.04".to_string(),
            ],
            latency: Duration::ZERO,
        }
    }

    /// A small fleet with one running and one stopped VM.
    pub fn seeded() -> Self {
        let provider = Self::new();
        if let Ok(mut fleet) = provider.fleet.lock() {
            fleet.cache = vec![
                CacheEntry {
                    name: "debian-12".to_string(),
                    size_bytes: 412 << 20,
                    in_use: false,
                },
                CacheEntry {
                    name: "ubuntu-24.04".to_string(),
                    size_bytes: 598 << 20,
                    in_use: false,
                },
                CacheEntry {
                    name: "alpine-3.20".to_string(),
                    size_bytes: 48 << 20,
                    in_use: false,
                },
            ];
            fleet.vms.push(demo_vm("web-1", "debian-12", 2, 2048));
            fleet.vms.push(demo_vm("db-1", "ubuntu-24.04", 4, 4096));
            let _ = fleet.boot("web-1");
            fleet.refresh_cache_usage();
        }
        provider
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn fleet(&self) -> Result<MutexGuard<'_, Fleet>, PanelError> {
        self.fleet
            .lock()
            .map_err(|_| PanelError::provider("demo state poisoned"))
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_vm(name: &str, image: &str, cpus: u32, memory_mb: u32) -> DemoVm {
    DemoVm {
        detail: VmDetail {
            summary: VmSummary {
                name: name.to_string(),
                state: VmState::Stopped,
                pid: None,
                ssh_port: None,
                vnc_port: None,
                ssh_user: "coop".to_string(),
            },
            cpus,
            memory_mb,
            image: image.to_string(),
            started_at: None,
        },
    }
}

#[async_trait]
impl VmProvider for DemoProvider {
    async fn list(&self) -> Result<Vec<VmSummary>, PanelError> {
        self.delay().await;
        let fleet = self.fleet()?;
        Ok(fleet.vms.iter().map(|vm| vm.detail.summary.clone()).collect())
    }

    async fn info(&self, name: &str) -> Result<VmDetail, PanelError> {
        self.delay().await;
        let mut fleet = self.fleet()?;
        fleet.find(name).map(|detail| detail.clone())
    }

    async fn spawn(&self, options: SpawnOptions) -> Result<VmSummary, PanelError> {
        self.delay().await;
        let name = options.name.trim();
        if name.is_empty() {
            return Err(PanelError::provider("a VM needs a name"));
        }
        let image = match &options.source {
            SpawnSource::Template(template) => {
                if !self.templates.contains(template) {
                    return Err(PanelError::NotFound(format!("template {template}")));
                }
                template.clone()
            }
            SpawnSource::Image(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        };

        let mut fleet = self.fleet()?;
        if fleet.vms.iter().any(|vm| vm.detail.summary.name == name) {
            return Err(PanelError::provider(format!("{name} already exists")));
        }
        let mut vm = demo_vm(name, &image, options.cpus, options.memory_mb);
        vm.detail.summary.ssh_user = options.ssh_user;
        fleet.vms.push(vm);
        fleet.boot(name)?;
        fleet.refresh_cache_usage();
        fleet.find(name).map(|detail| detail.summary.clone())
    }

    async fn start(&self, name: &str) -> Result<(), PanelError> {
        self.delay().await;
        self.fleet()?.boot(name)
    }

    async fn stop(&self, name: &str, options: StopOptions) -> Result<(), PanelError> {
        self.delay().await;
        let mut fleet = self.fleet()?;
        let detail = fleet.find(name)?;
        match detail.summary.state {
            VmState::Stopped => Err(PanelError::provider(format!("{name} is not running"))),
            VmState::Stopping | VmState::Failed if !options.force => Err(PanelError::provider(
                format!("{name} is {}; use force-stop", detail.summary.state),
            )),
            _ => {
                detail.summary.state = VmState::Stopped;
                detail.summary.pid = None;
                detail.summary.ssh_port = None;
                detail.summary.vnc_port = None;
                detail.started_at = None;
                Ok(())
            }
        }
    }

    async fn delete(&self, name: &str) -> Result<(), PanelError> {
        self.delay().await;
        let mut fleet = self.fleet()?;
        if fleet.find(name)?.summary.state.is_running() {
            return Err(PanelError::provider(format!("stop {name} before deleting it")));
        }
        fleet.vms.retain(|vm| vm.detail.summary.name != name);
        fleet.refresh_cache_usage();
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<String>, PanelError> {
        self.delay().await;
        let fleet = self.fleet()?;
        Ok(fleet.cache.iter().map(|entry| entry.name.clone()).collect())
    }

    async fn list_templates(&self) -> Result<Vec<String>, PanelError> {
        self.delay().await;
        Ok(self.templates.clone())
    }

    async fn cache_list(&self) -> Result<Vec<CacheEntry>, PanelError> {
        self.delay().await;
        Ok(self.fleet()?.cache.clone())
    }

    async fn cache_info(&self) -> Result<CacheStats, PanelError> {
        self.delay().await;
        let fleet = self.fleet()?;
        Ok(CacheStats {
            entries: fleet.cache.len(),
            total_bytes: fleet.cache.iter().map(|e| e.size_bytes).sum(),
            unused_bytes: fleet
                .cache
                .iter()
                .filter(|e| !e.in_use)
                .map(|e| e.size_bytes)
                .sum(),
        })
    }

    async fn cache_prune(&self, unused_only: bool) -> Result<PruneReport, PanelError> {
        self.delay().await;
        let mut fleet = self.fleet()?;
        let mut report = PruneReport::default();
        fleet.cache.retain(|entry| {
            if unused_only && entry.in_use {
                return true;
            }
            report.removed += 1;
            report.freed_bytes += entry.size_bytes;
            false
        });
        Ok(report)
    }
}

/// In-memory [`ImageCatalog`] whose downloads only simulate progress.
#[derive(Debug, Clone)]
pub struct DemoCatalog {
    images: Vec<ImageRef>,
    step: Duration,
}

impl DemoCatalog {
    pub fn new() -> Self {
        let image = |name: &str, version: &str, size_mb: u64| ImageRef {
            name: name.to_string(),
            version: version.to_string(),
            url: format!("https://images.example.org/{name}/{version}/{name}-{version}.qcow2"),
            size_bytes: size_mb << 20,
        };
        Self {
            images: vec![
                image("alpine", "3.19", 46),
                image("alpine", "3.20", 48),
                image("debian", "12", 412),
                image("fedora", "40", 530),
                image("ubuntu", "22.04", 570),
                image("ubuntu", "24.04", 598),
            ],
            step: Duration::from_millis(150),
        }
    }

    /// Delay between progress events.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }
}

impl Default for DemoCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageCatalog for DemoCatalog {
    async fn load_catalog(&self, dir: &Path, ttl: Duration) -> Result<Catalog, PanelError> {
        tracing::debug!(dir = %dir.display(), ttl_secs = ttl.as_secs(), "loading demo catalog");
        Ok(Catalog {
            images: self.images.clone(),
            fetched_at: Local::now(),
        })
    }

    async fn find_image(&self, name: &str, version: &str) -> Result<ImageRef, PanelError> {
        let mut matches = self.images.iter().filter(|image| image.name == name);
        let found = if version.is_empty() {
            matches.last()
        } else {
            matches.find(|image| image.version == version)
        };
        match found {
            Some(image) => Ok(image.clone()),
            None if version.is_empty() => Err(PanelError::NotFound(format!("image {name}"))),
            None => Err(PanelError::NotFound(format!("image {name} {version}"))),
        }
    }

    fn download(&self, image: &ImageRef, dest: &Path) -> BoxStream<'static, DownloadEvent> {
        let target: PathBuf = dest.join(image.file_name());
        let step = self.step;
        stream::unfold(0u32, move |n| {
            let target = target.clone();
            async move {
                if n > DOWNLOAD_STEPS + 1 {
                    return None;
                }
                if n > 0 && !step.is_zero() {
                    tokio::time::sleep(step).await;
                }
                let event = if n <= DOWNLOAD_STEPS {
                    DownloadEvent::Progress(n as f32 / DOWNLOAD_STEPS as f32)
                } else {
                    DownloadEvent::Finished(Ok(target))
                };
                Some((event, n + 1))
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_options(name: &str) -> SpawnOptions {
        SpawnOptions {
            name: name.to_string(),
            source: SpawnSource::Template("debian-12".to_string()),
            cpus: 1,
            memory_mb: 512,
            ssh_user: "ops".to_string(),
        }
    }

    #[tokio::test]
    async fn test_seeded_fleet() {
        let provider = DemoProvider::seeded();
        let vms = provider.list().await.expect("list");
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].state, VmState::Running);
        assert!(vms[0].ssh_port.is_some());
        assert_eq!(vms[1].state, VmState::Stopped);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let provider = DemoProvider::new();
        let vm = provider.spawn(spawn_options("alpha")).await.expect("spawn");
        assert_eq!(vm.state, VmState::Running);
        assert_eq!(vm.ssh_user, "ops");

        assert!(provider.start("alpha").await.is_err());
        provider.stop("alpha", StopOptions::default()).await.expect("stop");
        assert!(provider.stop("alpha", StopOptions::default()).await.is_err());
        provider.delete("alpha").await.expect("delete");

        let err = provider.info("alpha").await.expect_err("gone");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_spawn_rejects_duplicates_and_unknown_templates() {
        let provider = DemoProvider::new();
        provider.spawn(spawn_options("alpha")).await.expect("spawn");
        assert!(provider.spawn(spawn_options("alpha")).await.is_err());

        let mut options = spawn_options("beta");
        options.source = SpawnSource::Template("plan9".to_string());
        assert!(provider.spawn(options).await.expect_err("unknown").is_not_found());
    }

    #[tokio::test]
    async fn test_prune_unused_keeps_images_in_use() {
        let provider = DemoProvider::seeded();
        let stats = provider.cache_info().await.expect("info");
        assert_eq!(stats.entries, 3);

        let report = provider.cache_prune(true).await.expect("prune");
        assert_eq!(report.removed, 1);
        let names: Vec<_> = provider
            .cache_list()
            .await
            .expect("list")
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["debian-12", "ubuntu-24.04"]);

        let report = provider.cache_prune(false).await.expect("prune");
        assert_eq!(report.removed, 2);
    }

    #[tokio::test]
    async fn test_find_image_picks_newest() {
        let catalog = DemoCatalog::new();
        assert_eq!(catalog.find_image("ubuntu", "").await.expect("find").version, "24.04");
        assert_eq!(catalog.find_image("ubuntu", "22.04").await.expect("find").version, "22.04");
        assert!(catalog.find_image("ubuntu", "6.06").await.is_err());
    }

    #[tokio::test]
    async fn test_download_ends_with_finished() {
        let catalog = DemoCatalog::new().with_step(Duration::ZERO);
        let image = catalog.find_image("alpine", "").await.expect("find");
        let events: Vec<_> = catalog.download(&image, Path::new("/tmp/img")).collect().await;
        assert_eq!(events.len(), DOWNLOAD_STEPS as usize + 2);
        assert_eq!(events[0], DownloadEvent::Progress(0.0));
        assert_eq!(
            events.last(),
            Some(&DownloadEvent::Finished(Ok(PathBuf::from(
                "/tmp/img/alpine-3.20.qcow2"
            ))))
        );
    }
}
