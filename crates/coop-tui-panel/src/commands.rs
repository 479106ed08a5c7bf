//! The command boundary.
//!
//! Each function here wraps one collaborator call in a [`Command`]. Errors
//! never escape: every outcome, success or failure, comes back as a
//! [`Msg`] carrying the target it was issued for.

use std::path::PathBuf;

use coop_tui_fwk::{Command, Tag};
use futures::stream::{self, StreamExt};

use crate::error::PanelError;
use crate::message::{kind, prune_target, target, LaunchKind, Msg, OpKind};
use crate::provider::{DownloadEvent, ImageRef, Services, SpawnOptions, StopOptions, VmSummary};
use crate::settings::{LaunchSettings, Settings};

pub fn refresh_fleet(services: &Services) -> Command<Msg> {
    let provider = services.provider.clone();
    Command::tracked(Tag::new(kind::REFRESH, target::FLEET), async move {
        Msg::Fleet(provider.list().await)
    })
}

pub fn vm_info(services: &Services, name: &str) -> Command<Msg> {
    let provider = services.provider.clone();
    let name = name.to_string();
    Command::tracked(Tag::new(kind::INFO, name.as_str()), async move {
        let result = provider.info(&name).await;
        Msg::Info { name, result }
    })
}

/// Start, stop, force-stop or delete a VM.
pub fn vm_operation(services: &Services, op: OpKind, name: &str) -> Command<Msg> {
    let provider = services.provider.clone();
    let name = name.to_string();
    Command::tracked(op.tag(&name), async move {
        let result = match op {
            OpKind::Start => provider.start(&name).await,
            OpKind::Stop => provider.stop(&name, StopOptions { force: false }).await,
            OpKind::ForceStop => provider.stop(&name, StopOptions { force: true }).await,
            OpKind::Delete => provider.delete(&name).await,
            OpKind::Spawn => Err(PanelError::provider("spawn needs options")),
        };
        Msg::Operation {
            kind: op,
            name,
            result,
        }
    })
}

pub fn spawn(services: &Services, options: SpawnOptions) -> Command<Msg> {
    let provider = services.provider.clone();
    let name = options.name.clone();
    tracing::info!(%name, source = %options.source, "spawning");
    Command::tracked(OpKind::Spawn.tag(&name), async move {
        let result = provider.spawn(options).await.map(|_| ());
        Msg::Operation {
            kind: OpKind::Spawn,
            name,
            result,
        }
    })
}

/// Open `vm` in an external program chosen by the current `settings`.
pub fn launch(
    services: &Services,
    settings: &LaunchSettings,
    launch: LaunchKind,
    vm: VmSummary,
) -> Command<Msg> {
    let launcher = services.launcher.clone();
    let settings = settings.clone();
    let name = vm.name.clone();
    Command::perform(async move {
        let result = blocking(move || match launch {
            LaunchKind::Ssh => launcher.open_ssh(&vm, &settings),
            LaunchKind::Vnc => launcher.open_vnc(&vm, &settings),
        })
        .await;
        Msg::Launched {
            kind: launch,
            name,
            result,
        }
    })
}

pub fn load_images(services: &Services) -> Command<Msg> {
    let provider = services.provider.clone();
    Command::tracked(Tag::new(kind::REFRESH, target::IMAGES), async move {
        Msg::Images(provider.list_images().await)
    })
}

pub fn load_templates(services: &Services) -> Command<Msg> {
    let provider = services.provider.clone();
    Command::tracked(Tag::new(kind::REFRESH, target::TEMPLATES), async move {
        Msg::Templates(provider.list_templates().await)
    })
}

pub fn load_cache(services: &Services) -> Command<Msg> {
    let provider = services.provider.clone();
    Command::tracked(Tag::new(kind::REFRESH, target::CACHE), async move {
        let result = async {
            let entries = provider.cache_list().await?;
            let stats = provider.cache_info().await?;
            Ok::<_, PanelError>((entries, stats))
        };
        Msg::Cache(result.await)
    })
}

pub fn prune_cache(services: &Services, unused_only: bool) -> Command<Msg> {
    let provider = services.provider.clone();
    Command::tracked(
        Tag::new(kind::PRUNE, prune_target(unused_only)),
        async move {
            Msg::Pruned {
                unused_only,
                result: provider.cache_prune(unused_only).await,
            }
        },
    )
}

pub fn load_catalog(services: &Services, settings: &Settings) -> Command<Msg> {
    let catalog = services.catalog.clone();
    let dir = settings.image_dir();
    let ttl = settings.catalog_ttl();
    Command::tracked(Tag::new(kind::REFRESH, target::CATALOG), async move {
        Msg::Catalog(catalog.load_catalog(&dir, ttl).await)
    })
}

/// Resolve `"name version"` (version optional) to a downloadable image.
pub fn resolve_image(services: &Services, query: &str) -> Command<Msg> {
    let catalog = services.catalog.clone();
    let query = query.trim().to_string();
    Command::tracked(Tag::new(kind::FIND, query.as_str()), async move {
        let mut parts = query.split_whitespace();
        let name = parts.next().unwrap_or_default().to_string();
        let version = parts.next().unwrap_or_default().to_string();
        let result = catalog.find_image(&name, &version).await;
        Msg::ImageResolved { query, result }
    })
}

/// Download an image, reporting progress until a final message.
///
/// The stream always ends with exactly one [`Msg::DownloadFinished`], even
/// if the collaborator's stream stops early.
pub fn download(services: &Services, image: &ImageRef, dest: PathBuf) -> Command<Msg> {
    let id = image_id(image);
    tracing::info!(image = %id, url = %image.url, dest = %dest.display(), "downloading");
    let events = services.catalog.download(image, &dest);
    let messages = stream::unfold(Some(events), move |events| {
        let id = id.clone();
        async move {
            let mut events = events?;
            let message = match events.next().await {
                Some(DownloadEvent::Progress(fraction)) => {
                    return Some((
                        Msg::DownloadProgress {
                            image: id,
                            fraction: fraction.clamp(0.0, 1.0),
                        },
                        Some(events),
                    ));
                }
                Some(DownloadEvent::Finished(result)) => Msg::DownloadFinished { image: id, result },
                None => Msg::DownloadFinished {
                    image: id,
                    result: Err(PanelError::provider("download ended without a result")),
                },
            };
            Some((message, None))
        }
    });
    Command::stream(Tag::new(kind::DOWNLOAD, image_id(image)), messages)
}

/// Stable identity of a catalog image, `name-version`.
pub fn image_id(image: &ImageRef) -> String {
    format!("{}-{}", image.name, image.version)
}

pub fn save_settings(services: &Services, settings: Settings) -> Command<Msg> {
    let store = services.config.clone();
    Command::tracked(Tag::new(kind::SAVE_CONFIG, target::SETTINGS), async move {
        let to_save = settings.clone();
        let result = blocking(move || store.save(&to_save)).await;
        Msg::ConfigSaved {
            settings: Box::new(settings),
            result,
        }
    })
}

/// Run a synchronous collaborator call on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, PanelError>
where
    F: FnOnce() -> Result<T, PanelError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PanelError::Io(err.to_string()))?
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};
    use std::thread::{self, ThreadId};

    use super::*;
    use crate::provider::demo::{DemoCatalog, DemoProvider};
    use crate::provider::Launcher;
    use crate::settings::ConfigStore;

    /// Settings store keeping the last saved value in memory.
    #[derive(Default)]
    pub struct MemoryStore {
        pub saved: Mutex<Option<Settings>>,
        /// Thread the last save ran on.
        pub saved_on: Mutex<Option<ThreadId>>,
    }

    impl ConfigStore for MemoryStore {
        fn load(&self) -> Result<Settings, PanelError> {
            Ok(Settings::default())
        }

        fn save(&self, settings: &Settings) -> Result<(), PanelError> {
            if let Ok(mut saved) = self.saved.lock() {
                *saved = Some(settings.clone());
            }
            if let Ok(mut saved_on) = self.saved_on.lock() {
                *saved_on = Some(thread::current().id());
            }
            Ok(())
        }

        fn location(&self) -> String {
            "memory".to_string()
        }
    }

    /// Launcher that never finds anything, remembering the settings of
    /// each attempt.
    #[derive(Default)]
    pub struct NoLauncher {
        pub attempts: Mutex<Vec<LaunchSettings>>,
        pub threads: Mutex<Vec<ThreadId>>,
    }

    impl NoLauncher {
        fn record(&self, settings: &LaunchSettings) {
            if let Ok(mut attempts) = self.attempts.lock() {
                attempts.push(settings.clone());
            }
            if let Ok(mut threads) = self.threads.lock() {
                threads.push(thread::current().id());
            }
        }
    }

    impl Launcher for NoLauncher {
        fn open_ssh(&self, _vm: &VmSummary, settings: &LaunchSettings) -> Result<(), PanelError> {
            self.record(settings);
            Err(PanelError::ResourceUnavailable("no terminal emulator found".into()))
        }

        fn open_vnc(&self, _vm: &VmSummary, settings: &LaunchSettings) -> Result<(), PanelError> {
            self.record(settings);
            Err(PanelError::ResourceUnavailable("no VNC viewer found".into()))
        }
    }

    pub fn services() -> Services {
        Services {
            provider: Arc::new(DemoProvider::seeded()),
            catalog: Arc::new(DemoCatalog::new().with_step(std::time::Duration::ZERO)),
            launcher: Arc::new(NoLauncher::default()),
            config: Arc::new(MemoryStore::default()),
        }
    }

    /// Rows of a drawn buffer joined by newlines.
    pub fn buffer_text(buffer: &ratatui::buffer::Buffer) -> String {
        let width = usize::from(buffer.area.width).max(1);
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run every asynchronous part of `command`, collecting its messages.
    pub async fn run(command: Command<Msg>) -> Vec<Msg> {
        let mut out = Vec::new();
        let mut queue = vec![command];
        while let Some(command) = queue.pop() {
            match command {
                Command::None => {}
                Command::Message(msg) => out.push(msg),
                Command::Perform { future, .. } => out.push(future.await),
                Command::Stream { stream, .. } => out.extend(stream.collect::<Vec<_>>().await),
                Command::Batch(commands) => queue.extend(commands.into_iter().rev()),
            }
        }
        out
    }
}
