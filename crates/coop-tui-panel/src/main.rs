use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use coop_tui_fwk::AppBuilder;
use coop_tui_panel::provider::demo::{DemoCatalog, DemoProvider};
use coop_tui_panel::provider::launcher::SystemLauncher;
use coop_tui_panel::provider::Services;
use coop_tui_panel::settings::{default_config_path, ConfigStore, TomlConfigStore};
use coop_tui_panel::{logging, Panel, Settings};

#[derive(Parser)]
#[command(name = "coop")]
#[command(about = "Terminal control panel for a small VM fleet")]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.config/coop/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the rolling log file
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Leave mouse events to the terminal
    #[arg(long)]
    no_mouse: bool,
}

/// Load settings. An explicit path must be readable; the default one may
/// be broken, in which case defaults are used.
fn load_settings(store: &TomlConfigStore, explicit: bool) -> anyhow::Result<Settings> {
    match store.load() {
        Ok(settings) => Ok(settings),
        Err(err) if explicit => {
            Err(err).with_context(|| format!("reading settings from {}", store.location()))
        }
        Err(err) => {
            tracing::warn!(path = %store.location(), error = %err, "ignoring unreadable settings");
            Ok(Settings::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logs = logging::init(cli.log_dir).context("setting up the log directory")?;
    tracing::info!(log_dir = %logs.log_dir().display(), "coop starting");

    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .or_else(default_config_path)
        .context("no home directory to keep settings in, pass --config")?;
    let store = TomlConfigStore::new(config_path);
    let settings = load_settings(&store, explicit)?;

    let services = Services {
        provider: Arc::new(DemoProvider::seeded().with_latency(Duration::from_millis(300))),
        catalog: Arc::new(DemoCatalog::new()),
        launcher: Arc::new(SystemLauncher),
        config: Arc::new(store),
    };
    let mouse = settings.ui.mouse && !cli.no_mouse;

    AppBuilder::new()
        .program(Panel::new(settings, services))
        .mouse_capture(mouse)
        .build()?
        .run()
        .await?;

    tracing::info!("coop finished");
    Ok(())
}
