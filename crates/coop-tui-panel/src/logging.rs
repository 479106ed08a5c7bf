use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive; drop it last.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Default log directory, falling back to the temp dir.
pub fn default_log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map(|dir| dir.join("coop").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("coop").join("logs"))
}

/// Route `tracing` output to a daily rolling file.
///
/// The terminal belongs to the UI, so nothing is written to stdout or
/// stderr. `RUST_LOG` overrides the default `coop=info` filter.
pub fn init(log_dir: Option<PathBuf>) -> io::Result<LoggingGuard> {
    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "coop.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coop=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|err| io::Error::other(err.to_string()))?;

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");

    Ok(LoggingGuard {
        _guard: guard,
        log_dir,
    })
}
