//! Console and rolling-file log output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{parse_env_u64, ConfigError};

/// Log file used when `LOG_FILE` is unset.
pub const DEFAULT_LOG_FILE: &str = "webzAPI.log";

/// Rotated log files kept when `LOG_MAX_FILES` is unset.
pub const DEFAULT_MAX_LOG_FILES: usize = 5;

/// Logging options, read from the environment before the rest of the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// JSON lines on the console instead of the pretty formatter.
    pub json: bool,
    /// Drops the crate's debug output from the default filter.
    pub production: bool,
    /// Rolling log file, or `None` for console only.
    pub file: Option<PathBuf>,
    pub max_files: usize,
}

impl LogSettings {
    /// Read `LOG_FORMAT`, `APP_ENV`, `LOG_FILE` and `LOG_MAX_FILES`.
    ///
    /// An empty `LOG_FILE` turns the file sink off.
    ///
    /// # Errors
    ///
    /// Returns an error if `LOG_MAX_FILES` is not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let json = std::env::var("LOG_FORMAT")
            .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
            .unwrap_or(false);
        let production = std::env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let file = match std::env::var("LOG_FILE") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };
        let max_files = parse_env_u64("LOG_MAX_FILES", DEFAULT_MAX_LOG_FILES as u64)?;

        Ok(Self {
            json,
            production,
            file,
            max_files: usize::try_from(max_files).unwrap_or(usize::MAX),
        })
    }
}

/// Filter directives used when `RUST_LOG` is unset.
#[must_use]
pub fn default_directives(production: bool) -> &'static str {
    if production {
        "info"
    } else {
        "info,webz_fetcher=debug"
    }
}

/// Open a daily-rolling appender at `path` behind a background writer thread.
///
/// Missing parent directories are created. The guard must be held for as long
/// as lines should reach the file; dropping it flushes what is buffered.
///
/// # Errors
///
/// Returns an error if `path` has no file name or the file cannot be opened.
pub fn file_writer(path: &Path, max_files: usize) -> Result<(NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(max_files.max(1))
        .build(dir)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when a log file is configured; keep it
/// alive until the program exits.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(settings.production)));

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let (writer, guard) = file_writer(path, settings.max_files)?;
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(guard)
}
