//! Structured logging initialization.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::error::{TelemetryError, TelemetryResult};

/// Logging configuration (`[logging]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Plain-text log file, appended to. `None` = console only.
    #[serde(default = "default_file")]
    pub file: Option<PathBuf>,
    /// JSON console output. Also forced by `RUST_ENV=production`.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info,sigbridge=debug".to_string()
}

fn default_file() -> Option<PathBuf> {
    Some(PathBuf::from("logs/trading.log"))
}

impl LoggingConfig {
    /// Configured file path; an empty path disables file logging.
    pub fn file_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_file(),
            json: false,
        }
    }
}

/// Open (creating parent directories) the log file in append mode.
pub fn open_log_file(path: &Path) -> TelemetryResult<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Initialize structured logging.
///
/// Console output is JSON in production and pretty in development. When a
/// log file is configured, every event is mirrored there without ANSI
/// colours.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log filter: {e}")))?;

    let is_production = std::env::var("RUST_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    let console = if is_production || config.json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed()
    } else {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(true)
            .boxed()
    };

    let file = match config.file_path() {
        Some(path) => {
            let writer = Mutex::new(open_log_file(path)?);
            Some(fmt::layer().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    Ok(())
}
