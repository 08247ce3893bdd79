//! Tracing subscriber setup.
//!
//! Library code only emits `tracing` events; binaries call [`init_logging`]
//! once at startup and keep the returned guard alive until exit so buffered
//! file output is flushed.
//!
//! # Example
//!
//! ```ignore
//! let _guard = init_logging(LogConfig::default().with_directory("logs"))?;
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "tilepaint=info";

/// Default log file name inside the log directory.
pub const DEFAULT_LOG_FILE: &str = "tilepaint.log";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub directive: String,

    /// Directory for the log file; console only when `None`.
    pub directory: Option<PathBuf>,

    /// Log file name.
    pub file_name: String,

    /// Use ANSI colors on the console.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directive: DEFAULT_DIRECTIVE.to_string(),
            directory: None,
            file_name: DEFAULT_LOG_FILE.to_string(),
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Builds the filter, preferring `RUST_LOG` over the configured directive.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder().parse_lossy(&self.directive)
        })
    }
}

/// Keeps background log writers alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

/// Error returned when a global subscriber is already installed.
#[derive(Debug, thiserror::Error)]
#[error("Failed to install tracing subscriber: {0}")]
pub struct LoggingError(String);

/// Installs the global tracing subscriber.
///
/// Console output goes to stderr. With a directory configured, events are
/// also written through a non-blocking appender to `directory/file_name`.
pub fn init_logging(config: LogConfig) -> Result<LoggingGuard, LoggingError> {
    let (file_layer, file_guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(true);

    #[cfg(feature = "profiling")]
    let (chrome_layer, chrome_guard) = tracing_chrome::ChromeLayerBuilder::new().build();

    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(console_layer)
        .with(file_layer);

    #[cfg(feature = "profiling")]
    let registry = registry.with(chrome_layer);

    registry
        .try_init()
        .map_err(|e| LoggingError(e.to_string()))?;

    Ok(LoggingGuard {
        _file: file_guard,
        #[cfg(feature = "profiling")]
        _chrome: chrome_guard,
    })
}
