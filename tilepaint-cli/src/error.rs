//! CLI error type.

use std::fmt;

use tilepaint::logging::LoggingError;
use tilepaint::style::StyleError;
use tilepaint::ProviderError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Invalid arguments or configuration
    Config(String),
    /// Style sheet could not be loaded
    Style(StyleError),
    /// Font file could not be read or parsed
    Font(String),
    /// Provider construction failed
    Provider(ProviderError),
    /// Tile rendering or encoding failed
    Render(String),
    /// Output could not be written
    Io(std::io::Error),
    /// Logging could not be initialized
    Logging(LoggingError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Style(e) => write!(f, "Style error: {}", e),
            CliError::Font(msg) => write!(f, "Font error: {}", msg),
            CliError::Provider(e) => write!(f, "Provider error: {}", e),
            CliError::Render(msg) => write!(f, "Render failed: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
            CliError::Logging(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<StyleError> for CliError {
    fn from(e: StyleError) -> Self {
        CliError::Style(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
