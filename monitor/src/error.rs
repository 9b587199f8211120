//! Error types for checkbar.
//!
//! Each module defines its own error enum next to the code that raises it.
//! [`CheckbarError`] gathers them for callers that drive a whole session,
//! such as the binary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::content::ContentError;
use crate::settings::SettingsError;
use crate::view::RenderError;
use crate::watcher::WatcherError;

/// Errors that can occur while running checkbar.
///
/// # Examples
///
/// ```
/// use checkbar_monitor::error::{CheckbarError, Result};
/// use checkbar_monitor::settings::Settings;
///
/// fn load(path: &std::path::Path) -> Result<Settings> {
///     let settings = Settings::load(path)?;
///     settings.validate()?;
///     Ok(settings)
/// }
/// ```
#[derive(Error, Debug)]
pub enum CheckbarError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Settings could not be loaded, saved or validated.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Document text could not be read.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// A progress panel failed to render.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// File watching error.
    #[error("file watch error: {0}")]
    Watch(#[from] WatcherError),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for checkbar operations.
pub type Result<T> = std::result::Result<T, CheckbarError>;
