//! Configuration from environment variables.
//!
//! Environment variables locate the settings file and override individual
//! timing settings. Overrides win over the values persisted in the file.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CHECKBAR_SETTINGS_PATH` | No | `<config dir>/checkbar/settings.json` | Settings file location |
//! | `CHECKBAR_DEBOUNCE_MS` | No | (settings) | Debounce delay for edits |
//! | `CHECKBAR_READING_DELAY_MS` | No | (settings) | Refresh delay in reading mode |
//! | `CHECKBAR_MAX_RETRIES` | No | (settings) | Staleness retries after a toggle (1-10) |
//!
//! # Example
//!
//! ```no_run
//! use checkbar_monitor::config::Config;
//! use checkbar_monitor::settings::Settings;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! let mut settings = Settings::load(&config.settings_path).expect("Failed to load settings");
//! config.apply_to(&mut settings);
//! ```

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

use crate::settings::{Settings, MAX_RETRIES, MIN_RETRIES};

/// Settings file name inside the config directory.
const SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine the user's config directory.
    #[error("failed to determine config directory")]
    NoConfigDirectory,
}

/// Configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where settings are loaded from and saved to.
    pub settings_path: PathBuf,

    /// Override for [`Settings::debounce_time_ms`].
    pub debounce_ms: Option<u64>,

    /// Override for [`Settings::reading_view_delay_ms`].
    pub reading_delay_ms: Option<u64>,

    /// Override for [`Settings::max_retries`]. Between 1 and 10.
    pub max_retries: Option<u32>,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - A numeric variable is set but cannot be parsed
    /// - `CHECKBAR_MAX_RETRIES` is outside 1-10
    /// - `CHECKBAR_SETTINGS_PATH` is unset and no config directory exists
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings_path = match env::var("CHECKBAR_SETTINGS_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_settings_path()?,
        };

        let debounce_ms = parse_millis("CHECKBAR_DEBOUNCE_MS")?;
        let reading_delay_ms = parse_millis("CHECKBAR_READING_DELAY_MS")?;

        let max_retries = match env::var("CHECKBAR_MAX_RETRIES") {
            Ok(val) => {
                let retries = val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                    key: "CHECKBAR_MAX_RETRIES".to_string(),
                    message: format!("expected integer 1-10, got '{val}'"),
                })?;
                if !(MIN_RETRIES..=MAX_RETRIES).contains(&retries) {
                    return Err(ConfigError::InvalidValue {
                        key: "CHECKBAR_MAX_RETRIES".to_string(),
                        message: format!(
                            "retries must be between {MIN_RETRIES} and {MAX_RETRIES}, got {retries}"
                        ),
                    });
                }
                Some(retries)
            }
            Err(_) => None,
        };

        Ok(Self {
            settings_path,
            debounce_ms,
            reading_delay_ms,
            max_retries,
        })
    }

    /// Writes the environment overrides into `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(ms) = self.debounce_ms {
            settings.debounce_time_ms = ms;
        }
        if let Some(ms) = self.reading_delay_ms {
            settings.reading_view_delay_ms = ms;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
    }
}

/// `<config dir>/checkbar/settings.json` for the current platform.
fn default_settings_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("", "", "checkbar").ok_or(ConfigError::NoConfigDirectory)?;
    Ok(dirs.config_dir().join(SETTINGS_FILE))
}

fn parse_millis(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected milliseconds, got '{val}'"),
            }),
        Err(_) => Ok(None),
    }
}
