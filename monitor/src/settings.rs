//! Persisted user settings.
//!
//! Settings are stored as pretty-printed JSON with camelCase keys. A missing
//! file yields [`Settings::default`]; unknown keys are ignored and missing
//! keys take their default, so older files keep loading.
//!
//! # File Format
//!
//! ```json
//! {
//!   "barColor": "#4caf50",
//!   "barHeight": 1,
//!   "showTaskCount": true,
//!   "showPercentage": true,
//!   "debounceTimeMs": 300,
//!   "readingViewDelayMs": 1000,
//!   "colorThresholds": {
//!     "lowThreshold": 30,
//!     "mediumThreshold": 70,
//!     "lowColor": "#e53935",
//!     "mediumColor": "#fb8c00",
//!     "highColor": "#43a047",
//!     "completeColor": "#1e88e5"
//!   }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::trackers::DEFAULT_CHANGE_TTL_MS;
use crate::utils::DEFAULT_DEBOUNCE_MS;

/// Default bar colour.
pub const DEFAULT_BAR_COLOR: &str = "#4caf50";

/// Default delay before refreshing in reading mode.
pub const DEFAULT_READING_VIEW_DELAY_MS: u64 = 1_000;

/// Default delay before a forced refresh, giving the host time to persist.
pub const DEFAULT_FORCE_SYNC_DELAY_MS: u64 = 3_000;

/// Default delay before a forced refresh while in reading mode.
pub const DEFAULT_FORCE_SYNC_READING_DELAY_MS: u64 = 100;

/// Default number of staleness retries after a reading-mode toggle.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Fewest staleness retries allowed.
pub const MIN_RETRIES: u32 = 1;

/// Most staleness retries allowed.
pub const MAX_RETRIES: u32 = 10;

/// Default base delay between staleness retries.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 300;

/// Default per-attempt increment between staleness retries.
pub const DEFAULT_RETRY_INCREMENT_MS: u64 = 200;

/// Allowed bar heights in terminal rows.
const BAR_HEIGHT_RANGE: std::ops::RangeInclusive<u16> = 1..=4;

/// Errors that can occur while loading or saving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON for [`Settings`].
    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field has a value outside its allowed range.
    #[error("invalid setting {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Completion bands with their own colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorThresholds {
    /// Percentages below this use `low_color`.
    pub low_threshold: u8,
    /// Percentages below this (and at least `low_threshold`) use `medium_color`.
    pub medium_threshold: u8,
    pub low_color: String,
    pub medium_color: String,
    pub high_color: String,
    /// Used at exactly 100%.
    pub complete_color: String,
}

impl Default for ColorThresholds {
    fn default() -> Self {
        Self {
            low_threshold: 30,
            medium_threshold: 70,
            low_color: "#e53935".to_string(),
            medium_color: "#fb8c00".to_string(),
            high_color: "#43a047".to_string(),
            complete_color: "#1e88e5".to_string(),
        }
    }
}

impl ColorThresholds {
    /// Picks the colour for a completion percentage.
    #[must_use]
    pub fn color_for(&self, percent: u32) -> &str {
        if percent >= 100 {
            &self.complete_color
        } else if percent < u32::from(self.low_threshold) {
            &self.low_color
        } else if percent < u32::from(self.medium_threshold) {
            &self.medium_color
        } else {
            &self.high_color
        }
    }
}

/// User-facing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Bar colour as `#rrggbb`, used when no thresholds are configured.
    pub bar_color: String,
    /// Bar height in terminal rows (1-4).
    pub bar_height: u16,
    /// Show `completed/total` next to the bar.
    pub show_task_count: bool,
    /// Show the percentage next to the bar.
    pub show_percentage: bool,
    /// Debounce for edit-driven refreshes.
    pub debounce_time_ms: u64,
    /// Delay for refreshes in reading mode.
    pub reading_view_delay_ms: u64,
    /// Delay for forced refreshes in editing mode.
    pub force_sync_delay_ms: u64,
    /// Delay for forced refreshes in reading mode.
    pub force_sync_reading_delay_ms: u64,
    /// Staleness retries after a reading-mode toggle.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_increment_ms: u64,
    /// How long a toggle is remembered while waiting for persisted content.
    pub change_ttl_ms: u64,
    /// Optional colour bands; overrides `bar_color` when set.
    pub color_thresholds: Option<ColorThresholds>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bar_color: DEFAULT_BAR_COLOR.to_string(),
            bar_height: 1,
            show_task_count: true,
            show_percentage: true,
            debounce_time_ms: DEFAULT_DEBOUNCE_MS,
            reading_view_delay_ms: DEFAULT_READING_VIEW_DELAY_MS,
            force_sync_delay_ms: DEFAULT_FORCE_SYNC_DELAY_MS,
            force_sync_reading_delay_ms: DEFAULT_FORCE_SYNC_READING_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            retry_increment_ms: DEFAULT_RETRY_INCREMENT_MS,
            change_ttl_ms: DEFAULT_CHANGE_TTL_MS,
            color_thresholds: None,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, returning defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        settings.validate()?;

        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Validates and writes settings to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;

        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Serializes to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every field is within its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_color("barColor", &self.bar_color)?;

        if !BAR_HEIGHT_RANGE.contains(&self.bar_height) {
            return Err(SettingsError::InvalidValue {
                field: "barHeight",
                message: format!(
                    "must be between {} and {}, got {}",
                    BAR_HEIGHT_RANGE.start(),
                    BAR_HEIGHT_RANGE.end(),
                    self.bar_height
                ),
            });
        }

        if !(MIN_RETRIES..=MAX_RETRIES).contains(&self.max_retries) {
            return Err(SettingsError::InvalidValue {
                field: "maxRetries",
                message: format!(
                    "must be between {MIN_RETRIES} and {MAX_RETRIES}, got {}",
                    self.max_retries
                ),
            });
        }

        if self.change_ttl_ms == 0 {
            return Err(SettingsError::InvalidValue {
                field: "changeTtlMs",
                message: "must be greater than 0".to_string(),
            });
        }

        if let Some(thresholds) = &self.color_thresholds {
            if thresholds.low_threshold > thresholds.medium_threshold
                || thresholds.medium_threshold > 100
            {
                return Err(SettingsError::InvalidValue {
                    field: "colorThresholds",
                    message: format!(
                        "thresholds must satisfy low <= medium <= 100, got {} and {}",
                        thresholds.low_threshold, thresholds.medium_threshold
                    ),
                });
            }
            validate_color("colorThresholds.lowColor", &thresholds.low_color)?;
            validate_color("colorThresholds.mediumColor", &thresholds.medium_color)?;
            validate_color("colorThresholds.highColor", &thresholds.high_color)?;
            validate_color("colorThresholds.completeColor", &thresholds.complete_color)?;
        }

        Ok(())
    }

    /// The colour to draw the bar with at `percent`.
    #[must_use]
    pub fn color_for(&self, percent: u32) -> &str {
        match &self.color_thresholds {
            Some(thresholds) => thresholds.color_for(percent),
            None => &self.bar_color,
        }
    }
}

/// Parses a `#rrggbb` colour into its components.
#[must_use]
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn validate_color(field: &'static str, value: &str) -> Result<(), SettingsError> {
    match parse_hex_color(value) {
        Some(_) => Ok(()),
        None => Err(SettingsError::InvalidValue {
            field,
            message: format!("expected #rrggbb colour, got '{value}'"),
        }),
    }
}
