//! Checkbar - checklist progress for markdown documents.
//!
//! This crate counts the checklist items in a document and keeps a progress
//! bar in step with the document as it is edited, toggled or changed on disk.
//!
//! # Overview
//!
//! Hosts report what happened as [`HostEvent`]s. A [`Session`] turns each
//! event into a refresh request for its [`RefreshScheduler`], which debounces
//! the requests, fetches the document text from a [`ContentSource`], counts
//! tasks with [`scan_tasks`] and renders the result on every registered
//! [`ProgressPanel`].
//!
//! When a checkbox is toggled in reading mode the host may not have persisted
//! the change yet. The [`ChangeTracker`] remembers the toggle so the scheduler
//! can retry until the persisted text reflects it.
//!
//! # Modules
//!
//! - [`types`]: Task counts, view modes and refresh requests
//! - [`scanner`]: Checklist counting
//! - [`trackers`]: Pending-change tracking
//! - [`scheduler`]: Debounced, single-flight refresh cycles
//! - [`events`]: Host events and their triggers
//! - [`session`]: Event handling for one monitoring session
//! - [`content`]: Where document text comes from
//! - [`view`]: Progress panels
//! - [`settings`]: Persisted user settings
//! - [`config`]: Configuration from environment variables
//! - [`watcher`]: File system watcher for the monitored document
//! - [`tui`]: Terminal progress bar
//! - [`error`]: Error types
//! - [`utils`]: Shared utilities (debouncing)

pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod scanner;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod trackers;
pub mod tui;
pub mod types;
pub mod utils;
pub mod view;
pub mod watcher;

pub use config::Config;
pub use content::{ContentError, ContentSource, FsContentSource};
pub use error::{CheckbarError, Result};
pub use events::HostEvent;
pub use scanner::scan_tasks;
pub use scheduler::{CycleOutcome, Phase, RefreshScheduler, SchedulerConfig};
pub use session::{ModeProbe, Session, StaticModeProbe};
pub use settings::{Settings, SettingsError};
pub use trackers::ChangeTracker;
pub use types::{DocumentHandle, ScheduleRequest, TaskCount, Trigger, ViewMode};
pub use utils::{DebouncedTrigger, DEFAULT_DEBOUNCE_MS};
pub use view::{LogPanel, ProgressPanel, RenderError, ViewRegistry};
pub use watcher::{DocumentWatcher, WatcherError};
