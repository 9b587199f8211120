//! Core value types shared across the Checkbar monitor.
//!
//! These types carry no behaviour beyond simple derived values. They are
//! produced by the [`scanner`](crate::scanner), consumed by the
//! [`scheduler`](crate::scheduler), and handed to progress panels.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Checklist counts for a single document.
///
/// `completed` never exceeds `total`; the scanner only ever increments
/// `completed` for a line it has already counted in `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskCount {
    /// Number of checklist lines.
    pub total: u32,
    /// Number of checklist lines whose marker is not a plain space.
    pub completed: u32,
}

impl TaskCount {
    /// Counts with nothing in them.
    pub const EMPTY: TaskCount = TaskCount {
        total: 0,
        completed: 0,
    };

    /// Returns `true` if the document has no checklist lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Completion percentage rounded to the nearest integer.
    ///
    /// Returns `0` for an empty count. Callers that render should check
    /// [`is_empty`](Self::is_empty) first and show a "no tasks" state instead.
    ///
    /// # Example
    ///
    /// ```
    /// use checkbar_monitor::types::TaskCount;
    ///
    /// let count = TaskCount { total: 3, completed: 1 };
    /// assert_eq!(count.percent(), 33);
    /// ```
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let ratio = f64::from(self.completed) / f64::from(self.total);
        (ratio * 100.0).round() as u32
    }
}

impl fmt::Display for TaskCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "no tasks")
        } else {
            write!(f, "{}/{} ({}%)", self.completed, self.total, self.percent())
        }
    }
}

/// How the host is currently presenting the active document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// An editable buffer is shown; the live buffer is authoritative.
    #[default]
    Editing,
    /// Static rendered output; edits reach us only through persisted reads.
    Reading,
}

impl ViewMode {
    #[must_use]
    pub fn is_reading(self) -> bool {
        matches!(self, ViewMode::Reading)
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Editing => write!(f, "editing"),
            ViewMode::Reading => write!(f, "reading"),
        }
    }
}

/// The abstract reasons the core refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A document became active.
    Open,
    /// The live buffer changed.
    Edit,
    /// The document changed outside the editor, or the host layout changed.
    ExternalChange,
}

/// Parameters of a single [`schedule`](crate::scheduler::RefreshScheduler::schedule) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleRequest {
    /// The caller knows an edit is being persisted and wants a read after it lands.
    pub force_sync: bool,
    /// Prefer the in-memory editor buffer over a persisted read.
    pub use_live_buffer: bool,
}

impl ScheduleRequest {
    #[must_use]
    pub fn new(force_sync: bool, use_live_buffer: bool) -> Self {
        Self {
            force_sync,
            use_live_buffer,
        }
    }

    /// Request used for a trigger that carries no extra intent.
    #[must_use]
    pub fn for_trigger(trigger: Trigger) -> Self {
        match trigger {
            Trigger::Open | Trigger::Edit => Self::new(false, true),
            Trigger::ExternalChange => Self::new(false, false),
        }
    }
}

/// Identifies a document owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    path: PathBuf,
}

impl DocumentHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path rendered as the string used for change-tracker keys.
    #[must_use]
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
