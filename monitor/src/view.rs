//! Progress panels: where counts are shown.
//!
//! Any panel that can display progress implements [`ProgressPanel`]. The
//! [`ViewRegistry`] fans a render out to every registered panel that reports
//! [`supports_progress_update`](ProgressPanel::supports_progress_update),
//! without knowing what kind of panel it is.
//!
//! A failing panel never fails the refresh: the registry logs the error and
//! asks the panel to show it inline via [`show_error`](ProgressPanel::show_error).

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::types::TaskCount;

/// Errors a panel can report while rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The panel has not finished setting up.
    #[error("panel not ready")]
    NotReady,

    /// The panel was torn down by the host.
    #[error("panel detached")]
    Detached,

    /// Writing to the terminal failed.
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A host panel capable of displaying checklist progress.
pub trait ProgressPanel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this panel wants progress updates right now.
    fn supports_progress_update(&self) -> bool {
        true
    }

    /// Shows the "no document open" state.
    fn show_no_document(&self) -> Result<(), RenderError>;

    /// Shows counts for the active document. `total == 0` is the "no tasks"
    /// state and must not look like a finished bar.
    fn show_counts(&self, total: u32, completed: u32, percent: u32) -> Result<(), RenderError>;

    /// Replaces the bar with an inline error message.
    fn show_error(&self, message: &str);
}

/// The set of panels that receive progress renders.
#[derive(Default)]
pub struct ViewRegistry {
    panels: Vec<Arc<dyn ProgressPanel>>,
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewRegistry")
            .field(
                "panels",
                &self.panels.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ViewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a panel.
    pub fn register(&mut self, panel: Arc<dyn ProgressPanel>) {
        self.panels.push(panel);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with_panel(mut self, panel: Arc<dyn ProgressPanel>) -> Self {
        self.register(panel);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Shows the no-document state on every interested panel.
    ///
    /// Returns the number of panels that rendered successfully.
    pub fn show_no_document(&self) -> usize {
        self.render_each(|panel| panel.show_no_document())
    }

    /// Shows `count` on every interested panel.
    ///
    /// Returns the number of panels that rendered successfully.
    pub fn show_counts(&self, count: TaskCount) -> usize {
        let percent = count.percent();
        self.render_each(|panel| panel.show_counts(count.total, count.completed, percent))
    }

    fn render_each<F>(&self, render: F) -> usize
    where
        F: Fn(&dyn ProgressPanel) -> Result<(), RenderError>,
    {
        let mut rendered = 0;
        for panel in self.panels.iter().filter(|p| p.supports_progress_update()) {
            match render(panel.as_ref()) {
                Ok(()) => rendered += 1,
                Err(e) => {
                    warn!(panel = panel.name(), error = %e, "Failed to render progress");
                    panel.show_error(&format!("Progress unavailable: {e}"));
                }
            }
        }
        rendered
    }
}

/// A panel that writes each render to the log.
///
/// Used for headless runs where no terminal bar is drawn.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPanel;

impl ProgressPanel for LogPanel {
    fn name(&self) -> &str {
        "log"
    }

    fn show_no_document(&self) -> Result<(), RenderError> {
        info!("No document open");
        Ok(())
    }

    fn show_counts(&self, total: u32, completed: u32, percent: u32) -> Result<(), RenderError> {
        if total == 0 {
            info!("No tasks in document");
        } else {
            info!(completed, total, percent, "Task progress");
        }
        Ok(())
    }

    fn show_error(&self, message: &str) {
        warn!(error_message = message, "Progress panel error");
    }
}
