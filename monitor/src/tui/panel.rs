//! The terminal progress panel.
//!
//! [`TerminalPanel`] implements [`ProgressPanel`] by redrawing a
//! [`ProgressBarWidget`] into an [`InlineTui`].

use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::settings::Settings;
use crate::tui::terminal::InlineTui;
use crate::tui::widgets::{BarState, ProgressBarWidget};
use crate::types::TaskCount;
use crate::view::{ProgressPanel, RenderError};

/// Draws the progress bar at the bottom of the terminal.
#[derive(Debug)]
pub struct TerminalPanel {
    tui: Mutex<Option<InlineTui>>,
    settings: Settings,
}

impl TerminalPanel {
    /// Opens an inline viewport `settings.bar_height` rows tall.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn new(settings: Settings) -> std::io::Result<Self> {
        let tui = InlineTui::new(settings.bar_height)?;
        Ok(Self {
            tui: Mutex::new(Some(tui)),
            settings,
        })
    }

    fn draw(&self, state: &BarState) -> Result<(), RenderError> {
        let mut guard = self.tui.lock().unwrap_or_else(PoisonError::into_inner);
        let tui = guard.as_mut().ok_or(RenderError::Detached)?;
        tui.draw(|frame| {
            frame.render_widget(ProgressBarWidget::new(state, &self.settings), frame.area());
        })?;
        Ok(())
    }

    /// Restores the terminal. Later renders fail with [`RenderError::Detached`].
    ///
    /// # Errors
    ///
    /// Returns an error if restoring the cursor fails.
    pub fn close(&self) -> std::io::Result<()> {
        let mut guard = self.tui.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.take() {
            Some(mut tui) => tui.restore(),
            None => Ok(()),
        }
    }
}

impl ProgressPanel for TerminalPanel {
    fn name(&self) -> &str {
        "terminal"
    }

    fn supports_progress_update(&self) -> bool {
        self.tui
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn show_no_document(&self) -> Result<(), RenderError> {
        self.draw(&BarState::NoDocument)
    }

    fn show_counts(&self, total: u32, completed: u32, _percent: u32) -> Result<(), RenderError> {
        self.draw(&BarState::Counts(TaskCount { total, completed }))
    }

    fn show_error(&self, message: &str) {
        if let Err(e) = self.draw(&BarState::Error(message.to_string())) {
            warn!(error = %e, "Failed to draw error state");
        }
    }
}
