//! TUI widgets built on [`ratatui`].
//!
//! - [`progress_bar`]: Checklist progress bar with count and percentage label

pub mod progress_bar;

pub use progress_bar::{BarState, ProgressBarWidget};
