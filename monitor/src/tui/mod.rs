//! Terminal rendering for the progress bar.
//!
//! # Submodules
//!
//! - [`terminal`]: Inline viewport setup and cleanup with panic handling
//! - [`panel`]: The [`ProgressPanel`](crate::view::ProgressPanel) backed by the terminal
//! - [`widgets`]: The progress bar widget

pub mod panel;
pub mod terminal;
pub mod widgets;

pub use panel::TerminalPanel;
pub use terminal::{install_panic_hook, InlineTui};
