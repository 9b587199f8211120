//! Trackers that remember recent user intent.
//!
//! - [`change_tracker`]: checkbox toggles awaiting confirmation in persisted content

pub mod change_tracker;

pub use change_tracker::{ChangeTracker, PendingChange, DEFAULT_CHANGE_TTL_MS};
