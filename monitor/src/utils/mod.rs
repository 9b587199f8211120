//! Shared utilities.
//!
//! # Modules
//!
//! - [`debounce`]: Cancel-and-replace timer for coalescing bursts of triggers

pub mod debounce;

pub use debounce::{DebouncedTrigger, DEFAULT_DEBOUNCE_MS};
