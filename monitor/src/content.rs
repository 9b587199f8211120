//! Content sources: where document text comes from.
//!
//! The host owns documents. The core only asks for text through the
//! [`ContentSource`] trait, which exposes the three ways the host can supply
//! it:
//!
//! 1. the live editor buffer, if the document is open in an editor
//! 2. a persisted read from storage
//! 3. a best-effort cached copy, used when the persisted read fails
//!
//! [`FsContentSource`] is the filesystem-backed implementation used by the
//! `checkbar` binary.
//!
//! # Example
//!
//! ```no_run
//! use checkbar_monitor::content::{ContentSource, FsContentSource};
//! use checkbar_monitor::types::DocumentHandle;
//!
//! # async fn example() -> Result<(), checkbar_monitor::content::ContentError> {
//! let source = FsContentSource::new();
//! let doc = DocumentHandle::new("/notes/todo.md");
//! source.open(doc.clone());
//!
//! let text = source.read_persisted(&doc).await?;
//! println!("{} bytes", text.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace};

use crate::types::DocumentHandle;

/// Errors raised while reading document content.
#[derive(Error, Debug)]
pub enum ContentError {
    /// The persisted document could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The host has no such document.
    #[error("document not found: {0}")]
    NotFound(PathBuf),
}

/// Supplies document text on behalf of the host.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// The document currently shown, if any.
    fn active_document(&self) -> Option<DocumentHandle>;

    /// The unsaved editor buffer for `doc`, if it is open in an editor.
    fn live_buffer(&self, doc: &DocumentHandle) -> Option<String>;

    /// Reads the persisted document.
    async fn read_persisted(&self, doc: &DocumentHandle) -> Result<String, ContentError>;

    /// Best-effort cached copy of the document. Never fails; `None` if the
    /// host has nothing cached.
    async fn read_cached_fallback(&self, doc: &DocumentHandle) -> Option<String>;
}

#[derive(Debug, Default)]
struct FsState {
    active: Option<DocumentHandle>,
    buffers: HashMap<PathBuf, String>,
    last_read: HashMap<PathBuf, String>,
}

/// Filesystem-backed content source.
///
/// Persisted reads go through `tokio::fs`. Live buffers are registered by
/// whatever acts as the editor via [`set_live_buffer`](Self::set_live_buffer).
/// The cached fallback is the last successful persisted read of a document.
#[derive(Debug, Default)]
pub struct FsContentSource {
    state: RwLock<FsState>,
}

impl FsContentSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `doc` the active document.
    pub fn open(&self, doc: DocumentHandle) {
        debug!(document = %doc, "Document activated");
        self.write_state().active = Some(doc);
    }

    /// Clears the active document. Buffers and cached reads are kept.
    pub fn close(&self) {
        if let Some(doc) = self.write_state().active.take() {
            debug!(document = %doc, "Document deactivated");
        }
    }

    /// Records the current editor buffer for `doc`.
    pub fn set_live_buffer(&self, doc: &DocumentHandle, text: impl Into<String>) {
        self.write_state()
            .buffers
            .insert(doc.path().to_path_buf(), text.into());
    }

    /// Drops the editor buffer for `doc`, e.g. when the editor closes it.
    pub fn close_buffer(&self, doc: &DocumentHandle) {
        self.write_state().buffers.remove(doc.path());
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FsState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, FsState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    fn active_document(&self) -> Option<DocumentHandle> {
        self.read_state().active.clone()
    }

    fn live_buffer(&self, doc: &DocumentHandle) -> Option<String> {
        self.read_state().buffers.get(doc.path()).cloned()
    }

    async fn read_persisted(&self, doc: &DocumentHandle) -> Result<String, ContentError> {
        let text = tokio::fs::read_to_string(doc.path())
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ContentError::NotFound(doc.path().to_path_buf())
                } else {
                    ContentError::Read {
                        path: doc.path().to_path_buf(),
                        source,
                    }
                }
            })?;

        trace!(document = %doc, bytes = text.len(), "Read persisted document");
        self.write_state()
            .last_read
            .insert(doc.path().to_path_buf(), text.clone());
        Ok(text)
    }

    async fn read_cached_fallback(&self, doc: &DocumentHandle) -> Option<String> {
        self.read_state().last_read.get(doc.path()).cloned()
    }
}
