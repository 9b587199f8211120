//! File watcher for the monitored document.
//!
//! Editors that save outside the session still need the bar to update. The
//! [`DocumentWatcher`] turns file system changes to one document into
//! [`HostEvent`]s and sends them to the session loop.
//!
//! # Architecture
//!
//! The watcher subscribes to the document's parent directory (not the file
//! itself) so that atomic saves, which replace the file through a rename,
//! keep being observed. The notify callback only classifies events and
//! forwards them with `try_send`; all scanning happens in the session.
//!
//! # Example
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use checkbar_monitor::events::HostEvent;
//! use checkbar_monitor::watcher::DocumentWatcher;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tx, mut rx) = mpsc::channel(64);
//!     let _watcher = DocumentWatcher::new("notes/todo.md", tx)?;
//!
//!     while let Some(event) = rx.recv().await {
//!         match event {
//!             HostEvent::MetadataChanged(doc) => println!("changed: {doc}"),
//!             HostEvent::DocumentClosed => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use notify::{
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::events::HostEvent;
use crate::types::DocumentHandle;

/// Errors that can occur while setting up a document watch.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// Failed to resolve the document path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document does not exist.
    #[error("document does not exist: {0}")]
    DocumentNotFound(PathBuf),

    /// The document path has no parent directory to watch.
    #[error("document has no parent directory: {0}")]
    NoParent(PathBuf),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Watches a single document and reports changes as host events.
///
/// Dropping the watcher ends the subscription.
#[derive(Debug)]
pub struct DocumentWatcher {
    /// Kept alive to maintain the watch subscription.
    #[allow(dead_code)]
    watcher: RecommendedWatcher,

    document: DocumentHandle,
}

impl DocumentWatcher {
    /// Starts watching `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The document does not exist
    /// - Its path cannot be resolved
    /// - The file system watcher cannot be initialized
    pub fn new(path: impl AsRef<Path>, event_sender: mpsc::Sender<HostEvent>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WatcherError::DocumentNotFound(path.to_path_buf()));
        }

        // Notify reports canonical paths on most backends.
        let resolved = path.canonicalize()?;
        let parent = resolved
            .parent()
            .ok_or_else(|| WatcherError::NoParent(resolved.clone()))?
            .to_path_buf();
        let document = DocumentHandle::new(resolved);

        let watcher = create_watcher(event_sender, document.clone(), &parent)?;

        info!(document = %document, "Watching document");

        Ok(Self { watcher, document })
    }

    /// The document being watched, with its path resolved.
    #[must_use]
    pub fn document(&self) -> &DocumentHandle {
        &self.document
    }
}

fn create_watcher(
    sender: mpsc::Sender<HostEvent>,
    document: DocumentHandle,
    parent: &Path,
) -> Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| {
            handle_notify_event(res, &document, &sender);
        },
        Config::default(),
    )?;

    watcher.watch(parent, RecursiveMode::NonRecursive)?;

    debug!(dir = %parent.display(), "Started directory watch");

    Ok(watcher)
}

/// Notify callback. Must not block the notify thread.
fn handle_notify_event(
    res: std::result::Result<Event, notify::Error>,
    document: &DocumentHandle,
    sender: &mpsc::Sender<HostEvent>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    let Some(host_event) = classify(&event, document, document.path().exists()) else {
        return;
    };

    if let Err(e) = sender.try_send(host_event) {
        warn!(error = %e, "Failed to queue document event, channel may be full");
    }
}

/// Maps a notify event to a host event for `document`.
///
/// `still_exists` is whether the document is present after the event, which
/// tells a rename-away from an atomic save.
fn classify(event: &Event, document: &DocumentHandle, still_exists: bool) -> Option<HostEvent> {
    if !event.paths.iter().any(|p| p == document.path()) {
        return None;
    }

    match event.kind {
        EventKind::Create(CreateKind::File | CreateKind::Any)
        | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            Some(HostEvent::MetadataChanged(document.clone()))
        }
        EventKind::Remove(RemoveKind::File | RemoveKind::Any)
        | EventKind::Modify(ModifyKind::Name(_)) => {
            if still_exists {
                Some(HostEvent::MetadataChanged(document.clone()))
            } else {
                info!(document = %document, "Document removed");
                Some(HostEvent::DocumentClosed)
            }
        }
        _ => {
            trace!(kind = ?event.kind, "Ignoring event kind");
            None
        }
    }
}
