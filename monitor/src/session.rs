//! A monitoring session for one host.
//!
//! A [`Session`] owns the refresh scheduler and the collaborators it needs,
//! and reacts to [`HostEvent`]s. It is created once when monitoring starts
//! and torn down explicitly with [`Session::shutdown`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use checkbar_monitor::content::FsContentSource;
//! use checkbar_monitor::events::HostEvent;
//! use checkbar_monitor::scheduler::SchedulerConfig;
//! use checkbar_monitor::session::{Session, StaticModeProbe};
//! use checkbar_monitor::types::{DocumentHandle, ViewMode};
//! use checkbar_monitor::view::{LogPanel, ViewRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = Arc::new(FsContentSource::new());
//!     let views = ViewRegistry::new().with_panel(Arc::new(LogPanel));
//!     let session = Session::new(
//!         source.clone(),
//!         views,
//!         Box::new(StaticModeProbe(ViewMode::Editing)),
//!         SchedulerConfig::default(),
//!     );
//!
//!     let doc = DocumentHandle::new("/notes/todo.md");
//!     source.open(doc.clone());
//!     session.handle(HostEvent::DocumentOpened(doc));
//! }
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use crate::content::ContentSource;
use crate::events::HostEvent;
use crate::scheduler::{RefreshScheduler, SchedulerConfig};
use crate::types::{DocumentHandle, ScheduleRequest, Trigger, ViewMode};
use crate::view::ViewRegistry;

/// Reports which mode the host is presenting the active document in.
pub trait ModeProbe: Send + Sync {
    fn probe(&self) -> ViewMode;
}

/// A probe that always reports the same mode.
#[derive(Debug, Clone, Copy)]
pub struct StaticModeProbe(pub ViewMode);

impl ModeProbe for StaticModeProbe {
    fn probe(&self) -> ViewMode {
        self.0
    }
}

/// Reacts to host events for the lifetime of one monitoring session.
pub struct Session {
    scheduler: RefreshScheduler,
    source: Arc<dyn ContentSource>,
    probe: Box<dyn ModeProbe>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session. The initial mode comes from `probe`.
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        views: ViewRegistry,
        probe: Box<dyn ModeProbe>,
        config: SchedulerConfig,
    ) -> Self {
        let scheduler = RefreshScheduler::new(Arc::clone(&source), views, config);
        scheduler.set_view_mode(probe.probe());

        Self {
            scheduler,
            source,
            probe,
        }
    }

    /// Applies a host event. Returns the trigger acted on, or `None` if the
    /// event was ignored.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle(&self, event: HostEvent) -> Option<Trigger> {
        trace!(?event, "Host event");
        let trigger = event.trigger();

        // Edits and disk changes only matter for the document on screen.
        if matches!(
            event,
            HostEvent::TextEdited { .. } | HostEvent::MetadataChanged(_)
        ) {
            if let Some(doc) = event.document().filter(|doc| !self.is_active(doc)) {
                trace!(document = %doc, "Event for inactive document ignored");
                return None;
            }
        }

        match event {
            HostEvent::DocumentOpened(doc) => {
                debug!(document = %doc, "Document opened");
                self.refresh_view_mode();
                self.scheduler
                    .schedule_request(ScheduleRequest::for_trigger(trigger));
            }

            HostEvent::TextEdited { doc, text } => {
                self.scheduler.note_live_edit(&doc, &text);
                self.scheduler
                    .schedule_request(ScheduleRequest::for_trigger(trigger));
            }

            HostEvent::CheckboxClicked { doc, item_text } => {
                debug!(document = %doc, item = %item_text, "Checkbox toggled");
                self.scheduler.record_change(&doc.key(), &item_text);
                self.scheduler.schedule(true, false);
                if self.scheduler.view_mode().is_reading() {
                    self.scheduler.start_retry_sequence();
                }
            }

            HostEvent::MetadataChanged(_) => {
                self.scheduler
                    .schedule_request(ScheduleRequest::for_trigger(trigger));
            }

            HostEvent::LayoutChanged => {
                self.refresh_view_mode();
                self.scheduler
                    .schedule_request(ScheduleRequest::for_trigger(trigger));
            }

            HostEvent::DocumentClosed => {
                debug!("Document closed");
                self.scheduler
                    .schedule_request(ScheduleRequest::for_trigger(trigger));
            }
        }

        Some(trigger)
    }

    /// Re-probes the host for the view mode. Returns `true` if it changed.
    pub fn refresh_view_mode(&self) -> bool {
        self.scheduler.set_view_mode(self.probe.probe())
    }

    #[must_use]
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Cancels pending refreshes and retries.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    fn is_active(&self, doc: &DocumentHandle) -> bool {
        self.source
            .active_document()
            .is_some_and(|active| &active == doc)
    }
}
