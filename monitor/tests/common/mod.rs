//! In-memory host doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use checkbar_monitor::content::{ContentError, ContentSource};
use checkbar_monitor::types::DocumentHandle;
use checkbar_monitor::view::{ProgressPanel, RenderError};

/// Path of the document most tests work with.
pub const DOC_PATH: &str = "/vault/todo.md";

pub fn doc() -> DocumentHandle {
    DocumentHandle::new(DOC_PATH)
}

#[derive(Default)]
struct SourceState {
    active: Option<DocumentHandle>,
    persisted: HashMap<String, String>,
    live: HashMap<String, String>,
    fallback: HashMap<String, String>,
    fail_reads: bool,
    read_delay: Option<Duration>,
    reads: usize,
}

/// A content source whose documents live in memory.
#[derive(Default)]
pub struct MemorySource {
    state: Mutex<SourceState>,
}

impl MemorySource {
    /// A source with `text` persisted for [`doc`] and that document active.
    pub fn with_document(text: &str) -> Arc<Self> {
        let source = Arc::new(Self::default());
        source.set_persisted(&doc(), text);
        source.open(doc());
        source
    }

    pub fn open(&self, doc: DocumentHandle) {
        self.state.lock().unwrap().active = Some(doc);
    }

    pub fn close(&self) {
        self.state.lock().unwrap().active = None;
    }

    pub fn set_persisted(&self, doc: &DocumentHandle, text: &str) {
        self.state
            .lock()
            .unwrap()
            .persisted
            .insert(doc.key(), text.to_string());
    }

    pub fn set_live(&self, doc: &DocumentHandle, text: &str) {
        self.state
            .lock()
            .unwrap()
            .live
            .insert(doc.key(), text.to_string());
    }

    pub fn set_fallback(&self, doc: &DocumentHandle, text: &str) {
        self.state
            .lock()
            .unwrap()
            .fallback
            .insert(doc.key(), text.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Makes every persisted read take `delay` of (virtual) time.
    pub fn slow_reads(&self, delay: Duration) {
        self.state.lock().unwrap().read_delay = Some(delay);
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    fn active_document(&self) -> Option<DocumentHandle> {
        self.state.lock().unwrap().active.clone()
    }

    fn live_buffer(&self, doc: &DocumentHandle) -> Option<String> {
        self.state.lock().unwrap().live.get(&doc.key()).cloned()
    }

    async fn read_persisted(&self, doc: &DocumentHandle) -> Result<String, ContentError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.reads += 1;
            state.read_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(ContentError::NotFound(doc.path().to_path_buf()));
        }
        state
            .persisted
            .get(&doc.key())
            .cloned()
            .ok_or_else(|| ContentError::NotFound(doc.path().to_path_buf()))
    }

    async fn read_cached_fallback(&self, doc: &DocumentHandle) -> Option<String> {
        self.state.lock().unwrap().fallback.get(&doc.key()).cloned()
    }
}

/// One call made on a [`RecordingPanel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Render {
    NoDocument,
    Counts { total: u32, completed: u32, percent: u32 },
    Error(String),
}

/// A panel that records every render.
#[derive(Default)]
pub struct RecordingPanel {
    renders: Mutex<Vec<Render>>,
}

impl RecordingPanel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn renders(&self) -> Vec<Render> {
        self.renders.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Render> {
        self.renders.lock().unwrap().last().cloned()
    }
}

impl ProgressPanel for RecordingPanel {
    fn name(&self) -> &str {
        "recording"
    }

    fn show_no_document(&self) -> Result<(), RenderError> {
        self.renders.lock().unwrap().push(Render::NoDocument);
        Ok(())
    }

    fn show_counts(&self, total: u32, completed: u32, percent: u32) -> Result<(), RenderError> {
        self.renders.lock().unwrap().push(Render::Counts {
            total,
            completed,
            percent,
        });
        Ok(())
    }

    fn show_error(&self, message: &str) {
        self.renders
            .lock()
            .unwrap()
            .push(Render::Error(message.to_string()));
    }
}

pub fn counts(total: u32, completed: u32, percent: u32) -> Render {
    Render::Counts {
        total,
        completed,
        percent,
    }
}

/// Advances the paused clock by `ms` and lets spawned tasks run.
pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
