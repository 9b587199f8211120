//! Refresh scheduling: when to fetch, scan and render.
//!
//! The [`RefreshScheduler`] coalesces bursts of host events into a single
//! fetch/scan/render cycle. It owns all of the mutable refresh state for one
//! session: the pending timer, the view mode, the last known document text,
//! the change tracker and the single-flight guard.
//!
//! # Phases
//!
//! ```text
//! Idle -> Armed -> InFlight -> Idle
//!                     |
//!                     +-- stale in reading mode --> RetryWait -> InFlight ...
//! ```
//!
//! # Delay Selection
//!
//! [`DelayPolicy::select`] is a pure function of the request and view mode.
//! First match wins:
//!
//! | Condition | Delay |
//! |-----------|-------|
//! | `force_sync` and reading | `force_sync_reading` (100 ms) |
//! | `force_sync` | `force_sync` (3 s) |
//! | reading and not live buffer | `reading_view` (1 s) |
//! | otherwise | `debounce` (300 ms) |
//!
//! # Single Flight
//!
//! Only one cycle runs at a time. A debounced timer that fires while a cycle
//! is running is dropped. The reading-mode retry sequence instead waits for
//! the running cycle to finish.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::content::ContentSource;
use crate::scanner::scan_tasks;
use crate::settings::Settings;
use crate::trackers::ChangeTracker;
use crate::types::{DocumentHandle, ScheduleRequest, TaskCount, ViewMode};
use crate::utils::DebouncedTrigger;
use crate::view::ViewRegistry;

/// Delays used by [`RefreshScheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub debounce: Duration,
    pub reading_view: Duration,
    pub force_sync: Duration,
    pub force_sync_reading: Duration,
}

impl DelayPolicy {
    /// Picks the delay for a request in the given mode.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use checkbar_monitor::scheduler::DelayPolicy;
    /// use checkbar_monitor::types::{ScheduleRequest, ViewMode};
    ///
    /// let policy = DelayPolicy::default();
    /// let delay = policy.select(ScheduleRequest::new(true, false), ViewMode::Reading);
    /// assert_eq!(delay, Duration::from_millis(100));
    /// ```
    #[must_use]
    pub fn select(&self, request: ScheduleRequest, mode: ViewMode) -> Duration {
        if request.force_sync && mode.is_reading() {
            self.force_sync_reading
        } else if request.force_sync {
            self.force_sync
        } else if mode.is_reading() && !request.use_live_buffer {
            self.reading_view
        } else {
            self.debounce
        }
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for DelayPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            debounce: Duration::from_millis(settings.debounce_time_ms),
            reading_view: Duration::from_millis(settings.reading_view_delay_ms),
            force_sync: Duration::from_millis(settings.force_sync_delay_ms),
            force_sync_reading: Duration::from_millis(settings.force_sync_reading_delay_ms),
        }
    }
}

/// Bounded backoff for the reading-mode staleness retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of cycles attempted.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub increment: Duration,
}

impl RetryPolicy {
    /// Wait after `attempts_made` stale attempts: `base + attempts_made * increment`.
    #[must_use]
    pub fn backoff(&self, attempts_made: u32) -> Duration {
        self.base_delay
            .saturating_add(self.increment.saturating_mul(attempts_made))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for RetryPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_retries,
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            increment: Duration::from_millis(settings.retry_increment_ms),
        }
    }
}

/// Everything tunable about the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub delays: DelayPolicy,
    pub retry: RetryPolicy,
    pub change_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SchedulerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            delays: DelayPolicy::from(settings),
            retry: RetryPolicy::from(settings),
            change_ttl: Duration::from_millis(settings.change_ttl_ms),
        }
    }
}

/// Where the scheduler is in its refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A timer is pending.
    Armed,
    /// A fetch/scan/render cycle is running.
    InFlight,
    /// The retry sequence is waiting out a backoff.
    RetryWait,
}

/// Result of one fetch/scan/render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Counts were rendered.
    Rendered(TaskCount),
    /// No document is open; the no-document state was rendered.
    NoDocument,
    /// Content does not yet reflect a recorded toggle; nothing was rendered.
    Stale(TaskCount),
    /// Another cycle was running, so this one did nothing.
    Skipped,
}

#[derive(Debug)]
struct CachedContent {
    doc: DocumentHandle,
    text: String,
    /// Set when the text came from an editor-change event rather than a read.
    from_editor: bool,
}

#[derive(Debug, Default)]
struct RefreshState {
    mode: ViewMode,
    cache: Option<CachedContent>,
    last_rendered: Option<TaskCount>,
    retry_attempt: u32,
}

struct Shared {
    source: Arc<dyn ContentSource>,
    views: ViewRegistry,
    config: SchedulerConfig,
    tracker: Mutex<ChangeTracker>,
    state: Mutex<RefreshState>,
    cycle_lock: tokio::sync::Mutex<()>,
    in_flight: AtomicBool,
    retry_waiting: AtomicBool,
    cycles: AtomicU64,
}

/// Marks a cycle as running until dropped, including when its task is aborted.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Entry point for debounced timers: drop the cycle if one is running.
    async fn run_debounced(&self, request: ScheduleRequest) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            debug!("Refresh already in flight, dropping trigger");
            return CycleOutcome::Skipped;
        };
        self.run_cycle(request).await
    }

    /// Entry point for callers that must run: wait for any running cycle.
    async fn run_exclusive(&self, request: ScheduleRequest) -> CycleOutcome {
        let _guard = self.cycle_lock.lock().await;
        self.run_cycle(request).await
    }

    /// One fetch/scan/render cycle. Caller holds `cycle_lock`.
    async fn run_cycle(&self, request: ScheduleRequest) -> CycleOutcome {
        let _in_flight = InFlightGuard::enter(&self.in_flight);
        self.cycles.fetch_add(1, Ordering::SeqCst);

        let Some(doc) = self.source.active_document() else {
            debug!("No active document");
            self.views.show_no_document();
            self.state().last_rendered = None;
            return CycleOutcome::NoDocument;
        };

        let mode = self.state().mode;
        let content = self.acquire_content(&doc, mode, request.use_live_buffer).await;
        let count = scan_tasks(&content);
        let key = doc.key();

        if mode.is_reading() && self.tracker().has_unreflected_change(&key, &content) {
            debug!(document = %doc, "Content does not reflect recent toggle yet");
            return CycleOutcome::Stale(count);
        }

        self.tracker().confirm(&key);
        self.views.show_counts(count);
        self.state().last_rendered = Some(count);

        trace!(
            document = %doc,
            total = count.total,
            completed = count.completed,
            "Rendered progress"
        );
        CycleOutcome::Rendered(count)
    }

    /// Fetches text for `doc`: live buffer (or last edit event), persisted
    /// read, cached copy, host fallback, then empty.
    async fn acquire_content(
        &self,
        doc: &DocumentHandle,
        mode: ViewMode,
        use_live_buffer: bool,
    ) -> String {
        if mode == ViewMode::Editing && use_live_buffer {
            if let Some(text) = self.source.live_buffer(doc) {
                trace!(document = %doc, "Using live buffer");
                self.remember(doc, &text, false);
                return text;
            }
            if let Some(text) = self.cached_edit(doc) {
                trace!(document = %doc, "Using text from last edit event");
                return text;
            }
        }

        match self.source.read_persisted(doc).await {
            Ok(text) => {
                self.remember(doc, &text, false);
                text
            }
            Err(e) => {
                warn!(document = %doc, error = %e, "Persisted read failed, falling back");

                let cached = self
                    .state()
                    .cache
                    .as_ref()
                    .filter(|cached| &cached.doc == doc)
                    .map(|cached| cached.text.clone());
                if let Some(text) = cached {
                    return text;
                }

                match self.source.read_cached_fallback(doc).await {
                    Some(text) => text,
                    None => {
                        debug!(document = %doc, "No cached content available");
                        String::new()
                    }
                }
            }
        }
    }

    fn remember(&self, doc: &DocumentHandle, text: &str, from_editor: bool) {
        self.state().cache = Some(CachedContent {
            doc: doc.clone(),
            text: text.to_string(),
            from_editor,
        });
    }

    fn cached_edit(&self, doc: &DocumentHandle) -> Option<String> {
        self.state()
            .cache
            .as_ref()
            .filter(|cached| cached.from_editor && &cached.doc == doc)
            .map(|cached| cached.text.clone())
    }

    /// Retries until content reflects recorded toggles or attempts run out.
    async fn retry_until_fresh(&self) {
        let retry = self.config.retry;
        let mut delay = retry.base_delay;

        for attempt in 1..=retry.max_attempts {
            self.retry_waiting.store(true, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.retry_waiting.store(false, Ordering::SeqCst);

            self.state().retry_attempt = attempt;
            match self.run_exclusive(ScheduleRequest::new(true, false)).await {
                CycleOutcome::Stale(_) => {
                    delay = retry.backoff(attempt);
                    debug!(attempt, next_delay_ms = delay.as_millis(), "Content still stale");
                }
                outcome => {
                    debug!(attempt, ?outcome, "Content caught up");
                    self.state().retry_attempt = 0;
                    return;
                }
            }
        }

        self.state().retry_attempt = 0;
        warn!(
            attempts = retry.max_attempts,
            "Gave up waiting for content to reflect checkbox change"
        );
    }
}

/// Debounced, single-flight refresh loop for one session.
pub struct RefreshScheduler {
    shared: Arc<Shared>,
    timer: DebouncedTrigger,
    retry_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("phase", &self.phase())
            .field("mode", &self.view_mode())
            .field("cycles", &self.cycles_run())
            .field("views", &self.shared.views)
            .finish()
    }
}

impl RefreshScheduler {
    /// Creates a scheduler in editing mode with nothing armed.
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        views: ViewRegistry,
        config: SchedulerConfig,
    ) -> Self {
        let shared = Shared {
            source,
            views,
            config,
            tracker: Mutex::new(ChangeTracker::with_ttl(config.change_ttl)),
            state: Mutex::new(RefreshState::default()),
            cycle_lock: tokio::sync::Mutex::new(()),
            in_flight: AtomicBool::new(false),
            retry_waiting: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
        };

        Self {
            shared: Arc::new(shared),
            timer: DebouncedTrigger::new("refresh"),
            retry_task: Mutex::new(None),
        }
    }

    /// Arms a refresh, cancelling any refresh that has not fired yet.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, force_sync: bool, use_live_buffer: bool) {
        self.schedule_request(ScheduleRequest::new(force_sync, use_live_buffer));
    }

    /// [`schedule`](Self::schedule) taking a prepared request.
    pub fn schedule_request(&self, request: ScheduleRequest) {
        let mode = self.view_mode();
        let delay = self.shared.config.delays.select(request, mode);

        debug!(
            force_sync = request.force_sync,
            use_live_buffer = request.use_live_buffer,
            %mode,
            delay_ms = delay.as_millis(),
            "Scheduling refresh"
        );

        let shared = Arc::clone(&self.shared);
        self.timer.arm(delay, async move {
            shared.run_debounced(request).await;
        });
    }

    /// Runs a cycle now, waiting for any running cycle to finish first.
    pub async fn refresh_now(&self, use_live_buffer: bool) -> CycleOutcome {
        self.shared
            .run_exclusive(ScheduleRequest::new(false, use_live_buffer))
            .await
    }

    /// Starts the reading-mode staleness retry sequence, replacing any
    /// sequence already running.
    pub fn start_retry_sequence(&self) {
        let mut slot = self.retry_task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
            self.shared.state().retry_attempt = 0;
            trace!("Replaced running retry sequence");
        }

        let shared = Arc::clone(&self.shared);
        *slot = Some(tokio::spawn(async move {
            shared.retry_until_fresh().await;
        }));
    }

    /// Records a checkbox toggle made in a rendered view.
    pub fn record_change(&self, file_path: &str, item_text: &str) {
        self.shared.tracker().record_change(file_path, item_text);
    }

    /// Returns `true` if `content` misses a recent toggle for `file_path`.
    pub fn has_unreflected_change(&self, file_path: &str, content: &str) -> bool {
        self.shared
            .tracker()
            .has_unreflected_change(file_path, content)
    }

    /// Number of toggles still awaiting confirmation.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.shared.tracker().len()
    }

    /// Updates the view mode. A change drops the cached document text.
    ///
    /// Returns `true` if the mode changed.
    pub fn set_view_mode(&self, mode: ViewMode) -> bool {
        let mut state = self.shared.state();
        if state.mode == mode {
            return false;
        }

        info!(from = %state.mode, to = %mode, "View mode changed");
        state.mode = mode;
        state.cache = None;
        true
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.shared.state().mode
    }

    /// Stores editor text as the last known content for `doc`.
    pub fn note_live_edit(&self, doc: &DocumentHandle, text: &str) {
        self.shared.remember(doc, text, true);
    }

    /// The last known text for `doc`, if cached.
    #[must_use]
    pub fn cached_content(&self, doc: &DocumentHandle) -> Option<String> {
        self.shared
            .state()
            .cache
            .as_ref()
            .filter(|cached| &cached.doc == doc)
            .map(|cached| cached.text.clone())
    }

    /// Counts from the most recent render, `None` if nothing (or the
    /// no-document state) was rendered last.
    #[must_use]
    pub fn last_rendered(&self) -> Option<TaskCount> {
        self.shared.state().last_rendered
    }

    /// Total cycles started, including stale ones.
    #[must_use]
    pub fn cycles_run(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    /// Current retry attempt, `0` when no retry sequence is running a cycle.
    #[must_use]
    pub fn retry_attempt(&self) -> u32 {
        self.shared.state().retry_attempt
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.shared.in_flight.load(Ordering::SeqCst) {
            Phase::InFlight
        } else if self.shared.retry_waiting.load(Ordering::SeqCst) {
            Phase::RetryWait
        } else if self.timer.is_armed() {
            Phase::Armed
        } else {
            Phase::Idle
        }
    }

    /// Cancels the pending timer and any retry sequence.
    pub fn shutdown(&self) {
        self.timer.cancel();
        if let Some(handle) = self
            .retry_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.shared.retry_waiting.store(false, Ordering::SeqCst);
        self.shared.state().retry_attempt = 0;
        debug!("Scheduler shut down");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DelayPolicy {
        DelayPolicy {
            debounce: Duration::from_millis(300),
            reading_view: Duration::from_millis(1_000),
            force_sync: Duration::from_millis(3_000),
            force_sync_reading: Duration::from_millis(100),
        }
    }

    #[test]
    fn force_sync_in_reading_mode_is_short() {
        let delay = policy().select(ScheduleRequest::new(true, true), ViewMode::Reading);
        assert_eq!(delay, Duration::from_millis(100));
    }

    #[test]
    fn force_sync_in_editing_mode_waits_for_persistence() {
        let delay = policy().select(ScheduleRequest::new(true, false), ViewMode::Editing);
        assert_eq!(delay, Duration::from_millis(3_000));
    }

    #[test]
    fn reading_mode_without_live_buffer_uses_reading_delay() {
        let delay = policy().select(ScheduleRequest::new(false, false), ViewMode::Reading);
        assert_eq!(delay, Duration::from_millis(1_000));
    }

    #[test]
    fn reading_mode_with_live_buffer_uses_debounce() {
        let delay = policy().select(ScheduleRequest::new(false, true), ViewMode::Reading);
        assert_eq!(delay, Duration::from_millis(300));
    }

    #[test]
    fn editing_mode_uses_debounce() {
        let delay = policy().select(ScheduleRequest::new(false, false), ViewMode::Editing);
        assert_eq!(delay, Duration::from_millis(300));
        let delay = policy().select(ScheduleRequest::new(false, true), ViewMode::Editing);
        assert_eq!(delay, Duration::from_millis(300));
    }

    #[test]
    fn backoff_grows_linearly() {
        let retry = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(300),
            increment: Duration::from_millis(200),
        };
        assert_eq!(retry.backoff(0), Duration::from_millis(300));
        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(4), Duration::from_millis(1_100));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let retry = RetryPolicy {
            max_attempts: u32::MAX,
            base_delay: Duration::from_millis(300),
            increment: Duration::MAX,
        };
        assert_eq!(retry.backoff(u32::MAX), Duration::MAX);
    }

    #[test]
    fn config_follows_settings() {
        let settings = Settings {
            debounce_time_ms: 50,
            reading_view_delay_ms: 700,
            max_retries: 3,
            change_ttl_ms: 2_000,
            ..Settings::default()
        };
        let config = SchedulerConfig::from(&settings);

        assert_eq!(config.delays.debounce, Duration::from_millis(50));
        assert_eq!(config.delays.reading_view, Duration::from_millis(700));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.change_ttl, Duration::from_millis(2_000));
    }
}
