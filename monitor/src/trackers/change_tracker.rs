//! Change tracker for checkbox toggles made in a rendered view.
//!
//! When a user toggles a checklist item while the host is in reading mode,
//! the host persists the edit asynchronously. The tracker remembers each
//! toggle for a short time so the scheduler can tell whether a persisted read
//! already reflects it.
//!
//! # Keys
//!
//! Entries are keyed by `"<file path>:<item text>"`. Toggling the same text
//! twice overwrites the earlier entry.
//!
//! # Freshness Heuristic
//!
//! Content is considered fresh when it contains every recorded item text for
//! that file as a substring. This is textual containment, not a structural
//! diff: identical text elsewhere in the document reads as fresh, and text the
//! host re-escapes reads as stale until the entry expires.
//!
//! # Example
//!
//! ```
//! use checkbar_monitor::trackers::change_tracker::ChangeTracker;
//!
//! let mut tracker = ChangeTracker::new();
//! tracker.record_change("/notes/todo.md", "buy milk");
//!
//! assert!(tracker.has_unreflected_change("/notes/todo.md", "- [ ] eggs\n"));
//! assert!(!tracker.has_unreflected_change("/notes/todo.md", "- [x] buy milk\n"));
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

/// Default time a recorded change stays relevant.
pub const DEFAULT_CHANGE_TTL_MS: u64 = 10_000;

/// A toggle awaiting confirmation in persisted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    /// File the item belongs to.
    pub file_path: String,
    /// Text of the toggled item.
    pub item_text: String,
    /// When the toggle was observed.
    pub recorded_at: Instant,
}

impl PendingChange {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.recorded_at) > ttl
    }
}

/// Tracks recent toggles until persisted content catches up.
#[derive(Debug)]
pub struct ChangeTracker {
    entries: HashMap<String, PendingChange>,
    ttl: Duration,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    /// Creates a tracker with the default 10 second TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_millis(DEFAULT_CHANGE_TTL_MS))
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Builds the key used for an item.
    #[must_use]
    pub fn key(file_path: &str, item_text: &str) -> String {
        format!("{file_path}:{item_text}")
    }

    /// Records that `item_text` in `file_path` was just toggled.
    ///
    /// Expired entries for every file are purged first.
    pub fn record_change(&mut self, file_path: &str, item_text: &str) {
        self.purge_expired();
        let key = Self::key(file_path, item_text);
        trace!(key = %key, "Recording checkbox change");
        self.entries.insert(
            key,
            PendingChange {
                file_path: file_path.to_string(),
                item_text: item_text.to_string(),
                recorded_at: Instant::now(),
            },
        );
    }

    /// Returns `true` if `content` is missing any live toggle for `file_path`.
    ///
    /// Expired entries met along the way are removed.
    pub fn has_unreflected_change(&mut self, file_path: &str, content: &str) -> bool {
        let prefix = format!("{file_path}:");
        let now = Instant::now();
        let ttl = self.ttl;
        let mut stale = false;

        self.entries.retain(|key, change| {
            if !key.starts_with(&prefix) {
                return true;
            }
            if change.is_expired(now, ttl) {
                debug!(key = %key, "Dropping expired change");
                return false;
            }
            if !content.contains(change.item_text.as_str()) {
                stale = true;
            }
            true
        });

        stale
    }

    /// Forgets every change recorded for `file_path`.
    ///
    /// Called once fresh content for the file has been rendered.
    pub fn confirm(&mut self, file_path: &str) {
        let prefix = format!("{file_path}:");
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(file = %file_path, removed, "Confirmed pending changes");
        }
    }

    /// Removes every expired entry.
    pub fn purge_expired(&mut self) {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, change| !change.is_expired(now, ttl));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired changes");
        }
    }

    /// Returns the entry for a key, if present and not yet purged.
    #[must_use]
    pub fn get(&self, file_path: &str, item_text: &str) -> Option<&PendingChange> {
        self.entries.get(&Self::key(file_path, item_text))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "/vault/daily.md";

    #[tokio::test(start_paused = true)]
    async fn unrecorded_file_is_never_stale() {
        let mut tracker = ChangeTracker::new();
        assert!(!tracker.has_unreflected_change(FILE, ""));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_text_is_stale_until_content_contains_it() {
        let mut tracker = ChangeTracker::new();
        tracker.record_change(FILE, "water plants");

        assert!(tracker.has_unreflected_change(FILE, "- [ ] feed cat\n"));
        assert!(!tracker.has_unreflected_change(FILE, "- [x] water plants\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn any_missing_item_makes_content_stale() {
        let mut tracker = ChangeTracker::new();
        tracker.record_change(FILE, "one");
        tracker.record_change(FILE, "two");

        assert!(tracker.has_unreflected_change(FILE, "- [x] one\n"));
        assert!(!tracker.has_unreflected_change(FILE, "- [x] one\n- [x] two\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn other_files_are_not_consulted() {
        let mut tracker = ChangeTracker::new();
        tracker.record_change("/vault/other.md", "elsewhere");

        assert!(!tracker.has_unreflected_change(FILE, "nothing here"));
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn prefix_match_requires_separator() {
        let mut tracker = ChangeTracker::new();
        tracker.record_change("/vault/daily.md.bak", "item");

        assert!(!tracker.has_unreflected_change(FILE, ""));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut tracker = ChangeTracker::new();
        tracker.record_change(FILE, "stretch");

        tokio::time::advance(Duration::from_millis(9_000)).await;
        assert!(tracker.has_unreflected_change(FILE, ""));

        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert!(!tracker.has_unreflected_change(FILE, ""));
        assert!(tracker.is_empty(), "expired entry should be purged");
    }

    #[tokio::test(start_paused = true)]
    async fn re_recording_refreshes_timestamp() {
        let mut tracker = ChangeTracker::with_ttl(Duration::from_millis(1_000));
        tracker.record_change(FILE, "same");

        tokio::time::advance(Duration::from_millis(800)).await;
        tracker.record_change(FILE, "same");
        tokio::time::advance(Duration::from_millis(800)).await;

        assert_eq!(tracker.len(), 1);
        assert!(tracker.has_unreflected_change(FILE, ""));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_drops_only_that_file() {
        let mut tracker = ChangeTracker::new();
        tracker.record_change(FILE, "a");
        tracker.record_change(FILE, "b");
        tracker.record_change("/vault/other.md", "c");

        tracker.confirm(FILE);

        assert_eq!(tracker.len(), 1);
        assert!(tracker.get(FILE, "a").is_none());
        assert!(tracker.get("/vault/other.md", "c").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_removes_old_entries() {
        let mut tracker = ChangeTracker::with_ttl(Duration::from_millis(100));
        tracker.record_change(FILE, "old");
        tokio::time::advance(Duration::from_millis(60)).await;
        tracker.record_change(FILE, "new");
        tokio::time::advance(Duration::from_millis(60)).await;

        tracker.purge_expired();

        assert_eq!(tracker.len(), 1);
        assert!(tracker.get(FILE, "new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn recording_purges_expired_entries_of_other_files() {
        let mut tracker = ChangeTracker::new();
        for n in 0..100 {
            tracker.record_change(&format!("/vault/note-{n}.md"), "item");
        }
        assert_eq!(tracker.len(), 100);

        tokio::time::advance(Duration::from_secs(3_600)).await;
        tracker.record_change(FILE, "fresh");
        assert!(tracker.has_unreflected_change(FILE, ""));

        assert_eq!(tracker.len(), 1);
        assert!(tracker.get(FILE, "fresh").is_some());
    }

    #[test]
    fn key_joins_path_and_text() {
        assert_eq!(ChangeTracker::key("/a.md", "task"), "/a.md:task");
    }
}
