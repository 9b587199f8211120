//! Checklist scanner.
//!
//! Counts markdown checklist lines in a document and how many of them are
//! complete.
//!
//! # Checklist Line Format
//!
//! ```text
//! - [ ] open item
//!   * [x] done item
//! + [/] in progress (counted as complete)
//! - [x](https://example.com)   <- link syntax, not counted
//! ```
//!
//! A line counts when it has optional leading spaces or tabs, a `-`, `*` or
//! `+` bullet, one space, and a bracketed marker that is not immediately
//! followed by `(`.
//!
//! # Markers
//!
//! | Marker | Meaning | Counted as |
//! |--------|---------|------------|
//! | ` ` | open | incomplete |
//! | `x`, `X` | done | complete |
//! | `#`, `-`, `/`, `>` | cancelled, in progress, deferred | complete |
//!
//! The aggregate is a binary reduction: anything that is not a plain space
//! counts toward `completed`.
//!
//! # Example
//!
//! ```
//! use checkbar_monitor::scanner::scan_tasks;
//!
//! let counts = scan_tasks("- [ ] a\n- [x] b\n- [/] c\n");
//! assert_eq!(counts.total, 3);
//! assert_eq!(counts.completed, 2);
//! ```

use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, trace};

use crate::types::TaskCount;

/// Pattern for a checklist line. The `(` exclusion is checked after matching
/// because the regex engine has no lookahead.
const CHECKLIST_PATTERN: &str = r"(?m)^[ \t]*[-*+] \[([ xX#\-/>])\]";

/// Marker for an open item.
const OPEN_MARKER: &str = " ";

fn checklist_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(CHECKLIST_PATTERN) {
        Ok(re) => Some(re),
        Err(e) => {
            error!(error = %e, "Failed to build checklist pattern");
            None
        }
    })
    .as_ref()
}

/// Counts checklist lines in `text`.
///
/// Never fails: if the pattern cannot be built the failure is logged and an
/// empty count is returned.
#[must_use]
pub fn scan_tasks(text: &str) -> TaskCount {
    let Some(re) = checklist_regex() else {
        return TaskCount::EMPTY;
    };

    let mut counts = TaskCount::default();

    for caps in re.captures_iter(text) {
        let (Some(whole), Some(marker)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if text[whole.end()..].starts_with('(') {
            trace!(offset = whole.start(), "Skipping link-style bracket");
            continue;
        }

        counts.total += 1;
        if marker.as_str() != OPEN_MARKER {
            counts.completed += 1;
        }
    }

    counts
}
