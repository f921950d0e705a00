//! Decides which entries of a fresh fetch are new since the last check.

use super::normalize::FeedEntry;

/// How many entries to treat as new when the stored cursor is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPolicy {
    /// Entries delivered on the very first check of a feed.
    pub first_run_take: usize,
    /// Entries delivered when the stored cursor is no longer in the feed.
    pub unmatched_take: usize,
}

impl Default for CursorPolicy {
    fn default() -> Self {
        Self {
            first_run_take: 1,
            unmatched_take: 3,
        }
    }
}

/// Result of comparing a fetch against the stored cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDiff {
    /// New entries, oldest first.
    pub new_entries: Vec<FeedEntry>,
    /// Cursor to persist once delivery is done. `None` only when the fetch
    /// returned no entries, in which case the stored cursor is left alone.
    pub next_cursor: Option<String>,
}

impl FeedDiff {
    /// Whether the stored cursor has to be rewritten.
    pub fn cursor_changed(&self, previous: Option<&str>) -> bool {
        match &self.next_cursor {
            Some(next) => previous != Some(next.as_str()),
            None => false,
        }
    }
}

/// Compute the new entries of `entries` (newest first) given the stored cursor.
///
/// The next cursor is always the newest entry's identifier, whatever the
/// filter later does with the new entries.
pub fn diff(previous: Option<&str>, entries: &[FeedEntry], policy: &CursorPolicy) -> FeedDiff {
    let Some(newest) = entries.first() else {
        return FeedDiff {
            new_entries: Vec::new(),
            next_cursor: previous.map(str::to_string),
        };
    };

    let take = match previous {
        None => policy.first_run_take,
        Some(cursor) => match entries.iter().position(|e| e.guid == cursor) {
            Some(index) => index,
            None => policy.unmatched_take,
        },
    };

    let new_entries = entries
        .iter()
        .take(take)
        .rev()
        .cloned()
        .collect();

    FeedDiff {
        new_entries,
        next_cursor: Some(newest.guid.clone()),
    }
}
