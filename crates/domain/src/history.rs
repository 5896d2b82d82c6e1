//! Bounded request history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::HttpMethod;
use crate::response::ResponseRecord;

/// Maximum number of entries the history ring retains.
pub const HISTORY_CAPACITY: usize = 50;

/// A single entry in the request history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier for this entry.
    pub id: String,
    /// When the request was dispatched.
    pub timestamp: DateTime<Utc>,
    /// HTTP method used.
    pub method: HttpMethod,
    /// The final URL the call went out to.
    pub url: String,
    /// Body sent, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// The captured (possibly synthetic) response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseRecord>,
    /// Display name of the originating request, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_name: Option<String>,
}

impl HistoryEntry {
    /// Creates a new entry stamped with the current time.
    #[must_use]
    pub fn new(
        method: HttpMethod,
        url: impl Into<String>,
        body: Option<String>,
        response: Option<ResponseRecord>,
        request_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            method,
            url: url.into(),
            body,
            response,
            request_name,
        }
    }

    /// Returns true if the entry matches a case-insensitive substring
    /// filter over method, URL and status code.
    #[must_use]
    pub fn matches(&self, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        let filter = filter.to_lowercase();
        if self.method.as_str().to_lowercase().contains(&filter) {
            return true;
        }
        if self.url.to_lowercase().contains(&filter) {
            return true;
        }
        self.response
            .as_ref()
            .is_some_and(|r| r.status.to_string().contains(&filter))
    }

    /// Returns a human-readable "time ago" string.
    #[must_use]
    pub fn time_ago(&self) -> String {
        let duration = Utc::now().signed_duration_since(self.timestamp);

        if duration.num_seconds() < 60 {
            "just now".to_string()
        } else if duration.num_minutes() < 60 {
            let mins = duration.num_minutes();
            format!("{mins}m ago")
        } else if duration.num_hours() < 24 {
            let hours = duration.num_hours();
            format!("{hours}h ago")
        } else if duration.num_days() < 7 {
            let days = duration.num_days();
            format!("{days}d ago")
        } else {
            self.timestamp.format("%Y-%m-%d").to_string()
        }
    }

    /// Returns the response duration as a display string.
    #[must_use]
    pub fn duration_display(&self) -> String {
        match self.response.as_ref().map(|r| r.duration_ms) {
            Some(ms) if ms < 1000 => format!("{ms}ms"),
            #[allow(clippy::cast_precision_loss)]
            Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
            None => "-".to_string(),
        }
    }
}

/// Request history, most-recent-first, bounded at [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestHistory {
    entries: VecDeque<HistoryEntry>,
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Adds an entry at the front, evicting the oldest beyond capacity.
    pub fn add(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_back();
        }
    }

    /// Returns all entries, newest first.
    #[must_use]
    pub fn entries(&self) -> &VecDeque<HistoryEntry> {
        &self.entries
    }

    /// Returns entries matching a substring filter, newest first.
    pub fn filtered<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a HistoryEntry> {
        self.entries.iter().filter(move |e| e.matches(filter))
    }

    /// Clears all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
