//! Captured response records.

use serde::{Deserialize, Serialize};

/// Maximum number of bytes of body text retained after capture.
pub const BODY_CLAMP_BYTES: usize = 64 * 1024;

/// Marker appended to a body that exceeded the clamp budget.
pub const TRUNCATION_NOTE: &str = "\n… [response truncated]";

/// The captured result of one dispatch.
///
/// Immutable once captured (the post-response script rewrites the body
/// text before capture, not after). Stored both as the request's last
/// response and inside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// HTTP status code; 0 for synthetic records with no wire status.
    pub status: u16,
    /// Status text, e.g. "OK", "Timeout", "Service Unavailable".
    pub status_text: String,
    /// Response headers in arrival order.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Body text, clamped to [`BODY_CLAMP_BYTES`].
    #[serde(default)]
    pub body: String,
    /// The URL the call was dispatched to.
    pub url: String,
    /// Elapsed wall-clock time in milliseconds.
    pub duration_ms: u64,
    /// True when the body was cut at the clamp budget.
    #[serde(default)]
    pub truncated: bool,
}

impl ResponseRecord {
    /// Synthetic record for a call that exceeded the timeout budget.
    #[must_use]
    pub fn timed_out(url: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: 0,
            status_text: "Timeout".to_string(),
            headers: Vec::new(),
            body: String::new(),
            url: url.into(),
            duration_ms,
            truncated: false,
        }
    }

    /// Synthetic 503-shaped record for a transport-level failure, so
    /// downstream steps treat unreachable endpoints uniformly.
    #[must_use]
    pub fn unreachable(url: impl Into<String>, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            headers: Vec::new(),
            body: message.into(),
            url: url.into(),
            duration_ms,
            truncated: false,
        }
    }

    /// Synthetic zero-duration record for a pre-request script error
    /// that aborted the send.
    #[must_use]
    pub fn script_aborted(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: 0,
            status_text: "Script Error".to_string(),
            headers: Vec::new(),
            body: message.into(),
            url: url.into(),
            duration_ms: 0,
            truncated: false,
        }
    }

    /// Clamps the body to the fixed budget, appending a truncation note
    /// when anything was cut. Bodies under the budget are kept verbatim.
    pub fn clamp_body(&mut self) {
        if self.body.len() <= BODY_CLAMP_BYTES {
            return;
        }
        let mut cut = BODY_CLAMP_BYTES;
        while !self.body.is_char_boundary(cut) {
            cut -= 1;
        }
        self.body.truncate(cut);
        self.body.push_str(TRUNCATION_NOTE);
        self.truncated = true;
    }

    /// Returns true when the status code is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}
