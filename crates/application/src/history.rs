//! History ring persistence.

use std::sync::Arc;

use courier_domain::{HistoryEntry, RequestHistory};
use tracing::warn;

use crate::keys;
use crate::ports::KeyValueStore;

/// Load/append/clear for the bounded history ring.
pub struct HistoryStore {
    kv: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    /// Creates a history store over the given medium.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Loads the stored ring, falling back to empty when nothing is
    /// stored or the stored value is unreadable.
    pub async fn load(&self) -> RequestHistory {
        match self.kv.get(keys::HISTORY).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(history) => history,
                Err(e) => {
                    warn!(error = %e, "history decode failed");
                    RequestHistory::new()
                }
            },
            Ok(None) => RequestHistory::new(),
            Err(e) => {
                warn!(error = %e, "history read failed");
                RequestHistory::new()
            }
        }
    }

    /// Appends one entry at the front of the ring and persists it.
    /// Capacity eviction happens inside the ring itself.
    pub async fn append(&self, entry: HistoryEntry) {
        let mut history = self.load().await;
        history.add(entry);
        self.persist(&history).await;
    }

    /// Clears the stored ring.
    pub async fn clear(&self) {
        if let Err(e) = self.kv.remove(keys::HISTORY).await {
            warn!(error = %e, "history delete failed");
        }
    }

    async fn persist(&self, history: &RequestHistory) {
        match serde_json::to_string(history) {
            Ok(json) => {
                if let Err(e) = self.kv.set(keys::HISTORY, &json).await {
                    warn!(error = %e, "history write failed");
                }
            }
            Err(e) => warn!(error = %e, "history encode failed"),
        }
    }
}
