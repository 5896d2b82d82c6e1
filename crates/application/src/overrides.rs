//! Request override store.
//!
//! Edits never touch the collection; they accumulate as per-request
//! patches persisted under deterministic keys. Writes are coalesced
//! over a short quiet window, with a guaranteed flush before any send
//! and before an explicit clear.

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_domain::{EditableRequest, RequestDefinition, RequestPatch};
use tracing::warn;

use crate::keys;
use crate::ports::KeyValueStore;

/// Quiet window over which consecutive saves coalesce.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(180);

struct PendingWrite {
    id: String,
    patch: RequestPatch,
    last_edit: Instant,
}

/// Load/save/clear for per-request override patches, with a debounced
/// pending write.
pub struct OverrideStore {
    kv: Arc<dyn KeyValueStore>,
    pending: Option<PendingWrite>,
}

impl OverrideStore {
    /// Creates a store over the given persistence medium.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv, pending: None }
    }

    /// Loads the effective patch for a request: the stored patch with
    /// any still-pending edits merged on top. Returns `None` when
    /// nothing is stored and nothing is pending.
    pub async fn load(&self, id: &str) -> Option<RequestPatch> {
        let stored = self.load_stored(id).await;
        let pending = self
            .pending
            .as_ref()
            .filter(|p| p.id == id)
            .map(|p| p.patch.clone());

        match (stored, pending) {
            (Some(mut base), Some(edits)) => {
                base.merge(edits);
                Some(base)
            }
            (Some(base), None) => Some(base),
            (None, Some(edits)) => Some(edits),
            (None, None) => None,
        }
    }

    /// Records a partial patch. Consecutive saves for the same request
    /// merge into one pending write; a save for a different request
    /// flushes the previous one first.
    pub async fn save(&mut self, id: &str, partial: RequestPatch) {
        match &mut self.pending {
            Some(pending) if pending.id == id => {
                pending.patch.merge(partial);
                pending.last_edit = Instant::now();
            }
            Some(_) => {
                self.flush().await;
                self.start_pending(id, partial);
            }
            None => self.start_pending(id, partial),
        }
    }

    fn start_pending(&mut self, id: &str, patch: RequestPatch) {
        self.pending = Some(PendingWrite {
            id: id.to_string(),
            patch,
            last_edit: Instant::now(),
        });
    }

    /// Flushes the pending write if its quiet window has elapsed.
    /// Callers drive this from their idle loop.
    pub async fn tick(&mut self) {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|p| p.last_edit.elapsed() >= DEBOUNCE_WINDOW);
        if due {
            self.flush().await;
        }
    }

    /// Writes any pending patch out immediately. Guaranteed to be
    /// called before a send is dispatched and before `clear`.
    pub async fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let mut merged = self.load_stored(&pending.id).await.unwrap_or_default();
        merged.merge(pending.patch);

        match serde_json::to_string(&merged) {
            Ok(json) => {
                let key = keys::request_patch(&pending.id);
                if let Err(e) = self.kv.set(&key, &json).await {
                    warn!(key, error = %e, "override patch write failed");
                }
            }
            Err(e) => warn!(id = pending.id, error = %e, "override patch encode failed"),
        }
    }

    /// Deletes the stored patch (and any pending edits) for a request.
    pub async fn clear(&mut self, id: &str) {
        if self.pending.as_ref().is_some_and(|p| p.id == id) {
            self.pending = None;
        }
        let key = keys::request_patch(id);
        if let Err(e) = self.kv.remove(&key).await {
            warn!(key, error = %e, "override patch delete failed");
        }
    }

    /// Seeds editable state for a request: collection defaults with the
    /// stored patch applied on top, unless `force_defaults` ignores the
    /// patch (used to re-seed after global settings change without
    /// discarding the stored override).
    pub async fn initial_state(
        &self,
        definition: &RequestDefinition,
        force_defaults: bool,
    ) -> EditableRequest {
        let mut editable = EditableRequest::from_definition(definition);
        if !force_defaults {
            if let Some(patch) = self.load(&definition.stable_id()).await {
                editable.apply(&patch);
            }
        }
        editable
    }

    async fn load_stored(&self, id: &str) -> Option<RequestPatch> {
        let key = keys::request_patch(id);
        match self.kv.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(patch) => Some(patch),
                Err(e) => {
                    warn!(key, error = %e, "override patch decode failed");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "override patch read failed");
                None
            }
        }
    }
}
