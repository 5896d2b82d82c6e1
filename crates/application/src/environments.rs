//! Environment snapshot persistence.
//!
//! Each environment lives under its own key; switching loads a whole
//! snapshot and never merges.

use std::sync::Arc;

use courier_domain::EnvironmentSet;
use tracing::warn;

use crate::keys;
use crate::ports::KeyValueStore;

/// Load/save for environment snapshots.
pub struct EnvironmentStore {
    kv: Arc<dyn KeyValueStore>,
}

impl EnvironmentStore {
    /// Creates an environment store over the given medium.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Loads the snapshot for `name`, falling back to an empty set of
    /// that name when nothing is stored or the stored value is
    /// unreadable.
    pub async fn load(&self, name: &str) -> EnvironmentSet {
        let key = keys::environment(name);
        match self.kv.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(env) => env,
                Err(e) => {
                    warn!(key, error = %e, "environment decode failed");
                    EnvironmentSet::new(name)
                }
            },
            Ok(None) => EnvironmentSet::new(name),
            Err(e) => {
                warn!(key, error = %e, "environment read failed");
                EnvironmentSet::new(name)
            }
        }
    }

    /// Persists an environment snapshot. Best-effort.
    pub async fn save(&self, environment: &EnvironmentSet) {
        let key = keys::environment(&environment.name);
        match serde_json::to_string(environment) {
            Ok(json) => {
                if let Err(e) = self.kv.set(&key, &json).await {
                    warn!(key, error = %e, "environment write failed");
                }
            }
            Err(e) => warn!(key, error = %e, "environment encode failed"),
        }
    }
}
