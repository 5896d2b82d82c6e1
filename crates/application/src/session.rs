//! Session-wide settings: active environment selector and the global
//! bearer token.

use std::sync::Arc;

use tracing::warn;

use crate::keys;
use crate::ports::KeyValueStore;

/// Accessors over the session-scoped keys of the persistence medium.
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Creates a session store over the given medium.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Returns the name of the selected environment, if any.
    pub async fn selected_environment(&self) -> Option<String> {
        match self.kv.get(keys::SELECTED_ENVIRONMENT).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, "selected environment read failed");
                None
            }
        }
    }

    /// Persists the selected environment name.
    pub async fn set_selected_environment(&self, name: &str) {
        if let Err(e) = self.kv.set(keys::SELECTED_ENVIRONMENT, name).await {
            warn!(error = %e, "selected environment write failed");
        }
    }

    /// Returns the global bearer token, if one is set.
    pub async fn global_bearer(&self) -> Option<String> {
        match self.kv.get(keys::GLOBAL_BEARER).await {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(error = %e, "global bearer read failed");
                None
            }
        }
    }

    /// Sets or clears the global bearer token. An empty token removes
    /// the stored value.
    pub async fn set_global_bearer(&self, token: &str) {
        let result = if token.trim().is_empty() {
            self.kv.remove(keys::GLOBAL_BEARER).await
        } else {
            self.kv.set(keys::GLOBAL_BEARER, token).await
        };
        if let Err(e) = result {
            warn!(error = %e, "global bearer write failed");
        }
    }
}
