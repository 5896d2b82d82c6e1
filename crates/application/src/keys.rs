//! Deterministic keys into the persistence medium.
//!
//! Every persisted shape lives under its own key so any opaque
//! key-value store can back the engine.

/// Key for the active environment selector.
pub const SELECTED_ENVIRONMENT: &str = "selected_env";

/// Key for the global bearer token.
pub const GLOBAL_BEARER: &str = "global_bearer";

/// Key for the history ring.
pub const HISTORY: &str = "req_history";

/// Key for one request's override patch.
#[must_use]
pub fn request_patch(id: &str) -> String {
    format!("req_{id}")
}

/// Key for one environment snapshot.
#[must_use]
pub fn environment(name: &str) -> String {
    format!("env_{name}")
}
