//! Query parameter types

use serde::{Deserialize, Serialize};

/// A query parameter key-value row.
///
/// Supports enable/disable without deletion for UI convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// The parameter key
    pub key: String,
    /// The parameter value template
    pub value: String,
    /// Whether this parameter is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl QueryParam {
    /// Creates a new enabled query parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled query parameter.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_param_creation() {
        let param = QueryParam::new("page", "1");
        assert_eq!(param.key, "page");
        assert!(param.enabled);
    }

    #[test]
    fn test_disabled_param() {
        let param = QueryParam::disabled("debug", "true");
        assert!(!param.enabled);
    }
}
