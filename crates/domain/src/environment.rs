//! Environment variable sets.
//!
//! Exactly one environment is active at a time; switching is a
//! whole-object swap, never a partial merge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single variable row within an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// Variable key, unique within its scope.
    pub key: String,
    /// Variable value.
    pub value: String,
    /// Disabled entries are invisible to resolution but kept for editing.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl VariableEntry {
    /// Creates a new enabled entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

/// A named, ordered set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSet {
    /// Environment identifier, e.g. "dev".
    pub name: String,
    /// Ordered entries.
    #[serde(default)]
    pub entries: Vec<VariableEntry>,
}

impl EnvironmentSet {
    /// Creates an empty environment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Normalizes a flat `{key: value}` map into the entries shape,
    /// marking every entry enabled.
    #[must_use]
    pub fn from_flat_map(name: impl Into<String>, map: &BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            entries: map
                .iter()
                .map(|(k, v)| VariableEntry::new(k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Returns the value of an enabled entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.enabled && e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Sets a variable, updating an existing entry in place (and
    /// re-enabling it) or appending a new one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.value = value;
            entry.enabled = true;
        } else {
            self.entries.push(VariableEntry::new(key, value));
        }
    }

    /// Removes a variable entirely.
    pub fn unset(&mut self, key: &str) {
        self.entries.retain(|e| e.key != key);
    }

    /// Returns an iterator over enabled entries.
    pub fn enabled(&self) -> impl Iterator<Item = &VariableEntry> {
        self.entries.iter().filter(|e| e.enabled)
    }
}
