//! HTTP header types.
//!
//! Header names compare case-insensitively but keep the casing of the
//! first insertion, matching what scripts observe through the adapter.

use serde::{Deserialize, Serialize};

/// A single HTTP header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// The header name (e.g., "Content-Type")
    pub name: String,
    /// The header value template (e.g., "application/json")
    pub value: String,
    /// Whether this header row is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Header {
    /// Creates a new enabled header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a new disabled header.
    #[must_use]
    pub fn disabled(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            enabled: false,
        }
    }

    /// Returns true if this header's name matches `name` ignoring case.
    #[must_use]
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// An ordered collection of HTTP headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    items: Vec<Header>,
}

impl Headers {
    /// Creates an empty header collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a header without replacing existing ones of the same name.
    pub fn add(&mut self, header: Header) {
        self.items.push(header);
    }

    /// Sets a header value, replacing any existing entry with the same
    /// name (ignoring case). The stored name keeps the casing of the
    /// first insertion; only the value is replaced.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.items.iter_mut().find(|h| h.name_matches(name)) {
            existing.value = value;
            existing.enabled = true;
        } else {
            self.items.push(Header::new(name, value));
        }
    }

    /// Removes every header whose name matches `name` ignoring case.
    pub fn remove(&mut self, name: &str) {
        self.items.retain(|h| !h.name_matches(name));
    }

    /// Returns the value of the first enabled header matching `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|h| h.enabled && h.name_matches(name))
            .map(|h| h.value.as_str())
    }

    /// Returns true if an enabled header with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns an iterator over enabled headers.
    pub fn enabled(&self) -> impl Iterator<Item = &Header> {
        self.items.iter().filter(|h| h.enabled)
    }

    /// Returns all headers (enabled and disabled).
    #[must_use]
    pub fn all(&self) -> &[Header] {
        &self.items
    }

    /// Returns the number of headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len is not const in stable
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::is_empty is not const in stable
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Header>> for Headers {
    fn from(items: Vec<Header>) -> Self {
        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_creation() {
        let header = Header::new("Content-Type", "application/json");
        assert_eq!(header.name, "Content-Type");
        assert!(header.enabled);
    }

    #[test]
    fn test_set_preserves_first_seen_casing() {
        let mut headers = Headers::new();
        headers.add(Header::new("Content-Type", "text/plain"));
        headers.set("content-type", "application/json");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.all()[0].name, "Content-Type");
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_remove_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.add(Header::new("Authorization", "Bearer x"));
        headers.remove("authorization");
        assert!(headers.is_empty());
    }

    #[test]
    fn test_get_skips_disabled() {
        let mut headers = Headers::new();
        headers.add(Header::disabled("X-Debug", "true"));
        assert_eq!(headers.get("X-Debug"), None);
        assert!(!headers.contains("X-Debug"));
    }

    #[test]
    fn test_enabled_iterator() {
        let mut headers = Headers::new();
        headers.add(Header::new("Accept", "application/json"));
        headers.add(Header::disabled("X-Debug", "true"));
        headers.add(Header::new("User-Agent", "courier"));

        assert_eq!(headers.enabled().count(), 2);
    }
}
