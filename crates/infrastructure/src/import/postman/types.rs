//! Postman Collection v2.1 and environment type definitions.
//!
//! `#[serde(default)]` is used extensively: exported files vary a lot
//! between Postman versions and anything optional should parse.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Deserialize;

/// Root structure for a Postman Collection v2.1 file.
#[derive(Debug, Clone, Deserialize)]
pub struct PostmanCollection {
    pub info: PostmanInfo,
    #[serde(default)]
    pub item: Vec<PostmanItem>,
    #[serde(default)]
    pub variable: Vec<PostmanVariable>,
    #[serde(default)]
    pub auth: Option<PostmanAuth>,
    #[serde(default)]
    pub event: Vec<PostmanEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanInfo {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
}

/// An item is a folder (carries `item`) or a request (carries `request`).
#[derive(Debug, Clone, Deserialize)]
pub struct PostmanItem {
    pub name: String,
    #[serde(default)]
    pub item: Option<Vec<Self>>,
    #[serde(default)]
    pub request: Option<PostmanRequest>,
    #[serde(default)]
    pub event: Vec<PostmanEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanRequest {
    pub method: String,
    #[serde(default)]
    pub url: PostmanUrl,
    #[serde(default)]
    pub header: Vec<PostmanHeader>,
    #[serde(default)]
    pub body: Option<PostmanBody>,
    #[serde(default)]
    pub auth: Option<PostmanAuth>,
}

/// A URL is either a plain string or a structured object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum PostmanUrl {
    #[default]
    Empty,
    Simple(String),
    Structured(PostmanUrlStructured),
}

impl PostmanUrl {
    /// The raw URL string, templates included.
    #[must_use]
    pub fn raw(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Simple(raw) => raw.clone(),
            Self::Structured(url) => url.raw.clone().unwrap_or_default(),
        }
    }

    /// Structured query rows, when present.
    #[must_use]
    pub fn query_params(&self) -> Vec<PostmanQueryParam> {
        match self {
            Self::Structured(url) => url.query.clone(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostmanUrlStructured {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub query: Vec<PostmanQueryParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanQueryParam {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanHeader {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanBody {
    pub mode: String,
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub urlencoded: Vec<PostmanFormParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanFormParam {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanAuth {
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(default)]
    pub bearer: Vec<PostmanAuthParam>,
}

impl PostmanAuth {
    /// The bearer token parameter, when this is bearer auth.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.bearer
            .iter()
            .find(|p| p.key == "token")
            .and_then(|p| p.value.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanAuthParam {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanVariable {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub disabled: bool,
}

/// An event is a lifecycle hook: `prerequest` or `test`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostmanEvent {
    pub listen: String,
    #[serde(default)]
    pub script: Option<PostmanScript>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanScript {
    #[serde(default)]
    pub exec: Vec<String>,
}

/// An environment export: either a flat `{key: value}` map or the
/// entries shape with a name and a values list. Flat maps are tried
/// first because the entries shape carries non-string fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostmanEnvironmentFile {
    Flat(BTreeMap<String, String>),
    Entries(PostmanEnvironment),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanEnvironment {
    pub name: String,
    #[serde(default)]
    pub values: Vec<PostmanEnvVariable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostmanEnvVariable {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_collection() {
        let json = r#"{
            "info": {
                "name": "Test Collection",
                "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"
            },
            "item": []
        }"#;

        let collection: PostmanCollection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.info.name, "Test Collection");
        assert!(collection.item.is_empty());
    }

    #[test]
    fn test_parse_structured_url() {
        let json = r#"{
            "raw": "https://api.example.com/users?page=1",
            "host": ["api", "example", "com"],
            "path": ["users"],
            "query": [{"key": "page", "value": "1"}]
        }"#;

        let url: PostmanUrlStructured = serde_json::from_str(json).unwrap();
        assert_eq!(
            url.raw.as_deref(),
            Some("https://api.example.com/users?page=1")
        );
        assert_eq!(url.query.len(), 1);
    }

    #[test]
    fn test_parse_bearer_auth() {
        let json = r#"{
            "type": "bearer",
            "bearer": [{"key": "token", "value": "abc123"}]
        }"#;

        let auth: PostmanAuth = serde_json::from_str(json).unwrap();
        assert_eq!(auth.auth_type, "bearer");
        assert_eq!(auth.bearer_token().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_environment_file_shapes() {
        let flat: PostmanEnvironmentFile =
            serde_json::from_str(r#"{"base_url": "https://dev.api.com"}"#).unwrap();
        assert!(matches!(flat, PostmanEnvironmentFile::Flat(_)));

        let entries: PostmanEnvironmentFile = serde_json::from_str(
            r#"{"name": "Development", "values": [{"key": "a", "value": "1"}]}"#,
        )
        .unwrap();
        let PostmanEnvironmentFile::Entries(env) = entries else {
            panic!("expected entries shape");
        };
        assert_eq!(env.name, "Development");
        assert!(env.values[0].enabled);
    }
}
