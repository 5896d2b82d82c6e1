//! Collection model: the read-only request definitions a workbench
//! session starts from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::{Header, HttpMethod, QueryParam};
use crate::scripting::RequestScripts;

/// Authentication declared on a request inside the collection file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeclaredAuth {
    /// Bearer token auth; the token itself may contain `{{ }}` templates.
    Bearer {
        /// The declared token template.
        token: String,
    },
}

/// A single request as declared in the collection. Read-only: edits are
/// recorded as [`crate::overrides::RequestPatch`] entries, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDefinition {
    /// Folder path from the collection root, outermost first.
    #[serde(default)]
    pub folder_path: Vec<String>,
    /// Display name.
    pub name: String,
    /// HTTP method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Raw URL template, query string and fragment included.
    pub url: String,
    /// Ordered query parameter templates.
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Ordered header templates.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Body template, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Auth declared in the collection file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<DeclaredAuth>,
    /// Scripts extracted from the declared lifecycle events.
    #[serde(default, skip_serializing_if = "RequestScripts::is_empty")]
    pub scripts: RequestScripts,
}

impl RequestDefinition {
    /// Derives the stable identity of this request.
    ///
    /// The identity is a pure function of folder path, method and raw
    /// URL, so overrides and history entries keyed by it survive a
    /// collection reload.
    #[must_use]
    pub fn stable_id(&self) -> String {
        format!(
            "{}_{}_{}",
            self.folder_path.join("/"),
            self.method.as_str(),
            self.url
        )
    }
}

/// A parsed collection: declared variables, an optional collection-level
/// script pair, and the flattened list of request definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    /// Collection display name.
    pub name: String,
    /// Collection-scoped variable defaults (lowest resolution precedence).
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Collection-level scripts, run ahead of each request's own.
    #[serde(default, skip_serializing_if = "RequestScripts::is_empty")]
    pub scripts: RequestScripts,
    /// All requests, depth-first in declaration order.
    #[serde(default)]
    pub requests: Vec<RequestDefinition>,
}

impl CollectionSpec {
    /// Looks up a request by display name.
    #[must_use]
    pub fn request_by_name(&self, name: &str) -> Option<&RequestDefinition> {
        self.requests.iter().find(|r| r.name == name)
    }

    /// Looks up a request by stable id.
    #[must_use]
    pub fn request_by_id(&self, id: &str) -> Option<&RequestDefinition> {
        self.requests.iter().find(|r| r.stable_id() == id)
    }
}

/// Strips an organizational prefix (e.g. `"Gateway"`) plus any
/// separating `/` from a folder display name. Names without the prefix
/// are returned unchanged.
#[must_use]
pub fn strip_folder_prefix(name: &str, prefix: &str) -> String {
    let Some(rest) = name.strip_prefix(prefix) else {
        return name.to_string();
    };
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    rest.trim_start().to_string()
}
