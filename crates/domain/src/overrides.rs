//! Per-request override patches and the editable working state they
//! seed.
//!
//! The collection stays read-only; every edit lands in a
//! [`RequestPatch`] keyed by the request's stable id. Absent patch
//! fields fall back to the definition's defaults.

use serde::{Deserialize, Serialize};

use crate::collection::RequestDefinition;
use crate::request::{Header, HttpMethod, QueryParam};
use crate::response::ResponseRecord;

/// Tab-scoped auth override. A non-empty token here wins over the
/// global bearer token during assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOverride {
    /// Bearer token to inject, template-resolvable.
    #[serde(default)]
    pub bearer_token: String,
}

impl AuthOverride {
    /// Returns true if no token is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bearer_token.trim().is_empty()
    }
}

/// A partial patch over a [`RequestDefinition`].
///
/// Lifecycle: created on first edit, updated by shallow merge on every
/// subsequent edit, deleted on explicit reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPatch {
    /// Overridden method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,
    /// Overridden URL template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Overridden query parameter rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<QueryParam>>,
    /// Overridden header rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<Header>>,
    /// Overridden body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Overridden pre-request script source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_script: Option<String>,
    /// Overridden post-response script source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_script: Option<String>,
    /// Tab-scoped auth override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthOverride>,
    /// The last captured response for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseRecord>,
}

impl RequestPatch {
    /// Returns true if the patch overrides nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.url.is_none()
            && self.params.is_none()
            && self.headers.is_none()
            && self.body.is_none()
            && self.pre_script.is_none()
            && self.post_script.is_none()
            && self.auth.is_none()
            && self.response.is_none()
    }

    /// Shallow-merges `other` into `self`: fields present in `other`
    /// replace the corresponding field here, absent fields are kept.
    pub fn merge(&mut self, other: Self) {
        if other.method.is_some() {
            self.method = other.method;
        }
        if other.url.is_some() {
            self.url = other.url;
        }
        if other.params.is_some() {
            self.params = other.params;
        }
        if other.headers.is_some() {
            self.headers = other.headers;
        }
        if other.body.is_some() {
            self.body = other.body;
        }
        if other.pre_script.is_some() {
            self.pre_script = other.pre_script;
        }
        if other.post_script.is_some() {
            self.post_script = other.post_script;
        }
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.response.is_some() {
            self.response = other.response;
        }
    }
}

/// The concrete editable state for one open request: definition
/// defaults with any stored patch applied on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableRequest {
    /// Stable id of the originating definition.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Working method.
    pub method: HttpMethod,
    /// Working URL template.
    pub url: String,
    /// Working query rows.
    pub params: Vec<QueryParam>,
    /// Working header rows.
    pub headers: Vec<Header>,
    /// Working body template.
    pub body: String,
    /// Working pre-request script source.
    pub pre_script: String,
    /// Working post-response script source.
    pub post_script: String,
    /// Working auth override.
    pub auth: AuthOverride,
    /// Last captured response, if any.
    pub last_response: Option<ResponseRecord>,
}

impl EditableRequest {
    /// Seeds editable state from collection defaults alone.
    #[must_use]
    pub fn from_definition(definition: &RequestDefinition) -> Self {
        Self {
            id: definition.stable_id(),
            name: definition.name.clone(),
            method: definition.method,
            url: definition.url.clone(),
            params: definition.params.clone(),
            headers: definition.headers.clone(),
            body: definition.body.clone().unwrap_or_default(),
            pre_script: definition.scripts.pre.clone(),
            post_script: definition.scripts.post.clone(),
            auth: AuthOverride::default(),
            last_response: None,
        }
    }

    /// Applies a stored patch on top of the current state.
    pub fn apply(&mut self, patch: &RequestPatch) {
        if let Some(method) = patch.method {
            self.method = method;
        }
        if let Some(url) = &patch.url {
            self.url.clone_from(url);
        }
        if let Some(params) = &patch.params {
            self.params.clone_from(params);
        }
        if let Some(headers) = &patch.headers {
            self.headers.clone_from(headers);
        }
        if let Some(body) = &patch.body {
            self.body.clone_from(body);
        }
        if let Some(pre) = &patch.pre_script {
            self.pre_script.clone_from(pre);
        }
        if let Some(post) = &patch.post_script {
            self.post_script.clone_from(post);
        }
        if let Some(auth) = &patch.auth {
            self.auth = auth.clone();
        }
        if let Some(response) = &patch.response {
            self.last_response = Some(response.clone());
        }
    }
}
