//! Request assembly pipeline.
//!
//! Turns edited template state into the final outbound request: query
//! build, header build, auth injection, content-type detection and body
//! resolution. Dispatch rules (GET/HEAD body suppression) apply at send
//! time, after scripts have had their chance to mutate the request.

use courier_domain::{DeclaredAuth, EditableRequest, Header, Headers, HttpMethod, QueryParam};
use regex::Regex;
use url::form_urlencoded;

use crate::variables::VariableStore;

/// The composed request handed to the pre-script and then dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Final absolute URL, query string and fragment included.
    pub url: String,
    /// Final header rows.
    pub headers: Headers,
    /// Resolved body text, if a body template was present.
    pub body: Option<String>,
}

/// Composes the final outbound request from edited state.
#[must_use]
pub fn assemble(
    editable: &EditableRequest,
    vars: &VariableStore,
    global_bearer: Option<&str>,
    declared_auth: Option<&DeclaredAuth>,
) -> AssembledRequest {
    let url = build_url(&editable.url, &editable.params, vars);

    let mut headers: Headers = editable
        .headers
        .iter()
        .filter(|h| h.enabled)
        .map(|h| Header::new(h.name.clone(), vars.resolve(&h.value, None)))
        .collect();

    if !headers.contains("Authorization") {
        if let Some(token) = bearer_token(editable, vars, global_bearer, declared_auth) {
            headers.add(Header::new("Authorization", format!("Bearer {token}")));
        }
    }

    let body = if editable.body.trim().is_empty() {
        None
    } else {
        Some(vars.resolve(&editable.body, None))
    };

    if let Some(body) = &body {
        if !headers.contains("Content-Type") {
            if let Some(content_type) = detect_content_type(body) {
                headers.add(Header::new("Content-Type", content_type));
            }
        }
    }

    AssembledRequest {
        method: editable.method,
        url,
        headers,
        body,
    }
}

/// Picks the bearer token to inject: the request-tab override wins over
/// the global token, which wins over auth declared in the collection.
fn bearer_token(
    editable: &EditableRequest,
    vars: &VariableStore,
    global_bearer: Option<&str>,
    declared_auth: Option<&DeclaredAuth>,
) -> Option<String> {
    if !editable.auth.is_empty() {
        return Some(vars.resolve(&editable.auth.bearer_token, None));
    }
    if let Some(token) = global_bearer {
        if !token.trim().is_empty() {
            return Some(vars.resolve(token, None));
        }
    }
    match declared_auth {
        Some(DeclaredAuth::Bearer { token }) if !token.trim().is_empty() => {
            Some(vars.resolve(token, None))
        }
        _ => None,
    }
}

/// Builds the final URL: resolves the template, then overlays enabled
/// parameter rows onto any query string already present, percent-encodes
/// keys and values, and preserves the fragment. Disabled rows delete a
/// matching key from the existing query.
#[must_use]
pub fn build_url(url_template: &str, params: &[QueryParam], vars: &VariableStore) -> String {
    let resolved = vars.resolve(url_template, None);

    let (without_fragment, fragment) = match resolved.split_once('#') {
        Some((head, frag)) => (head.to_string(), Some(frag.to_string())),
        None => (resolved, None),
    };
    let (base, existing_query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base.to_string(), query.to_string()),
        None => (without_fragment, String::new()),
    };

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(existing_query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    for param in params {
        let key = param.key.trim();
        if key.is_empty() {
            continue;
        }
        if param.enabled {
            let value = vars.resolve(&param.value, None);
            if let Some(position) = pairs.iter().position(|(k, _)| k == key) {
                pairs[position].1 = value;
                // Drop any duplicate occurrences beyond the first.
                let mut seen = false;
                pairs.retain(|(k, _)| {
                    if k == key {
                        if seen {
                            return false;
                        }
                        seen = true;
                    }
                    true
                });
            } else {
                pairs.push((key.to_string(), value));
            }
        } else {
            pairs.retain(|(k, _)| k != key);
        }
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&pairs)
        .finish();

    let mut result = base;
    if !query.is_empty() {
        result.push('?');
        result.push_str(&query);
    }
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(&fragment);
    }
    result
}

/// Sniffs a content type from the body shape. Returns `None` when no
/// confident match exists, in which case nothing is injected.
#[must_use]
pub fn detect_content_type(body: &str) -> Option<&'static str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if serde_json::from_str::<serde_json::Value>(trimmed).is_ok() {
        return Some("application/json");
    }

    let form_shape = r"^[^=\s&]+=[^=&]*(?:&[^=\s&]+=[^=&]*)*$";
    if Regex::new(form_shape).is_ok_and(|re| re.is_match(trimmed)) {
        return Some("application/x-www-form-urlencoded");
    }

    let boundary_shape = r"^--?[-\w]+";
    if Regex::new(boundary_shape).is_ok_and(|re| re.is_match(trimmed))
        && trimmed.to_lowercase().contains("content-disposition")
    {
        return Some("multipart/form-data");
    }

    None
}
