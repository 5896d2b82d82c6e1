//! Maps parsed Postman files onto the collection and environment model.
//!
//! Folders flatten depth-first into each request's folder path; an
//! optional organizational prefix is stripped from folder names on the
//! way. Requests with an unsupported method are skipped with a warning
//! rather than failing the whole import.

use std::collections::BTreeMap;

use courier_domain::{
    CollectionSpec, DeclaredAuth, DomainError, EnvironmentSet, Header, HttpMethod, QueryParam,
    RequestDefinition, RequestScripts, strip_folder_prefix,
};
use thiserror::Error;
use tracing::warn;

use super::types::{
    PostmanAuth, PostmanBody, PostmanCollection, PostmanEnvironmentFile, PostmanEvent,
    PostmanItem, PostmanRequest,
};

/// Import failures.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The file parsed but is not a recognized Postman shape.
    #[error("invalid Postman format: {0}")]
    InvalidFormat(String),
}

/// Imports a Postman Collection v2.1 file.
///
/// `folder_prefix`, when given, is stripped from folder display names
/// (e.g. `"Gateway / Orders"` becomes `"Orders"`).
///
/// # Errors
///
/// Returns [`ImportError::InvalidJson`] when the content is not JSON,
/// [`ImportError::InvalidFormat`] when it is not a collection.
pub fn import_collection(
    content: &str,
    folder_prefix: Option<&str>,
) -> Result<CollectionSpec, ImportError> {
    let json: serde_json::Value =
        serde_json::from_str(content).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    if json.get("info").is_none() {
        return Err(ImportError::InvalidFormat(
            "missing collection info block".to_string(),
        ));
    }
    let collection: PostmanCollection =
        serde_json::from_value(json).map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

    let variables: BTreeMap<String, String> = collection
        .variable
        .iter()
        .filter(|v| !v.disabled)
        .map(|v| (v.key.clone(), v.value.clone().unwrap_or_default()))
        .collect();

    let mut requests = Vec::new();
    let mut path = Vec::new();
    flatten_items(
        &collection.item,
        &mut path,
        folder_prefix,
        collection.auth.as_ref(),
        &mut requests,
    );

    Ok(CollectionSpec {
        name: collection.info.name,
        variables,
        scripts: scripts_from_events(&collection.event),
        requests,
    })
}

/// Imports a Postman environment export: the entries shape or a flat
/// `{key: value}` map. Flat maps take their name from `fallback_name`.
///
/// # Errors
///
/// Returns [`ImportError::InvalidJson`] when the content fits neither
/// shape.
pub fn import_environment(
    content: &str,
    fallback_name: &str,
) -> Result<EnvironmentSet, ImportError> {
    let file: PostmanEnvironmentFile =
        serde_json::from_str(content).map_err(|e| ImportError::InvalidJson(e.to_string()))?;

    Ok(match file {
        PostmanEnvironmentFile::Flat(map) => EnvironmentSet::from_flat_map(fallback_name, &map),
        PostmanEnvironmentFile::Entries(env) => {
            let mut set = EnvironmentSet::new(env.name);
            for variable in env.values {
                set.entries.push(courier_domain::VariableEntry {
                    key: variable.key,
                    value: variable.value,
                    enabled: variable.enabled,
                });
            }
            set
        }
    })
}

fn flatten_items(
    items: &[PostmanItem],
    path: &mut Vec<String>,
    folder_prefix: Option<&str>,
    inherited_auth: Option<&PostmanAuth>,
    out: &mut Vec<RequestDefinition>,
) {
    for item in items {
        if let Some(children) = &item.item {
            let name = folder_prefix
                .map_or_else(|| item.name.clone(), |p| strip_folder_prefix(&item.name, p));
            path.push(name);
            flatten_items(children, path, folder_prefix, inherited_auth, out);
            path.pop();
        } else if let Some(request) = &item.request {
            match map_request(item, request, path, inherited_auth) {
                Ok(definition) => out.push(definition),
                Err(reason) => warn!(name = %item.name, %reason, "skipping request"),
            }
        }
    }
}

fn map_request(
    item: &PostmanItem,
    request: &PostmanRequest,
    path: &[String],
    inherited_auth: Option<&PostmanAuth>,
) -> Result<RequestDefinition, String> {
    let method: HttpMethod = request
        .method
        .parse()
        .map_err(|e: DomainError| e.to_string())?;

    let params = request
        .url
        .query_params()
        .into_iter()
        .map(|q| QueryParam {
            key: q.key,
            value: q.value.unwrap_or_default(),
            enabled: !q.disabled,
        })
        .collect();

    let headers = request
        .header
        .iter()
        .map(|h| Header {
            name: h.key.clone(),
            value: h.value.clone(),
            enabled: !h.disabled,
        })
        .collect();

    // The request's own auth wins over collection-level auth.
    let auth = request
        .auth
        .as_ref()
        .or(inherited_auth)
        .and_then(declared_auth);

    Ok(RequestDefinition {
        folder_path: path.to_vec(),
        name: item.name.clone(),
        method,
        url: request.url.raw(),
        params,
        headers,
        body: request.body.as_ref().and_then(body_text),
        auth,
        scripts: scripts_from_events(&item.event),
    })
}

fn declared_auth(auth: &PostmanAuth) -> Option<DeclaredAuth> {
    if auth.auth_type != "bearer" {
        return None;
    }
    auth.bearer_token().map(|token| DeclaredAuth::Bearer { token })
}

fn body_text(body: &PostmanBody) -> Option<String> {
    match body.mode.as_str() {
        "raw" => body.raw.clone().filter(|raw| !raw.trim().is_empty()),
        "urlencoded" => {
            let pairs: Vec<String> = body
                .urlencoded
                .iter()
                .filter(|p| !p.disabled)
                .map(|p| format!("{}={}", p.key, p.value.clone().unwrap_or_default()))
                .collect();
            (!pairs.is_empty()).then(|| pairs.join("&"))
        }
        _ => None,
    }
}

fn scripts_from_events(events: &[PostmanEvent]) -> RequestScripts {
    let mut scripts = RequestScripts::default();
    for event in events {
        let Some(script) = &event.script else {
            continue;
        };
        let source = script.exec.join("\n");
        if source.trim().is_empty() {
            continue;
        }
        match event.listen.as_str() {
            "prerequest" => scripts.pre = source,
            "test" => scripts.post = source,
            _ => {}
        }
    }
    scripts
}
