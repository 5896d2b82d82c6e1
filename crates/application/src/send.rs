//! Send orchestration.
//!
//! One send walks a fixed pipeline: flush pending edits, assemble the
//! outbound request, run the pre-request script, dispatch under the
//! timeout budget, run the post-response script, clamp and capture the
//! record, persist it and append history. Every branch, including the
//! failed ones, ends in a response record so downstream handling has
//! one shape.

use std::time::{Duration, Instant};

use courier_domain::{
    DeclaredAuth, EditableRequest, FailureKind, HistoryEntry, HttpMethod, RequestPatch,
    RequestScripts, ResponseRecord, SendState,
};
use tokio::time::timeout;
use tracing::debug;

use crate::environments::EnvironmentStore;
use crate::history::HistoryStore;
use crate::overrides::OverrideStore;
use crate::pipeline;
use crate::ports::{HttpClient, HttpClientError, OutboundRequest};
use crate::scripting::{ScriptContext, ScriptExecutor};
use crate::variables::VariableStore;

/// Wall-clock budget for one dispatch. Script sub-calls run under the
/// same budget.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// What one send produced: the terminal state plus everything the
/// scripts logged along the way, pre and post in order.
#[derive(Debug)]
pub struct SendOutcome {
    /// Terminal send state; always carries a response record.
    pub state: SendState,
    /// Script log lines.
    pub logs: Vec<String>,
}

/// One-send orchestrator over the injected ports and stores.
pub struct SendRequest<'a> {
    client: &'a dyn HttpClient,
    overrides: &'a mut OverrideStore,
    environments: &'a EnvironmentStore,
    history: &'a HistoryStore,
}

/// Everything a finished dispatch hands to capture.
struct Dispatch {
    method: HttpMethod,
    body: Option<String>,
    record: ResponseRecord,
    failure: Option<FailureKind>,
    logs: Vec<String>,
}

impl<'a> SendRequest<'a> {
    /// Wires the orchestrator to its ports and stores.
    pub fn new(
        client: &'a dyn HttpClient,
        overrides: &'a mut OverrideStore,
        environments: &'a EnvironmentStore,
        history: &'a HistoryStore,
    ) -> Self {
        Self {
            client,
            overrides,
            environments,
            history,
        }
    }

    /// Runs one send end to end and returns the outcome.
    ///
    /// `collection_scripts` are the collection-level hooks; they run
    /// before the request's own scripts in the same context. A
    /// pre-request script error aborts the send with a synthetic
    /// zero-duration record; a post-response script error is logged and
    /// never fails the send.
    pub async fn execute(
        &mut self,
        editable: &EditableRequest,
        collection_scripts: &RequestScripts,
        declared_auth: Option<&DeclaredAuth>,
        vars: &mut VariableStore,
        global_bearer: Option<&str>,
    ) -> SendOutcome {
        // Pending edits must hit storage before the dispatch snapshot.
        self.overrides.flush().await;

        let assembled = pipeline::assemble(editable, vars, global_bearer, declared_auth);
        let mut ctx = ScriptContext::for_request(&assembled);

        let pre = concat_scripts(&collection_scripts.pre, &editable.pre_script);
        {
            let mut executor = ScriptExecutor::new(vars, self.client);
            if let Err(e) = executor.run(&pre, &mut ctx).await {
                let record = ResponseRecord::script_aborted(&ctx.url, e.to_string());
                let dispatch = Dispatch {
                    method: ctx.method,
                    body: None,
                    record,
                    failure: Some(FailureKind::ScriptAborted),
                    logs: ctx.logs,
                };
                return self.finalize(editable, vars, dispatch).await;
            }
        }

        // Scripts may have rewritten the URL or appended templated
        // parts, so resolve the working state once more.
        let url = vars.resolve(&ctx.url, None);
        let method = ctx.method;
        let headers: Vec<(String, String)> = ctx
            .headers
            .enabled()
            .map(|h| (h.name.clone(), vars.resolve(&h.value, None)))
            .collect();
        let body = if method.allows_body() && !ctx.body.trim().is_empty() {
            Some(vars.resolve(&ctx.body, None))
        } else {
            None
        };
        debug!(method = %method, url = %url, "dispatching");
        let outbound = OutboundRequest {
            method,
            url: url.clone(),
            headers,
            body: body.clone(),
        };

        let started = Instant::now();
        let (record, failure) = match timeout(REQUEST_TIMEOUT, self.client.execute(outbound)).await
        {
            Ok(Ok(response)) => (
                ResponseRecord {
                    status: response.status,
                    status_text: response.status_text,
                    headers: response.headers,
                    body: response.body,
                    url: url.clone(),
                    duration_ms: response.duration_ms,
                    truncated: false,
                },
                None,
            ),
            Ok(Err(HttpClientError::Timeout)) | Err(_) => (
                ResponseRecord::timed_out(&url, elapsed_ms(started)),
                Some(FailureKind::Timeout),
            ),
            Ok(Err(e)) => (
                ResponseRecord::unreachable(&url, e.to_string(), elapsed_ms(started)),
                Some(FailureKind::Network),
            ),
        };

        // Post-response scripts run even over synthetic records, so a
        // timeout still produces its logs and variable writes.
        ctx.url = url;
        ctx.response = Some(record);
        let post = concat_scripts(&collection_scripts.post, &editable.post_script);
        {
            let mut executor = ScriptExecutor::new(vars, self.client);
            if let Err(e) = executor.run(&post, &mut ctx).await {
                ctx.logs.push(format!("Post-response script error: {e}"));
            }
        }
        let record = ctx
            .response
            .take()
            .unwrap_or_else(|| ResponseRecord::unreachable(&ctx.url, "response lost", 0));

        let dispatch = Dispatch {
            method,
            body,
            record,
            failure,
            logs: ctx.logs,
        };
        self.finalize(editable, vars, dispatch).await
    }

    /// Clamps, persists and records one finished dispatch.
    async fn finalize(
        &mut self,
        editable: &EditableRequest,
        vars: &VariableStore,
        dispatch: Dispatch,
    ) -> SendOutcome {
        let Dispatch {
            method,
            body,
            mut record,
            failure,
            logs,
        } = dispatch;
        record.clamp_body();

        let patch = RequestPatch {
            response: Some(record.clone()),
            ..Default::default()
        };
        self.overrides.save(&editable.id, patch).await;
        self.overrides.flush().await;

        // Script writes into the environment survive restarts.
        self.environments.save(vars.environment()).await;

        self.history
            .append(HistoryEntry::new(
                method,
                record.url.clone(),
                body,
                Some(record.clone()),
                Some(editable.name.clone()),
            ))
            .await;

        let state = match failure {
            None => SendState::succeeded(record),
            Some(kind) => SendState::failed(kind, record),
        };
        SendOutcome { state, logs }
    }
}

/// Joins the collection-level and request-level script sources into one
/// unit sharing a single context.
fn concat_scripts(collection: &str, request: &str) -> String {
    match (collection.trim().is_empty(), request.trim().is_empty()) {
        (true, true) => String::new(),
        (true, false) => request.to_string(),
        (false, true) => collection.to_string(),
        (false, false) => format!("{collection}\n{request}"),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::{KeyValueStore, OutboundResponse, StorageError};
    use async_trait::async_trait;
    use courier_domain::{EnvironmentSet, FailureKind};
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryStore {
        data: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubClient {
        responses: Mutex<VecDeque<Result<OutboundResponse, HttpClientError>>>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl StubClient {
        fn respond_with(response: Result<OutboundResponse, HttpClientError>) -> Self {
            let client = Self::default();
            client.responses.lock().unwrap().push_back(response);
            client
        }

        fn ok(status: u16, body: &str) -> Self {
            Self::respond_with(Ok(OutboundResponse {
                status,
                status_text: "OK".to_string(),
                headers: vec![],
                body: body.to_string(),
                duration_ms: 12,
            }))
        }
    }

    impl HttpClient for StubClient {
        fn execute(
            &self,
            request: OutboundRequest,
        ) -> Pin<Box<dyn Future<Output = Result<OutboundResponse, HttpClientError>> + Send + '_>>
        {
            Box::pin(async move {
                self.seen.lock().unwrap().push(request);
                self.responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Err(HttpClientError::Network("no stubbed response".into())))
            })
        }
    }

    struct Harness {
        kv: Arc<MemoryStore>,
        overrides: OverrideStore,
        environments: EnvironmentStore,
        history: HistoryStore,
        vars: VariableStore,
    }

    fn harness() -> Harness {
        let kv = Arc::new(MemoryStore::default());
        Harness {
            overrides: OverrideStore::new(kv.clone()),
            environments: EnvironmentStore::new(kv.clone()),
            history: HistoryStore::new(kv.clone()),
            vars: VariableStore::new(
                BTreeMap::new(),
                EnvironmentSet::new("dev"),
                BTreeMap::new(),
            ),
            kv,
        }
    }

    fn editable(url: &str) -> EditableRequest {
        EditableRequest {
            id: "r1".to_string(),
            name: "Ping".to_string(),
            method: HttpMethod::Get,
            url: url.to_string(),
            params: vec![],
            headers: vec![],
            body: String::new(),
            pre_script: String::new(),
            post_script: String::new(),
            auth: courier_domain::AuthOverride::default(),
            last_response: None,
        }
    }

    async fn run(
        client: &StubClient,
        h: &mut Harness,
        editable: &EditableRequest,
    ) -> SendOutcome {
        SendRequest::new(client, &mut h.overrides, &h.environments, &h.history)
            .execute(
                editable,
                &RequestScripts::default(),
                None,
                &mut h.vars,
                None,
            )
            .await
    }

    #[tokio::test]
    async fn test_success_captures_and_persists() {
        let client = StubClient::ok(200, "pong");
        let mut h = harness();
        let outcome = run(&client, &mut h, &editable("https://example.com/ping")).await;

        let SendState::Succeeded { response } = outcome.state else {
            panic!("expected success");
        };
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "pong");

        // The record lands in the patch and in history.
        let stored = h.kv.get("req_r1").await.unwrap().unwrap();
        assert!(stored.contains("pong"));
        assert_eq!(h.history.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_yields_synthetic_record() {
        let client = StubClient::respond_with(Err(HttpClientError::Timeout));
        let mut h = harness();
        let outcome = run(&client, &mut h, &editable("https://example.com")).await;

        let SendState::Failed { kind, response } = outcome.state else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::Timeout);
        assert_eq!(response.status, 0);
        assert_eq!(response.status_text, "Timeout");
    }

    #[tokio::test]
    async fn test_network_failure_maps_to_service_unavailable() {
        let client =
            StubClient::respond_with(Err(HttpClientError::Network("connection refused".into())));
        let mut h = harness();
        let outcome = run(&client, &mut h, &editable("https://example.com")).await;

        let SendState::Failed { kind, response } = outcome.state else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::Network);
        assert_eq!(response.status, 503);
        assert_eq!(response.body, "connection refused");
    }

    #[tokio::test]
    async fn test_pre_script_error_aborts_without_dispatch() {
        let client = StubClient::ok(200, "never reached");
        let mut h = harness();
        let mut request = editable("https://example.com");
        request.pre_script = "window.alert('hi')".to_string();
        let outcome = run(&client, &mut h, &request).await;

        let SendState::Failed { kind, response } = outcome.state else {
            panic!("expected failure");
        };
        assert_eq!(kind, FailureKind::ScriptAborted);
        assert_eq!(response.status_text, "Script Error");
        assert_eq!(response.duration_ms, 0);
        assert!(client.seen.lock().unwrap().is_empty());
        // The synthetic record still reaches history.
        assert_eq!(h.history.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_pre_script_variable_feeds_url() {
        let client = StubClient::ok(200, "ok");
        let mut h = harness();
        let mut request = editable("https://example.com/items");
        request.pre_script = concat!(
            "pm.variables.set('id', '42')\n",
            "pm.request.url = pm.request.url + \"?id={{id}}\"",
        )
        .to_string();
        run(&client, &mut h, &request).await;

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].url, "https://example.com/items?id=42");
    }

    #[tokio::test]
    async fn test_get_never_carries_a_body() {
        let client = StubClient::ok(200, "ok");
        let mut h = harness();
        let mut request = editable("https://example.com");
        request.body = r#"{"ignored":true}"#.to_string();
        run(&client, &mut h, &request).await;

        assert_eq!(client.seen.lock().unwrap()[0].body, None);
    }

    #[tokio::test]
    async fn test_post_script_rewrites_body_before_capture() {
        let client = StubClient::ok(200, "raw");
        let mut h = harness();
        let mut request = editable("https://example.com");
        request.post_script = r#"pm.response.setBody("patched")"#.to_string();
        let outcome = run(&client, &mut h, &request).await;

        let SendState::Succeeded { response } = outcome.state else {
            panic!("expected success");
        };
        assert_eq!(response.body, "patched");
    }

    #[tokio::test]
    async fn test_post_script_error_never_fails_the_send() {
        let client = StubClient::ok(200, "ok");
        let mut h = harness();
        let mut request = editable("https://example.com");
        request.post_script = "window.alert('hi')".to_string();
        let outcome = run(&client, &mut h, &request).await;

        assert!(matches!(outcome.state, SendState::Succeeded { .. }));
        assert!(outcome
            .logs
            .iter()
            .any(|l| l.starts_with("Post-response script error")));
    }

    #[tokio::test]
    async fn test_script_environment_writes_are_persisted() {
        let client = StubClient::ok(200, "ok");
        let mut h = harness();
        let mut request = editable("https://example.com");
        request.pre_script = r#"pm.environment.set("token", "abc")"#.to_string();
        run(&client, &mut h, &request).await;

        let stored = h.kv.get("env_dev").await.unwrap().unwrap();
        assert!(stored.contains("abc"));
    }
}
