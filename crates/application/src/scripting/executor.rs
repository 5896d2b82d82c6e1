//! Command interpreter for parsed scripts.
//!
//! Runs a command list against a [`ScriptContext`]: a deep copy of the
//! pending request, an optional captured response, and a log sink.
//! Variable writes go straight through the store; request mutations
//! stay in the context until the dispatcher reads them back.

use std::future::Future;
use std::pin::Pin;

use courier_domain::{
    DomainError, Expr, Header, Headers, HttpMethod, ResponseRecord, ScriptCommand, ScriptError,
    SubRequestSpec, VariableScope,
};
use tokio::time::timeout;

use crate::pipeline::AssembledRequest;
use crate::ports::{HttpClient, OutboundRequest};
use crate::send::REQUEST_TIMEOUT;
use crate::variables::VariableStore;

use super::parser::parse;

/// The mutable world a script runs against.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    /// Working method; scripts may flip it before dispatch.
    pub method: HttpMethod,
    /// Working URL.
    pub url: String,
    /// Working header rows.
    pub headers: Headers,
    /// Working body text.
    pub body: String,
    /// The captured response, present in the post phase.
    pub response: Option<ResponseRecord>,
    /// Log sink; `console.log` and test results land here.
    pub logs: Vec<String>,
}

impl ScriptContext {
    /// Seeds a pre-request context from the assembled request.
    #[must_use]
    pub fn for_request(request: &AssembledRequest) -> Self {
        Self {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone().unwrap_or_default(),
            response: None,
            logs: Vec::new(),
        }
    }
}

/// Interprets parsed commands against a context, the variable store and
/// the outbound client (for `sendRequest` sub-calls).
pub struct ScriptExecutor<'a> {
    vars: &'a mut VariableStore,
    client: &'a dyn HttpClient,
}

impl<'a> ScriptExecutor<'a> {
    /// Wires the executor to its store and client.
    pub fn new(vars: &'a mut VariableStore, client: &'a dyn HttpClient) -> Self {
        Self { vars, client }
    }

    /// Parses and runs one script source. Empty sources are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Parse`] when the source is outside the
    /// supported surface, or the first runtime error a command raises.
    /// Assertion failures inside `pm.test` blocks are logged, never
    /// returned.
    pub async fn run(
        &mut self,
        source: &str,
        ctx: &mut ScriptContext,
    ) -> Result<(), ScriptError> {
        if source.trim().is_empty() {
            return Ok(());
        }
        let commands = parse(source)?;
        self.execute_all(&commands, ctx, None, false).await
    }

    /// Boxed for recursion through `pm.test` bodies and `sendRequest`
    /// callbacks.
    fn execute_all<'s>(
        &'s mut self,
        commands: &'s [ScriptCommand],
        ctx: &'s mut ScriptContext,
        bound: Option<&'s ResponseRecord>,
        in_test: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScriptError>> + Send + 's>> {
        Box::pin(async move {
            for command in commands {
                self.execute(command, ctx, bound, in_test).await?;
            }
            Ok(())
        })
    }

    async fn execute(
        &mut self,
        command: &ScriptCommand,
        ctx: &mut ScriptContext,
        bound: Option<&ResponseRecord>,
        in_test: bool,
    ) -> Result<(), ScriptError> {
        match command {
            ScriptCommand::SetVariable { scope, key, value } => {
                let value = self.eval(value, ctx, bound)?;
                match scope {
                    VariableScope::Environment => self.vars.set_environment_var(key.clone(), value),
                    VariableScope::Global => self.vars.set_global_var(key.clone(), value),
                    VariableScope::Collection => self.vars.set_collection_var(key.clone(), value),
                }
            }
            ScriptCommand::UnsetVariable { scope, key } => match scope {
                VariableScope::Environment => self.vars.unset_environment_var(key),
                VariableScope::Global => self.vars.unset_global_var(key),
                VariableScope::Collection => self.vars.unset_collection_var(key),
            },
            ScriptCommand::SetMethod(expr) => {
                let name = self.eval(expr, ctx, bound)?;
                ctx.method = name
                    .parse()
                    .map_err(|e: DomainError| ScriptError::Runtime(e.to_string()))?;
            }
            ScriptCommand::SetUrl(expr) => {
                ctx.url = self.eval(expr, ctx, bound)?;
            }
            ScriptCommand::SetHeader { name, value } => {
                let value = self.eval(value, ctx, bound)?;
                ctx.headers.set(name, value);
            }
            ScriptCommand::AddHeader { name, value } => {
                let value = self.eval(value, ctx, bound)?;
                ctx.headers.add(Header::new(name.clone(), value));
            }
            ScriptCommand::RemoveHeader { name } => {
                ctx.headers.remove(name);
            }
            ScriptCommand::SetBody(expr) => {
                ctx.body = self.eval(expr, ctx, bound)?;
            }
            ScriptCommand::SetResponseBody(expr) => {
                let body = self.eval(expr, ctx, bound)?;
                match &mut ctx.response {
                    Some(response) => response.body = body,
                    None => {
                        return Err(ScriptError::Runtime(
                            "setBody needs a captured response".to_string(),
                        ));
                    }
                }
            }
            ScriptCommand::Log(args) => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.eval(arg, ctx, bound)?);
                }
                ctx.logs.push(parts.join(" "));
            }
            ScriptCommand::SendRequest { spec, callback } => {
                self.send_sub_request(spec, callback, ctx, bound, in_test)
                    .await?;
            }
            ScriptCommand::Test { name, body } => {
                match self.execute_all(body, ctx, bound, true).await {
                    Ok(()) => ctx.logs.push(format!("Test passed: {name}")),
                    Err(ScriptError::Runtime(message)) => {
                        ctx.logs.push(format!("Test failed: {name}: {message}"));
                    }
                    Err(e) => ctx.logs.push(format!("Test failed: {name}: {e}")),
                }
            }
            ScriptCommand::Expect {
                actual,
                expected,
                negated,
            } => {
                let left = self.eval(actual, ctx, bound)?;
                let right = self.eval(expected, ctx, bound)?;
                if (left == right) == *negated {
                    let verb = if *negated { "not equal" } else { "equal" };
                    let message = format!("expected '{left}' to {verb} '{right}'");
                    if in_test {
                        return Err(ScriptError::Runtime(message));
                    }
                    ctx.logs.push(format!("Test failed: {message}"));
                }
            }
        }
        Ok(())
    }

    async fn send_sub_request(
        &mut self,
        spec: &SubRequestSpec,
        callback: &[ScriptCommand],
        ctx: &mut ScriptContext,
        bound: Option<&ResponseRecord>,
        in_test: bool,
    ) -> Result<(), ScriptError> {
        let outbound = self.compose_sub_request(spec, ctx, bound)?;
        let method = outbound.method;
        let url = outbound.url.clone();
        let client = self.client;

        match timeout(REQUEST_TIMEOUT, client.execute(outbound)).await {
            Ok(Ok(response)) => {
                ctx.logs
                    .push(format!("{} {} [{}]", method.as_str(), url, response.status));
                let mut record = ResponseRecord {
                    status: response.status,
                    status_text: response.status_text,
                    headers: response.headers,
                    body: response.body,
                    url,
                    duration_ms: response.duration_ms,
                    truncated: false,
                };
                record.clamp_body();
                self.execute_all(callback, ctx, Some(&record), in_test)
                    .await?;
            }
            Ok(Err(e)) => ctx.logs.push(format!("sendRequest {url} failed: {e}")),
            Err(_) => ctx
                .logs
                .push(format!("sendRequest {url} failed: request timed out")),
        }
        Ok(())
    }

    fn compose_sub_request(
        &self,
        spec: &SubRequestSpec,
        ctx: &ScriptContext,
        bound: Option<&ResponseRecord>,
    ) -> Result<OutboundRequest, ScriptError> {
        let url = self.vars.resolve(&self.eval(&spec.url, ctx, bound)?, None);
        let method = match &spec.method {
            Some(name) => name
                .parse::<HttpMethod>()
                .map_err(|e| ScriptError::Runtime(e.to_string()))?,
            None => HttpMethod::Get,
        };

        let mut headers = Vec::new();
        for (name, value) in &spec.headers {
            let value = self.vars.resolve(&self.eval(value, ctx, bound)?, None);
            headers.push((canonical_header_name(name), value));
        }

        let body = match &spec.body {
            Some(expr) if method.allows_body() => Some(self.eval(expr, ctx, bound)?),
            _ => None,
        };
        if spec.body_is_json
            && body.is_some()
            && !headers
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case("content-type"))
        {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(OutboundRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn eval(
        &self,
        expr: &Expr,
        ctx: &ScriptContext,
        bound: Option<&ResponseRecord>,
    ) -> Result<String, ScriptError> {
        match expr {
            Expr::Str(value) => Ok(value.clone()),
            Expr::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    out.push_str(&self.eval(part, ctx, bound)?);
                }
                Ok(out)
            }
            Expr::GetVariable { scope, key } => {
                let value = match scope {
                    None => self.vars.get(key),
                    Some(VariableScope::Environment) => self.vars.get_environment(key),
                    Some(VariableScope::Global) => self.vars.get_global(key),
                    Some(VariableScope::Collection) => self.vars.get_collection(key),
                };
                Ok(value.unwrap_or_default().to_string())
            }
            Expr::RequestMethod => Ok(ctx.method.as_str().to_string()),
            Expr::RequestUrl => Ok(ctx.url.clone()),
            Expr::RequestBody => Ok(ctx.body.clone()),
            Expr::RequestHeader(name) => {
                Ok(ctx.headers.get(name).unwrap_or_default().to_string())
            }
            Expr::RequestHeadersJson => {
                let map: serde_json::Map<String, serde_json::Value> = ctx
                    .headers
                    .enabled()
                    .map(|h| (h.name.clone(), serde_json::Value::String(h.value.clone())))
                    .collect();
                Ok(serde_json::Value::Object(map).to_string())
            }
            // Before any response exists, `code` reads as 0 and `text()`
            // as empty; only `json()` demands a real body.
            Expr::ResponseCode => Ok(active_response(ctx, bound)
                .map_or_else(|| "0".to_string(), |r| r.status.to_string())),
            Expr::ResponseText => {
                Ok(active_response(ctx, bound).map_or_else(String::new, |r| r.body.clone()))
            }
            Expr::ResponseJsonPath(path) => {
                let body = &active_response(ctx, bound)
                    .ok_or_else(|| {
                        ScriptError::Runtime("no response is available here".to_string())
                    })?
                    .body;
                let root: serde_json::Value = serde_json::from_str(body)
                    .map_err(|e| ScriptError::BodyNotJson(e.to_string()))?;
                let mut current = &root;
                for segment in path {
                    current = match current {
                        serde_json::Value::Object(map) => map.get(segment),
                        serde_json::Value::Array(items) => {
                            segment.parse::<usize>().ok().and_then(|i| items.get(i))
                        }
                        _ => None,
                    }
                    .ok_or_else(|| {
                        ScriptError::Runtime(format!("json field not found: {segment}"))
                    })?;
                }
                Ok(match current {
                    serde_json::Value::String(value) => value.clone(),
                    other => other.to_string(),
                })
            }
        }
    }
}

/// The innermost response a command addresses: the sub-call's inside a
/// callback, otherwise the captured one.
fn active_response<'r>(
    ctx: &'r ScriptContext,
    bound: Option<&'r ResponseRecord>,
) -> Option<&'r ResponseRecord> {
    bound.or(ctx.response.as_ref())
}

/// Normalizes the casing of the two headers downstream checks look at.
fn canonical_header_name(name: &str) -> String {
    if name.eq_ignore_ascii_case("content-type") {
        "Content-Type".to_string()
    } else if name.eq_ignore_ascii_case("authorization") {
        "Authorization".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ports::{HttpClientError, OutboundResponse};
    use courier_domain::EnvironmentSet;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubClient {
        response: Option<OutboundResponse>,
        seen: Mutex<Vec<OutboundRequest>>,
    }

    impl StubClient {
        fn json(body: &str) -> Self {
            Self {
                response: Some(OutboundResponse {
                    status: 200,
                    status_text: "OK".to_string(),
                    headers: vec![],
                    body: body.to_string(),
                    duration_ms: 5,
                }),
                seen: Mutex::new(Vec::new()),
            }
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
                self.response
                    .clone()
                    .ok_or_else(|| HttpClientError::Network("no stubbed response".into()))
            })
        }
    }

    fn vars() -> VariableStore {
        let mut collection = BTreeMap::new();
        collection.insert("base".to_string(), "https://api.example.com".to_string());
        VariableStore::new(collection, EnvironmentSet::new("dev"), BTreeMap::new())
    }

    fn request_ctx() -> ScriptContext {
        ScriptContext {
            method: HttpMethod::Get,
            url: "https://api.example.com/items".to_string(),
            headers: Headers::new(),
            body: String::new(),
            response: None,
            logs: Vec::new(),
        }
    }

    fn response_ctx(body: &str) -> ScriptContext {
        let mut ctx = request_ctx();
        ctx.response = Some(ResponseRecord {
            status: 201,
            status_text: "Created".to_string(),
            headers: vec![],
            body: body.to_string(),
            url: ctx.url.clone(),
            duration_ms: 7,
            truncated: false,
        });
        ctx
    }

    async fn run(source: &str, vars: &mut VariableStore, ctx: &mut ScriptContext) {
        let client = StubClient::default();
        ScriptExecutor::new(vars, &client)
            .run(source, ctx)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_variable_writes_hit_their_scopes() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        run(
            concat!(
                "pm.environment.set(\"a\", \"1\")\n",
                "pm.globals.set(\"b\", \"2\")\n",
                "pm.collectionVariables.set(\"c\", \"3\")\n",
            ),
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(vars.get_environment("a"), Some("1"));
        assert_eq!(vars.get_global("b"), Some("2"));
        assert_eq!(vars.get_collection("c"), Some("3"));
    }

    #[tokio::test]
    async fn test_body_raw_reads_working_body() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        ctx.body = r#"{"sku":"a-1"}"#.to_string();
        run(
            "console.log(pm.request.body.raw())",
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(ctx.logs, vec![r#"{"sku":"a-1"}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_response_reads_before_dispatch() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        run(
            concat!(
                "console.log(pm.response.code)\n",
                "console.log(\"[\" + pm.response.text() + \"]\")\n",
            ),
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(ctx.logs, vec!["0".to_string(), "[]".to_string()]);

        // json() still needs a real body to walk.
        let client = StubClient::default();
        let result = ScriptExecutor::new(&mut vars, &client)
            .run("console.log(pm.response.json().id)", &mut ctx)
            .await;
        assert!(matches!(result, Err(ScriptError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_header_reads() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        ctx.headers.set("Accept", "application/json");
        run(
            concat!(
                "console.log(pm.request.headers.get(\"accept\"))\n",
                "console.log(pm.request.headers.toJSON())\n",
            ),
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(ctx.logs[0], "application/json");
        assert_eq!(ctx.logs[1], r#"{"Accept":"application/json"}"#);
    }

    #[tokio::test]
    async fn test_request_mutations_stay_in_context() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        run(
            concat!(
                "pm.request.method = \"POST\"\n",
                "pm.request.url = pm.request.url + \"/new\"\n",
                "pm.request.headers.upsert(\"X-Trace\", \"1\")\n",
                "pm.request.body.setRaw(\"{}\")\n",
            ),
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(ctx.method, HttpMethod::Post);
        assert_eq!(ctx.url, "https://api.example.com/items/new");
        assert_eq!(ctx.headers.get("X-Trace"), Some("1"));
        assert_eq!(ctx.body, "{}");
    }

    #[tokio::test]
    async fn test_unknown_method_is_a_runtime_error() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        let client = StubClient::default();
        let result = ScriptExecutor::new(&mut vars, &client)
            .run("pm.request.method = \"TRACE\"", &mut ctx)
            .await;
        assert!(matches!(result, Err(ScriptError::Runtime(_))));
    }

    #[tokio::test]
    async fn test_console_log_joins_arguments() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        run(
            "console.log(\"method\", pm.request.method)",
            &mut vars,
            &mut ctx,
        )
        .await;
        assert_eq!(ctx.logs, vec!["method GET".to_string()]);
    }

    #[tokio::test]
    async fn test_json_path_walks_objects_and_arrays() {
        let mut vars = vars();
        let mut ctx = response_ctx(r#"{"items":[{"id":"first"}],"count":2}"#);
        run(
            concat!(
                "pm.environment.set(\"id\", pm.response.json().items.0.id)\n",
                "pm.environment.set(\"count\", pm.response.json().count)\n",
            ),
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(vars.get_environment("id"), Some("first"));
        assert_eq!(vars.get_environment("count"), Some("2"));
    }

    #[tokio::test]
    async fn test_json_on_non_json_body() {
        let mut vars = vars();
        let mut ctx = response_ctx("plain text");
        let client = StubClient::default();
        let result = ScriptExecutor::new(&mut vars, &client)
            .run(
                "pm.environment.set(\"x\", pm.response.json().a)",
                &mut ctx,
            )
            .await;
        assert!(matches!(result, Err(ScriptError::BodyNotJson(_))));
    }

    #[tokio::test]
    async fn test_test_blocks_log_and_never_throw() {
        let mut vars = vars();
        let mut ctx = response_ctx("body");
        run(
            concat!(
                "pm.test(\"status created\", function () {\n",
                "  pm.expect(pm.response.code).to.equal(201)\n",
                "})\n",
                "pm.test(\"status ok\", function () {\n",
                "  pm.expect(pm.response.code).to.equal(200)\n",
                "})\n",
            ),
            &mut vars,
            &mut ctx,
        )
        .await;

        assert_eq!(ctx.logs.len(), 2);
        assert_eq!(ctx.logs[0], "Test passed: status created");
        assert!(ctx.logs[1].starts_with("Test failed: status ok"));
    }

    #[tokio::test]
    async fn test_bare_expect_failure_logs() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        run(
            "pm.expect(pm.request.method).to.equal(\"POST\")",
            &mut vars,
            &mut ctx,
        )
        .await;
        assert!(ctx.logs[0].starts_with("Test failed:"));
    }

    #[tokio::test]
    async fn test_send_request_feeds_callback() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        let client = StubClient::json(r#"{"access_token":"t-123"}"#);
        ScriptExecutor::new(&mut vars, &client)
            .run(
                concat!(
                    "pm.sendRequest({ url: \"{{base}}/auth\", method: \"POST\",\n",
                    "  body: { \"grant\": \"client\" } }, function (err, res) {\n",
                    "  pm.environment.set(\"token\", res.json().access_token)\n",
                    "})",
                ),
                &mut ctx,
            )
            .await
            .unwrap();

        assert_eq!(vars.get_environment("token"), Some("t-123"));
        assert_eq!(ctx.logs, vec!["POST https://api.example.com/auth [200]".to_string()]);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].url, "https://api.example.com/auth");
        // A bare object body defaults the content type.
        assert!(seen[0]
            .headers
            .iter()
            .any(|(n, v)| n == "Content-Type" && v == "application/json"));
    }

    #[tokio::test]
    async fn test_send_request_failure_logs_and_skips_callback() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        let client = StubClient::default();
        ScriptExecutor::new(&mut vars, &client)
            .run(
                concat!(
                    "pm.sendRequest(\"https://down.example.com\", function (err, res) {\n",
                    "  pm.environment.set(\"never\", \"set\")\n",
                    "})",
                ),
                &mut ctx,
            )
            .await
            .unwrap();

        assert!(ctx.logs[0].contains("failed"));
        assert_eq!(vars.get_environment("never"), None);
    }

    #[tokio::test]
    async fn test_response_body_rewrite() {
        let mut vars = vars();
        let mut ctx = response_ctx("raw");
        run(
            "pm.response.setBody(pm.response.text() + \"!\")",
            &mut vars,
            &mut ctx,
        )
        .await;
        assert_eq!(ctx.response.unwrap().body, "raw!");
    }

    #[tokio::test]
    async fn test_empty_source_is_a_no_op() {
        let mut vars = vars();
        let mut ctx = request_ctx();
        run("  \n", &mut vars, &mut ctx).await;
        assert!(ctx.logs.is_empty());
    }
}
