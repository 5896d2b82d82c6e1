//! Script model: sources, parsed commands and expressions.
//!
//! Scripts are parsed into a command tree first and executed second;
//! nothing in the source is ever evaluated as live code. The command
//! set covers the pm-style surface the adapter exposes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pre-request and post-response script sources for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestScripts {
    /// Runs before dispatch; may rewrite method/url/params/headers/body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pre: String,
    /// Runs after a response (or synthetic response) is known; may
    /// rewrite the captured body text only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub post: String,
}

impl RequestScripts {
    /// Returns true if both slots are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre.trim().is_empty() && self.post.trim().is_empty()
    }
}

/// The persistent variable scope a script statement addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableScope {
    /// The active environment.
    Environment,
    /// Global variables (highest precedence).
    Global,
    /// Collection defaults (lowest precedence).
    Collection,
}

/// An expression a script statement may evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A string literal.
    Str(String),
    /// Left-to-right `+` concatenation.
    Concat(Vec<Expr>),
    /// A scoped variable read; `None` scope reads the flattened map.
    GetVariable {
        /// Scope to read from, or the flattened view.
        scope: Option<VariableScope>,
        /// Variable key.
        key: String,
    },
    /// The pending request's method.
    RequestMethod,
    /// The pending request's URL.
    RequestUrl,
    /// The pending request's raw body text.
    RequestBody,
    /// A header value on the pending request, matched ignoring case.
    /// Missing or disabled headers read as empty string.
    RequestHeader(String),
    /// The pending request's enabled headers as a JSON object.
    RequestHeadersJson,
    /// The bound response's status code, rendered as text.
    ResponseCode,
    /// The bound response's body text.
    ResponseText,
    /// A dotted path into the bound response's JSON body.
    ResponseJsonPath(Vec<String>),
}

impl Expr {
    /// Shorthand for a string literal expression.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }
}

/// An outbound sub-call described inside a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRequestSpec {
    /// Target URL; templates inside are resolved before dispatch.
    pub url: Expr,
    /// HTTP method name; defaults to GET when absent.
    pub method: Option<String>,
    /// Header rows to send.
    pub headers: Vec<(String, Expr)>,
    /// Body to send, if any.
    pub body: Option<Expr>,
    /// True when the body was written as a bare JSON object, which
    /// defaults the content type to `application/json`.
    pub body_is_json: bool,
}

/// One parsed script statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    /// Write a variable into a persistent scope.
    SetVariable {
        /// Target scope.
        scope: VariableScope,
        /// Variable key.
        key: String,
        /// Value expression.
        value: Expr,
    },
    /// Remove a variable from a persistent scope.
    UnsetVariable {
        /// Target scope.
        scope: VariableScope,
        /// Variable key.
        key: String,
    },
    /// Replace the pending request's method.
    SetMethod(Expr),
    /// Replace the pending request's URL.
    SetUrl(Expr),
    /// Upsert a header on the pending request.
    SetHeader {
        /// Header name.
        name: String,
        /// Value expression.
        value: Expr,
    },
    /// Append a header without replacing existing ones.
    AddHeader {
        /// Header name.
        name: String,
        /// Value expression.
        value: Expr,
    },
    /// Remove a header from the pending request.
    RemoveHeader {
        /// Header name, matched ignoring case.
        name: String,
    },
    /// Replace the pending request's raw body.
    SetBody(Expr),
    /// Replace the captured response's body text (post scripts only).
    SetResponseBody(Expr),
    /// Append a line to the context log sink.
    Log(Vec<Expr>),
    /// Issue an outbound sub-call; callback commands run with the
    /// sub-call's response bound.
    SendRequest {
        /// The sub-call description.
        spec: SubRequestSpec,
        /// Commands to run once the response arrives.
        callback: Vec<ScriptCommand>,
    },
    /// A named test block; assertion failures inside log, never throw.
    Test {
        /// Test name.
        name: String,
        /// Commands inside the block.
        body: Vec<ScriptCommand>,
    },
    /// An equality assertion.
    Expect {
        /// Left-hand value.
        actual: Expr,
        /// Right-hand value.
        expected: Expr,
        /// True for `notEqual`.
        negated: bool,
    },
}

/// Script compile or runtime failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The source could not be parsed.
    #[error("script parse error at line {line}: {message}")]
    Parse {
        /// 1-based source line.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A command failed during execution.
    #[error("script runtime error: {0}")]
    Runtime(String),

    /// `json()` was called on a body that is not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    BodyNotJson(String),
}
