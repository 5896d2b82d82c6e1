//! HTTP client port

use std::future::Future;
use std::pin::Pin;

use courier_domain::HttpMethod;
use thiserror::Error;

/// A fully composed outbound call: absolute URL, final header rows,
/// optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL, query string included.
    pub url: String,
    /// Final header rows, casing preserved.
    pub headers: Vec<(String, String)>,
    /// Body text, if the method carries one.
    pub body: Option<String>,
}

/// What came back over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text, e.g. "OK".
    pub status_text: String,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Body text.
    pub body: String,
    /// Elapsed wall-clock time in milliseconds.
    pub duration_ms: u64,
}

/// Transport failures, kept distinct so the dispatcher can classify
/// them into synthetic responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpClientError {
    /// The call was aborted by the timeout budget.
    #[error("request timed out")]
    Timeout,

    /// The endpoint was unreachable, blocked, or refused the connection.
    #[error("network error: {0}")]
    Network(String),

    /// The composed request could not be turned into a wire call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Port for executing outbound HTTP calls.
///
/// Dyn-compatible so the engine, scripts' sub-calls and tests can share
/// one client handle.
pub trait HttpClient: Send + Sync {
    /// Executes an outbound call.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Timeout`] for a timeout-triggered
    /// abort, [`HttpClientError::Network`] for any other transport
    /// failure.
    fn execute(
        &self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OutboundResponse, HttpClientError>> + Send + '_>>;
}
