//! HTTP client implementation using reqwest.
//!
//! Implements the `HttpClient` port over `reqwest::Client` and maps
//! transport failures into the error categories the dispatcher
//! classifies into synthetic responses.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use courier_application::ports::{HttpClient, HttpClientError, OutboundRequest, OutboundResponse};
use courier_application::send::REQUEST_TIMEOUT;
use courier_domain::HttpMethod;
use reqwest::{Client, Method, Url};

/// HTTP client adapter over `reqwest::Client`.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the workbench defaults: redirects limited
    /// to 10, rustls TLS, per-request timeout applied at dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::InvalidRequest`] if the underlying
    /// client cannot be built.
    pub fn new() -> Result<Self, HttpClientError> {
        let client = Client::builder()
            .user_agent(concat!("Courier/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an already configured reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    fn map_error(error: &reqwest::Error) -> HttpClientError {
        if error.is_timeout() {
            return HttpClientError::Timeout;
        }
        if error.is_builder() || error.is_request() {
            return HttpClientError::InvalidRequest(error.to_string());
        }
        HttpClientError::Network(error.to_string())
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute(
        &self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<OutboundResponse, HttpClientError>> + Send + '_>> {
        Box::pin(async move {
            let url = Url::parse(&request.url)
                .map_err(|e| HttpClientError::InvalidRequest(format!("{e}: {}", request.url)))?;

            let start = Instant::now();
            let mut builder = self
                .client
                .request(Self::to_reqwest_method(request.method), url)
                .timeout(REQUEST_TIMEOUT);

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| Self::map_error(&e))?;

            let status = response.status().as_u16();
            let status_text = response
                .status()
                .canonical_reason()
                .unwrap_or_default()
                .to_string();
            let headers: Vec<(String, String)> = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        v.to_str().unwrap_or("<binary>").to_string(),
                    )
                })
                .collect();

            let body = response
                .text()
                .await
                .map_err(|e| HttpClientError::Network(format!("failed to read body: {e}")))?;

            let duration_ms =
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            Ok(OutboundResponse {
                status,
                status_text,
                headers,
                body,
                duration_ms,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(
            ReqwestHttpClient::to_reqwest_method(HttpMethod::Get),
            Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::to_reqwest_method(HttpMethod::Post),
            Method::POST
        );
        assert_eq!(
            ReqwestHttpClient::to_reqwest_method(HttpMethod::Delete),
            Method::DELETE
        );
    }

    #[test]
    fn test_client_creation() {
        assert!(ReqwestHttpClient::new().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_dispatch() {
        let client = ReqwestHttpClient::new().unwrap();
        let result = client
            .execute(OutboundRequest {
                method: HttpMethod::Get,
                url: "not a url".to_string(),
                headers: vec![],
                body: None,
            })
            .await;
        assert!(matches!(result, Err(HttpClientError::InvalidRequest(_))));
    }
}
