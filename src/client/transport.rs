//! Transport primitive - exactly one outbound HTTP call per invocation.
//!
//! The call is bounded by the configured timeout: on elapse the in-flight
//! future is dropped, which aborts the request, and `Error::Timeout` is
//! returned. Once a non-success status has arrived the outcome is
//! `Error::Api`, even if the error body then stalls past the deadline. No
//! retries happen at this layer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use tokio::time::Instant;

use crate::types::{matches_transient_signature, ApiConfig, Error, Result};

/// Fixed identifying header sent on every request.
pub const CLIENT_USER_AGENT: &str = concat!("mahakalp-mcp/", env!("CARGO_PKG_VERSION"));

/// HTTP verb used by the knowledge API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single request against the knowledge API, relative to the base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: Method::Get,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: Method::Post,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    /// Resolve against `base_url`, encoding query pairs in insertion order.
    pub fn url(&self, base_url: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}{}", base_url, self.path))
            .map_err(|e| Error::config(format!("invalid API URL '{}': {}", base_url, e)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

/// One network round trip. Implementations must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request, returning the raw success body.
    async fn send(&self, request: &ApiRequest) -> Result<Bytes>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
}

impl HttpTransport {
    pub fn new(config: Arc<ApiConfig>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Some(key) = &config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| Error::config(format!("API key is not a valid header value: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn build(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder> {
        let url = request.url(&self.config.base_url)?;
        let builder = match request.method {
            Method::Get => self.http.get(url),
            Method::Post => self.http.post(url),
        };
        Ok(match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Bytes> {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;
        tracing::debug!(
            method = request.method.as_str(),
            path = request.path,
            "knowledge API request"
        );

        let builder = self.build(request)?;
        let response = within(deadline, request, timeout, async {
            builder.send().await.map_err(classify_reqwest_error)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            // Best-effort: a failed or stalled body read must not mask the status error.
            let body = match tokio::time::timeout_at(deadline, response.text()).await {
                Ok(Ok(text)) => text,
                Ok(Err(err)) => {
                    tracing::debug!(status = status.as_u16(), error = %err, "error body unreadable");
                    String::new()
                }
                Err(_elapsed) => {
                    tracing::debug!(status = status.as_u16(), "error body stalled past deadline");
                    String::new()
                }
            };
            return Err(Error::api(status.as_u16(), body));
        }

        within(deadline, request, timeout, async {
            response.bytes().await.map_err(classify_reqwest_error)
        })
        .await
    }
}

/// Drive `future` until `deadline`; elapse becomes `Error::Timeout`.
///
/// Dropping the future on elapse aborts whatever I/O it had in flight.
pub(crate) async fn within<T, F>(
    deadline: Instant,
    request: &ApiRequest,
    timeout: Duration,
    future: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout_at(deadline, future).await {
        Ok(result) => result,
        Err(_elapsed) => Err(Error::timeout(format!(
            "{} {} exceeded {}ms",
            request.method.as_str(),
            request.path,
            timeout.as_millis()
        ))),
    }
}

/// Map a reqwest failure onto the error taxonomy.
///
/// The source chain is flattened into the message since hyper and the OS put
/// the useful wording ("Connection refused") several levels down.
pub fn classify_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        return Error::timeout(error_chain_message(&err));
    }
    let message = error_chain_message(&err);
    if matches_transient_signature(&message) {
        Error::transient(message)
    } else {
        Error::network(message)
    }
}

fn error_chain_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
