//! Knowledge API client - transport, retry policy, typed operations.
//!
//! ```text
//!   facade method → RetryPolicy::run → Transport::send → remote API
//! ```
//!
//! The client is cheap to clone and shares nothing mutable; concurrent tool
//! invocations each drive their own request through it.

pub mod operations;
pub mod retry;
pub mod transport;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::types::{ApiConfig, Result};

pub use operations::{
    ConstraintsParams, ConstraintsResponse, DecisionGuidesParams, DecisionGuidesResponse,
    DocSearchParams, DocSearchResponse, GuidanceSearchParams, PatternsParams, PatternsResponse,
    ReleasesParams, ReleasesResponse, RulesParams, RulesResponse,
};
pub use retry::RetryPolicy;
pub use transport::{ApiRequest, HttpTransport, Method, Transport, CLIENT_USER_AGENT};

/// Reachability probe endpoint.
pub const HEALTH_PATH: &str = "/api/health";

/// Entitlement-agnostic client for the knowledge API.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Build an HTTP-backed client from configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config);
        let transport = HttpTransport::new(Arc::new(config))?;
        Ok(Self::with_transport(Arc::new(transport), retry))
    }

    /// Build a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Send through the retry policy and parse the body as `R`.
    pub async fn request<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let body = self.retry.run(|| self.transport.send(&request)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Single attempt, no retries.
    pub async fn request_once<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let body = self.transport.send(&request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET /api/health`; any 2xx counts as reachable. Errors are swallowed.
    pub async fn health_check(&self) -> bool {
        match self.transport.send(&ApiRequest::get(HEALTH_PATH)).await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "knowledge API health probe failed");
                false
            }
        }
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
