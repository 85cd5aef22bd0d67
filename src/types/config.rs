//! Configuration structures.
//!
//! Configuration is assembled once at process start (CLI flags and
//! environment) and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default knowledge API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mahakalp.dev";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "MAHAKALP_API_URL";

/// Environment variable carrying the API key.
pub const ENV_API_KEY: &str = "MAHAKALP_API_KEY";

/// Global bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote API client configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Stdio server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Request configuration shared by every outbound call.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, trailing slashes stripped.
    pub base_url: String,

    /// Bearer credential (optional).
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for linear backoff.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl ApiConfig {
    /// Build a config for `base_url` with default resilience settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Read `MAHAKALP_API_URL` / `MAHAKALP_API_KEY`, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_API_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(base_url).with_api_key(std::env::var(ENV_API_KEY).ok())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

// Manual Debug so the API key never lands in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Stdio server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Maximum accepted JSON-RPC line length in bytes.
    pub max_line_bytes: usize,

    /// Bounded channel capacity for outgoing responses.
    pub response_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 4 * 1024 * 1024,
            response_channel_capacity: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
