//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Network
//! failures are classified at the transport boundary so the retry layer can
//! decide without re-inspecting reqwest internals.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message fragments that identify a connectivity-class failure.
///
/// Matched case-insensitively against the full error message, source chain
/// included. Covers both errno-style codes and the OS/hyper wording.
pub const TRANSIENT_SIGNATURES: &[&str] = &[
    "econnreset",
    "econnrefused",
    "etimedout",
    "enotfound",
    "enetunreach",
    "connection reset",
    "connection refused",
    "timed out",
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "host not found",
    "network is unreachable",
    "network unreachable",
];

/// Main error enum for the knowledge bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Request exceeded the configured per-request timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection-level failure matching a known transient signature.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Any other connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Remote endpoint answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A required argument is missing or ill-typed. Displayed verbatim so the
    /// message can be handed straight back to the caller.
    #[error("{0}")]
    Validation(String),

    /// Unknown JSON-RPC method or resource.
    #[error("{0}")]
    NotFound(String),

    /// Invalid configuration (bad base URL, unusable client settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal errors.
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the retry policy may attempt this call again.
    ///
    /// Only connectivity-class failures qualify; API rejections never do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::TransientNetwork(_) => true,
            Error::Network(msg) => matches_transient_signature(msg),
            _ => false,
        }
    }

    /// Convert to a JSON-RPC error code.
    pub fn to_rpc_error_code(&self) -> i64 {
        match self {
            Error::Serialization(_) => -32700,
            Error::NotFound(_) => -32601,
            Error::Validation(_) => -32602,
            _ => -32603,
        }
    }
}

/// Case-insensitive match against [`TRANSIENT_SIGNATURES`].
pub fn matches_transient_signature(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    TRANSIENT_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
}

// Convenience constructors
impl Error {
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
