//! Core types for the knowledge bridge.
//!
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration for the API client, stdio server and logging

mod config;
mod errors;

pub use config::{
    ApiConfig, Config, ObservabilityConfig, ServerConfig, DEFAULT_BASE_URL, ENV_API_KEY,
    ENV_API_URL,
};
pub use errors::{matches_transient_signature, Error, Result, TRANSIENT_SIGNATURES};
