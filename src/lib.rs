//! # Mahakalp MCP - Entitlement-Gated Knowledge Client
//!
//! Bridges MCP tool calls over stdio to the Mahakalp Salesforce knowledge API:
//! - HTTP client with per-request timeout and linear-backoff retry
//! - Entitlement resolution, fetched once per session and failing open
//! - Tier-scoped tool allow-set with argument validation
//! - Newline-delimited JSON-RPC 2.0 server speaking the MCP tool methods
//!
//! ## Architecture
//!
//! ```text
//!   stdin ─▶ rpc::server ─▶ rpc::router ─▶ ToolDispatcher ─▶ ApiClient ─▶ HTTPS
//!   stdout ◀─ writer task ◀──────────────────┘      ▲
//!                                          AccessGrant (entitlement + allow-set)
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod entitlement;
pub mod rpc;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use client::ApiClient;
pub use tools::{AccessGrant, AllowSet};
pub use types::{Config, Error, Result};
