//! JSON-RPC 2.0 over stdio, speaking the MCP tool methods.
//!
//! Newline-delimited frames on stdin/stdout; logs go to stderr.

pub mod codec;
pub mod handlers;
pub mod router;
pub mod server;

pub use router::{route_request, ServerState};
pub use server::StdioServer;
