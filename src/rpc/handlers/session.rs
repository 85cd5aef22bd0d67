//! Session handler - MCP handshake and liveness.

use serde_json::{json, Value};

use crate::rpc::router::ServerState;

/// Protocol revision offered when the client does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "mahakalp-mcp";

/// `initialize`: echo the client's protocol revision and describe the server.
pub fn initialize(state: &ServerState, params: &Value) -> Value {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    if let Some(client) = params.get("clientInfo").and_then(|v| v.get("name")) {
        tracing::info!(client = %client, protocol_version, "client initialized session");
    }

    let tier = state.grant().effective_tier();
    let tools = state.grant().allowed().len();

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "instructions": format!(
            "Salesforce platform knowledge from Mahakalp. Session tier: {} ({} tools available).",
            tier, tools
        ),
    })
}

pub fn ping() -> Value {
    json!({})
}
