//! Top-level JSON-RPC router - routes by method, delegates to handlers.

use serde_json::Value;

use crate::client::ApiClient;
use crate::rpc::handlers::{self, ToolDispatcher};
use crate::tools::AccessGrant;
use crate::types::{Error, Result};

/// Read-only state shared by every in-flight request of a session.
#[derive(Debug)]
pub struct ServerState {
    dispatcher: ToolDispatcher,
    grant: AccessGrant,
}

impl ServerState {
    pub fn new(client: ApiClient, grant: AccessGrant) -> Self {
        Self {
            dispatcher: ToolDispatcher::new(client),
            grant,
        }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn grant(&self) -> &AccessGrant {
        &self.grant
    }
}

/// Route a JSON-RPC request to the appropriate handler.
pub async fn route_request(state: &ServerState, method: &str, params: Value) -> Result<Value> {
    match method {
        "initialize" => Ok(handlers::session::initialize(state, &params)),
        "ping" => Ok(handlers::session::ping()),
        "tools/list" => Ok(handlers::tools::list(state)),
        "tools/call" => handlers::tools::call(state, params).await,
        _ => Err(Error::not_found(format!("Method not found: {}", method))),
    }
}

// =============================================================================
// Shared helpers - used by all handler modules
// =============================================================================

pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Missing required field: {}", key)))
}
