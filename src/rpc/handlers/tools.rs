//! Tools service handler - allow-set check, argument validation, dispatch.
//!
//! `ToolDispatcher::handle` returns `None` for operations that are unknown or
//! not permitted, and otherwise always a result envelope: facade faults are
//! folded into `{success: false, error}` here and never escape.

use std::time::Instant;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{
    ApiClient, ConstraintsParams, DocSearchParams, GuidanceSearchParams, ReleasesParams,
    RulesParams,
};
use crate::rpc::router::{str_field, ServerState};
use crate::tools::{AllowSet, ToolCatalog, ToolName};
use crate::types::{Error, Result};

/// Async handler for one knowledge operation.
pub type HandlerFn = for<'a> fn(&'a ApiClient, Value) -> BoxFuture<'a, Result<Value>>;

/// Handler table, indexed by tool name.
pub fn handler_for(name: ToolName) -> HandlerFn {
    match name {
        ToolName::Constraints => constraints,
        ToolName::DocSearch => doc_search,
        ToolName::Releases => releases,
        ToolName::Rules => rules,
        ToolName::Patterns => patterns,
        ToolName::DecisionGuides => decision_guides,
    }
}

/// `{success: false, error}` envelope.
pub fn error_envelope(message: impl Into<String>) -> Value {
    json!({
        "success": false,
        "error": message.into(),
    })
}

/// Routes tool invocations to the operation facade.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    client: ApiClient,
    catalog: std::sync::Arc<ToolCatalog>,
}

impl ToolDispatcher {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            catalog: std::sync::Arc::new(ToolCatalog::standard()),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run `name` with `args` if `allowed` permits it.
    pub async fn handle(&self, name: &str, args: Value, allowed: &AllowSet) -> Option<Value> {
        let tool = name.parse::<ToolName>().ok()?;
        if !allowed.contains(tool) {
            tracing::warn!(tool = %tool, "tool call rejected by allow-set");
            return None;
        }

        let errors = self.catalog.validate_params(tool, &args);
        if !errors.is_empty() {
            tracing::debug!(tool = %tool, ?errors, "tool arguments rejected");
            return Some(error_envelope(errors.join("; ")));
        }

        let started = Instant::now();
        let result = handler_for(tool)(&self.client, args).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                tracing::info!(tool = %tool, elapsed_ms, "tool call completed");
                Some(value)
            }
            Err(err) => {
                tracing::warn!(tool = %tool, elapsed_ms, error = %err, "tool call failed");
                Some(error_envelope(err.to_string()))
            }
        }
    }
}

// =============================================================================
// MCP methods
// =============================================================================

/// `tools/list`: the catalog narrowed to the session's allow-set.
pub fn list(state: &ServerState) -> Value {
    let allowed = state.grant().allowed();
    let tools: Vec<Value> = state
        .dispatcher()
        .catalog()
        .list_allowed(|name| allowed.contains(name))
        .iter()
        .map(|entry| entry.to_listing())
        .collect();

    json!({ "tools": tools })
}

/// `tools/call`: `{name, arguments}` → text content carrying the envelope.
pub async fn call(state: &ServerState, params: Value) -> Result<Value> {
    let name = str_field(&params, "name")?;
    let args = params.get("arguments").cloned().unwrap_or(Value::Null);

    let result = state
        .dispatcher()
        .handle(&name, args, state.grant().allowed())
        .await
        .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;

    let is_error = result.get("success").and_then(Value::as_bool) == Some(false);
    let text = serde_json::to_string_pretty(&result)?;

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    }))
}

// =============================================================================
// Handlers
// =============================================================================

fn parse_args<P: DeserializeOwned>(args: Value) -> Result<P> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| Error::validation(format!("invalid arguments: {}", e)))
}

fn respond<R: Serialize>(response: R) -> Result<Value> {
    Ok(serde_json::to_value(response)?)
}

fn constraints(client: &ApiClient, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: ConstraintsParams = parse_args(args)?;
        respond(client.get_constraints(&params).await?)
    })
}

fn doc_search(client: &ApiClient, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: DocSearchParams = parse_args(args)?;
        respond(client.search_docs(&params).await?)
    })
}

fn releases(client: &ApiClient, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: ReleasesParams = parse_args(args)?;
        respond(client.get_releases(&params).await?)
    })
}

fn rules(client: &ApiClient, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: RulesParams = parse_args(args)?;
        respond(client.query_rules(&params).await?)
    })
}

fn patterns(client: &ApiClient, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: GuidanceSearchParams = parse_args(args)?;
        respond(client.search_patterns(&params).await?)
    })
}

fn decision_guides(client: &ApiClient, args: Value) -> BoxFuture<'_, Result<Value>> {
    Box::pin(async move {
        let params: GuidanceSearchParams = parse_args(args)?;
        respond(client.search_decision_guides(&params).await?)
    })
}
