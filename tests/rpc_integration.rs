//! JSON-RPC integration tests - stdio framing → router → dispatcher → transport.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mahakalp_mcp::client::operations::{CONSTRAINTS_PATH, DOC_SEARCH_PATH, RELEASES_PATH};
use mahakalp_mcp::client::{ApiClient, ApiRequest, RetryPolicy, Transport};
use mahakalp_mcp::entitlement::{Entitlement, SubscriptionStatus, Tier};
use mahakalp_mcp::rpc::StdioServer;
use mahakalp_mcp::tools::AccessGrant;
use mahakalp_mcp::types::ServerConfig;
use mahakalp_mcp::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

/// Transport that answers from canned bodies, with a per-path delay.
#[derive(Debug, Default)]
struct ScriptedTransport {
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay_ms, body) = match request.path {
            CONSTRAINTS_PATH => (
                80,
                json!({"success": true, "constraints": [{"id": "cpu-time"}], "count": 1}),
            ),
            DOC_SEARCH_PATH => (
                40,
                json!({"success": true, "results": [{"title": "Apex Triggers"}], "count": 1}),
            ),
            RELEASES_PATH => (
                0,
                json!({"success": true, "releases": [{"id": "spring-26"}], "count": 1}),
            ),
            _ => (0, json!({"success": true, "count": 0})),
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(Bytes::from(body.to_string()))
    }
}

/// Client side of a running server.
struct Session {
    writer: WriteHalf<DuplexStream>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    server: JoinHandle<std::io::Result<()>>,
    transport: Arc<ScriptedTransport>,
}

impl Session {
    fn start(grant: AccessGrant) -> Self {
        let transport = Arc::new(ScriptedTransport::default());
        let client = ApiClient::with_transport(transport.clone(), RetryPolicy::none());
        let server = StdioServer::new(client, grant, ServerConfig::default());

        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_end);
        let server = tokio::spawn(async move { server.serve(server_read, server_write).await });

        let (client_read, writer) = tokio::io::split(client_end);
        Self {
            writer,
            lines: BufReader::new(client_read).lines(),
            server,
            transport,
        }
    }

    async fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("response within 5s")
            .unwrap()
            .expect("stream open");
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, id: u64, method: &str, params: Value) -> Value {
        self.send(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        let response = self.recv().await;
        assert_eq!(response["id"], id);
        response
    }

    fn network_calls(&self) -> usize {
        self.transport.calls.load(Ordering::SeqCst)
    }

    async fn close(mut self) {
        self.writer.shutdown().await.unwrap();
        self.server.await.unwrap().unwrap();
    }
}

fn pro_grant() -> AccessGrant {
    AccessGrant::new(Some(Entitlement {
        subscription_id: "sub_123".to_string(),
        org_id: "org_acme".to_string(),
        tier: Tier::Pro,
        seats: 5,
        expires_at: 0,
        status: SubscriptionStatus::Active,
        features: BTreeMap::new(),
    }))
}

fn tool_names(response: &Value) -> Vec<String> {
    response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_initialize_handshake() {
    let mut session = Session::start(AccessGrant::free());

    let response = session
        .call(
            1,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "0.0.1"}
            }),
        )
        .await;
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "mahakalp-mcp");
    assert!(response["result"]["capabilities"]["tools"].is_object());

    session
        .send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    let pong = session.call(2, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    session.close().await;
}

#[tokio::test]
async fn test_free_session_lists_free_tools() {
    let mut session = Session::start(AccessGrant::free());

    let response = session.call(1, "tools/list", json!({})).await;
    assert_eq!(
        tool_names(&response),
        vec![
            "mahakalp_sf_constraints",
            "mahakalp_sf_doc_search",
            "mahakalp_sf_releases"
        ]
    );
    let schema = &response["result"]["tools"][1]["inputSchema"];
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], json!(["query"]));

    session.close().await;
}

#[tokio::test]
async fn test_pro_session_lists_every_tool() {
    let mut session = Session::start(pro_grant());
    let response = session.call(1, "tools/list", Value::Null).await;
    assert_eq!(tool_names(&response).len(), 6);
    session.close().await;
}

#[tokio::test]
async fn test_doc_search_without_query_is_rejected_locally() {
    let mut session = Session::start(AccessGrant::free());

    let response = session
        .call(
            1,
            "tools/call",
            json!({"name": "mahakalp_sf_doc_search", "arguments": {}}),
        )
        .await;

    assert_eq!(response["result"]["isError"], true);
    let envelope: Value =
        serde_json::from_str(response["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(envelope, json!({"success": false, "error": "query is required"}));
    assert_eq!(session.network_calls(), 0);

    session.close().await;
}

#[tokio::test]
async fn test_pro_tool_is_unknown_to_free_session() {
    let mut session = Session::start(AccessGrant::free());

    let response = session
        .call(
            7,
            "tools/call",
            json!({"name": "mahakalp_sf_rules", "arguments": {"query": "bulk dml"}}),
        )
        .await;

    assert!(response.get("result").is_none());
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: mahakalp_sf_rules");
    assert_eq!(session.network_calls(), 0);

    session.close().await;
}

#[tokio::test]
async fn test_allowed_call_returns_text_content() {
    let mut session = Session::start(AccessGrant::free());

    let response = session
        .call(
            1,
            "tools/call",
            json!({"name": "mahakalp_sf_releases", "arguments": {"list_all": true}}),
        )
        .await;

    assert_eq!(response["result"]["isError"], false);
    assert_eq!(response["result"]["content"][0]["type"], "text");
    let envelope: Value =
        serde_json::from_str(response["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(envelope["releases"][0]["id"], "spring-26");
    assert_eq!(session.network_calls(), 1);

    session.close().await;
}

#[tokio::test]
async fn test_parse_error_does_not_end_session() {
    let mut session = Session::start(AccessGrant::free());

    session.send_raw("{\"jsonrpc\": \"2.0\", \"id\": 1,").await;
    let response = session.recv().await;
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], -32700);

    let pong = session.call(2, "ping", Value::Null).await;
    assert_eq!(pong["result"], json!({}));

    session.close().await;
}

#[tokio::test]
async fn test_unknown_method() {
    let mut session = Session::start(AccessGrant::free());
    let response = session.call(1, "prompts/list", Value::Null).await;
    assert_eq!(response["error"]["code"], -32601);
    session.close().await;
}

#[tokio::test]
async fn test_concurrent_calls_each_get_one_response() {
    let mut session = Session::start(AccessGrant::free());

    // Slowest first so completions arrive out of request order.
    let calls = [
        (1, "mahakalp_sf_constraints", json!({"release_id": "spring-26"})),
        (2, "mahakalp_sf_doc_search", json!({"query": "apex"})),
        (3, "mahakalp_sf_releases", json!({})),
    ];
    for (id, name, arguments) in calls {
        session
            .send(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": {"name": name, "arguments": arguments}
            }))
            .await;
    }

    let mut ids = Vec::new();
    for _ in 0..3 {
        let response = session.recv().await;
        assert_eq!(response["result"]["isError"], false);
        ids.push(response["id"].as_u64().unwrap());
    }

    assert_eq!(ids.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([1, 2, 3]));
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], 3, "fastest call should answer first");
    assert_eq!(session.network_calls(), 3);

    session.close().await;
}

#[tokio::test]
async fn test_eof_drains_in_flight_requests() {
    let Session {
        mut writer,
        mut lines,
        server,
        ..
    } = Session::start(AccessGrant::free());

    let request = json!({
        "jsonrpc": "2.0",
        "id": "slow",
        "method": "tools/call",
        "params": {"name": "mahakalp_sf_constraints", "arguments": {}}
    });
    writer
        .write_all(format!("{}\n", request).as_bytes())
        .await
        .unwrap();
    writer.shutdown().await.unwrap();

    server.await.unwrap().unwrap();

    let line = lines.next_line().await.unwrap().unwrap();
    let response: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(response["id"], "slow");
    assert_eq!(response["result"]["isError"], false);
    assert!(lines.next_line().await.unwrap().is_none());
}
