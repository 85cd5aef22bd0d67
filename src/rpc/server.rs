//! Stdio JSON-RPC server - read loop, per-request tasks, single writer.
//!
//! Requests are dispatched concurrently; responses are funnelled through one
//! channel to the writer task so frames never interleave on stdout. Responses
//! may therefore arrive out of request order and carry the request `id`.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::rpc::codec::{
    read_frame, write_frame, Frame, RpcRequest, RpcResponse, INVALID_REQUEST, JSONRPC_VERSION,
    PARSE_ERROR,
};
use crate::rpc::router::{route_request, ServerState};
use crate::tools::AccessGrant;
use crate::types::ServerConfig;

/// JSON-RPC server bound to one session's grant.
#[derive(Debug)]
pub struct StdioServer {
    state: Arc<ServerState>,
    config: ServerConfig,
    cancel: CancellationToken,
}

impl StdioServer {
    pub fn new(client: ApiClient, grant: AccessGrant, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(client, grant)),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the read loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Serve on the process's stdin/stdout.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until EOF on `reader` or cancellation.
    ///
    /// On EOF, requests already accepted are allowed to finish and their
    /// responses are written before returning. On cancellation they are aborted.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(reader);
        let (tx, rx) = mpsc::channel(self.config.response_channel_capacity);
        let writer_task = tokio::spawn(write_loop(writer, rx));
        let mut in_flight = JoinSet::new();

        tracing::info!(
            max_line_bytes = self.config.max_line_bytes,
            tools = ?self.state.grant().allowed().names(),
            "JSON-RPC server ready on stdio"
        );

        loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("JSON-RPC server shutting down");
                    in_flight.shutdown().await;
                    break;
                }
                frame = read_frame(&mut reader, self.config.max_line_bytes) => frame?,
            };

            while let Some(joined) = in_flight.try_join_next() {
                log_join(joined);
            }

            let open = match frame {
                None => {
                    tracing::debug!(in_flight = in_flight.len(), "stdin closed");
                    break;
                }
                Some(Frame::Oversized(discarded)) => {
                    tracing::warn!(discarded, "dropping oversized request line");
                    let message = format!(
                        "Invalid Request: line exceeds {} bytes",
                        self.config.max_line_bytes
                    );
                    reply(&tx, RpcResponse::failure(Value::Null, INVALID_REQUEST, message)).await
                }
                Some(Frame::InvalidUtf8(offset)) => {
                    tracing::debug!(offset, "request line is not valid UTF-8");
                    let message = format!("Parse error: invalid UTF-8 at byte {}", offset);
                    reply(&tx, RpcResponse::failure(Value::Null, PARSE_ERROR, message)).await
                }
                Some(Frame::Message(line)) => self.accept(&line, &tx, &mut in_flight).await,
            };
            if !open {
                tracing::warn!("response writer closed, stopping read loop");
                break;
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }
        drop(tx);

        writer_task
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }

    /// Decode one line and either answer it inline or spawn its handler.
    /// Returns `false` once the writer is gone.
    async fn accept(
        &self,
        line: &str,
        tx: &mpsc::Sender<RpcResponse>,
        in_flight: &mut JoinSet<()>,
    ) -> bool {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable request line");
                let response =
                    RpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
                return reply(tx, response).await;
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                let response =
                    RpcResponse::failure(id, INVALID_REQUEST, format!("Invalid Request: {}", e));
                return reply(tx, response).await;
            }
        };

        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification received");
            return true;
        }

        if let Some(version) = request.jsonrpc.as_deref() {
            if version != JSONRPC_VERSION {
                let response = RpcResponse::failure(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid Request: unsupported jsonrpc version {}", version),
                );
                return reply(tx, response).await;
            }
        }

        let state = Arc::clone(&self.state);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let RpcRequest {
                id, method, params, ..
            } = request;
            let id = id.unwrap_or(Value::Null);

            let response = match route_request(&state, &method, params).await {
                Ok(result) => RpcResponse::success(id, result),
                Err(err) => {
                    tracing::debug!(method = %method, error = %err, "request failed");
                    RpcResponse::failure(id, err.to_rpc_error_code(), err.to_string())
                }
            };
            reply(&tx, response).await;
        });
        true
    }
}

async fn reply(tx: &mpsc::Sender<RpcResponse>, response: RpcResponse) -> bool {
    tx.send(response).await.is_ok()
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!("request task panicked: {}", e);
        }
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<RpcResponse>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        write_frame(&mut writer, &response).await?;
    }
    Ok(())
}
