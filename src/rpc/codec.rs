//! Frame codec for the JSON-RPC stdio protocol.
//!
//! Frame format: one JSON-RPC 2.0 message per line.
//! ```text
//! {"jsonrpc":"2.0","id":1,"method":"tools/list"}\n
//! ```
//! Blank lines are skipped. Lines longer than the configured limit are
//! drained and reported as [`Frame::Oversized`] so the stream stays in sync.
//! Lines that are not UTF-8 are reported, never repaired.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

const DRAIN_CHUNK_BYTES: u64 = 64 * 1024;

/// Incoming request or notification (`id` absent).
///
/// An explicit `"id": null` is a request and reads as `Some(Value::Null)`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Outgoing response: exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// One inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-blank line, trimmed.
    Message(String),
    /// A line over the limit; carries the number of bytes discarded.
    Oversized(usize),
    /// A line that is not valid UTF-8; carries the offset of the first bad byte.
    InvalidUtf8(usize),
}

/// Read one frame. Returns `None` on clean EOF.
pub async fn read_frame<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_line_bytes: usize,
) -> std::io::Result<Option<Frame>> {
    loop {
        let mut buf = Vec::new();
        let read = (&mut *reader)
            .take(max_line_bytes as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        if buf.last() != Some(&b'\n') && buf.len() > max_line_bytes {
            let discarded = buf.len() + drain_line(reader).await?;
            return Ok(Some(Frame::Oversized(discarded)));
        }

        let line = match String::from_utf8(buf) {
            Ok(line) => line,
            Err(e) => return Ok(Some(Frame::InvalidUtf8(e.utf8_error().valid_up_to()))),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        return Ok(Some(Frame::Message(trimmed.to_string())));
    }
}

/// Discard input up to and including the next newline.
async fn drain_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<usize> {
    let mut discarded = 0;
    loop {
        let mut sink = Vec::new();
        let read = (&mut *reader)
            .take(DRAIN_CHUNK_BYTES)
            .read_until(b'\n', &mut sink)
            .await?;
        discarded += read;
        if read == 0 || sink.last() == Some(&b'\n') {
            return Ok(discarded);
        }
    }
}

/// Write one frame to the stream.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut payload = serde_json::to_vec(message)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}
