//! MCP (Model Context Protocol) server over newline-delimited JSON-RPC.
//!
//! `serve` wires this to stdin/stdout: one request per line in, one
//! response per line out, logging on stderr so the transport stays clean.
//! The server understands `initialize`, `tools/list` and `tools/call`;
//! notifications are read and dropped; anything else is answered with a
//! method-not-found error.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use reel_types::RecorderError;

use crate::registry::ToolRegistry;

/// Protocol revision reported by `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";

// Standard JSON-RPC error codes.
const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;

// Application-specific error codes.
const TOOL_NOT_FOUND: i64 = -32000;
const TOOL_EXECUTION_ERROR: i64 = -32002;

/// A JSON-RPC 2.0 request. `id` is absent for notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

/// A JSON-RPC 2.0 response carrying either `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// A JSON-RPC 2.0 error object. Tool failures carry the engine's stable
/// error kind under `data.kind` (`validation`, `capacity`, `resource` or
/// `not_found`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn fail(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self::fail_with(id, code, message, None)
    }

    fn fail_with(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
            id,
        }
    }
}

/// Parameters of a `tools/call` request.
#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default = "empty_arguments")]
    arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Serves a [`ToolRegistry`] over any line-oriented transport.
pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Read requests from `input` until EOF, writing one response line per
    /// request to `output`. Notifications produce no line.
    pub async fn run(
        self,
        mut input: impl AsyncBufRead + Unpin,
        mut output: impl AsyncWrite + Unpin,
    ) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            let request = line.trim();
            if request.is_empty() {
                continue;
            }
            if let Some(response) = self.dispatch(request).await {
                let mut bytes = serde_json::to_vec(&response)?;
                bytes.push(b'\n');
                output.write_all(&bytes).await?;
                output.flush().await?;
            }
        }
    }

    /// Route one request line. Returns `None` for notifications.
    async fn dispatch(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            // An unparseable line cannot echo an id back.
            Err(_) => {
                return Some(JsonRpcResponse::fail(Value::Null, PARSE_ERROR, "Parse error"))
            }
        };

        let Some(id) = request.id else {
            debug!(method = %request.method, "notification acknowledged");
            return None;
        };

        Some(match request.method.as_str() {
            "initialize" => self.on_initialize(id),
            "tools/list" => self.on_tools_list(id),
            "tools/call" => self.on_tools_call(id, request.params).await,
            other => {
                JsonRpcResponse::fail(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            }
        })
    }

    fn on_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::ok(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "reel",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
    }

    fn on_tools_list(&self, id: Value) -> JsonRpcResponse {
        match serde_json::to_value(self.registry.list_tools()) {
            Ok(tools) => JsonRpcResponse::ok(id, serde_json::json!({ "tools": tools })),
            Err(e) => JsonRpcResponse::fail(id, INTERNAL_ERROR, format!("serialize tools: {e}")),
        }
    }

    async fn on_tools_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let call: ToolCallParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
            Ok(call) => call,
            Err(e) => {
                return JsonRpcResponse::fail(
                    id,
                    INTERNAL_ERROR,
                    format!("Invalid tools/call params: {e}"),
                )
            }
        };

        let Some(tool) = self.registry.get_tool(&call.name) else {
            return JsonRpcResponse::fail(
                id,
                TOOL_NOT_FOUND,
                format!("Tool not found: {}", call.name),
            );
        };

        match tool.execute(call.arguments).await {
            Ok(result) => {
                let text = serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string());
                JsonRpcResponse::ok(
                    id,
                    serde_json::json!({
                        "content": [{ "type": "text", "text": text }]
                    }),
                )
            }
            Err(err) => JsonRpcResponse::fail_with(
                id,
                TOOL_EXECUTION_ERROR,
                err.to_string(),
                Some(serde_json::json!({ "kind": error_kind(&err) })),
            ),
        }
    }
}

/// The engine's stable error kind for a tool failure. Failures that did
/// not originate in the engine count as resource errors.
fn error_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<RecorderError>()
        .map(RecorderError::kind)
        .unwrap_or("resource")
}
