//! Newline-delimited JSON-RPC 2.0 server over stdio.
//!
//! Each line on stdin is one request or notification; each response is
//! written as one line on stdout. Supported methods:
//!
//! - `initialize`, `ping`
//! - `tools/list`
//! - `tools/call`
//! - any `notifications/*` (accepted, never answered)
//!
//! A failing tool call is answered with a result carrying `isError: true`,
//! so one bad invocation never ends the session. Only malformed frames,
//! unknown methods and unknown tools produce JSON-RPC errors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, Result, ServerError};
use crate::tools::ToolRegistry;

/// Protocol version reported when the client does not request one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// Frames
// ============================================================================

/// An incoming request or notification (no `id`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl Request {
    /// Check if this is a notification.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self::new(-32700, "Parse error").with_data(json!(detail.into()))
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(-32600, "Invalid Request").with_data(json!(detail.into()))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {}", method))
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::new(-32602, detail)
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<&ServerError> for RpcError {
    fn from(e: &ServerError) -> Self {
        Self::new(e.rpc_code(), e.to_string()).with_data(json!({ "kind": e.kind().to_string() }))
    }
}

/// An outgoing response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

impl Response {
    pub fn ok(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn err(error: RpcError, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// JSON-RPC front end for a [`ToolRegistry`].
#[derive(Debug, Clone)]
pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    #[must_use]
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Serve stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an error if stdio cannot be read or written.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve frames from `reader`, writing responses to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Serving {} tools over stdio", self.tools.definitions().len());
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                let mut frame = serde_json::to_string(&response)?;
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one input line. Returns `None` for blank lines and
    /// notifications.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparsable frame: {}", e);
                return Some(Response::err(RpcError::parse_error(e.to_string()), Value::Null));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => return Some(Response::err(RpcError::invalid_request(e.to_string()), id)),
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(Response::err(
                RpcError::invalid_request(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
                id,
            ));
        }

        self.handle(request).await
    }

    /// Handle a parsed request.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        debug!("<- {}", request.method);

        if request.is_notification() {
            debug!("Notification {} acknowledged", request.method);
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);
        let params = request.params.unwrap_or(Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call_tool(params).await,
            other => Err(RpcError::method_not_found(other)),
        };

        Some(match outcome {
            Ok(result) => Response::ok(result, id),
            Err(error) => Response::err(error, id),
        })
    }

    async fn call_tool(&self, params: Value) -> std::result::Result<Value, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires a string 'name'"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.tools.call(name, arguments).await {
            Ok(value) => Ok(tool_success(value)),
            Err(e) if e.kind() == ErrorKind::UnknownOperation => Err(RpcError::from(&e)),
            Err(e) => Ok(tool_failure(&e)),
        }
    }
}

fn initialize_result(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn tool_success(value: Value) -> Value {
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    let mut result = json!({
        "content": [{ "type": "text", "text": text }],
        "isError": false,
    });
    if value.is_object() {
        result["structuredContent"] = value;
    }
    result
}

fn tool_failure(error: &ServerError) -> Value {
    json!({
        "content": [{ "type": "text", "text": error.to_string() }],
        "structuredContent": {
            "error": error.to_string(),
            "kind": error.kind().to_string(),
            "retryable": error.is_retryable(),
        },
        "isError": true,
    })
}
