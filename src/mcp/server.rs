//! MCP server over stdio
//!
//! All logging MUST go to stderr. stdout is reserved for JSON-RPC
//! protocol messages only.

use std::io::{BufRead, Write};

use serde_json::json;

use crate::config::{ApiKeys, AppConfig};
use crate::errors::{AssistantError, Result};
use crate::mcp::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo,
    ToolCallResult, ToolsCapability, MCP_PROTOCOL_VERSION,
};
use crate::mcp::tools::{tool_definitions, ToolSet};

const SERVER_NAME: &str = "prodassist-tools";

/// Run the tool server until stdin closes
pub async fn run(config: &AppConfig, keys: &ApiKeys) -> Result<()> {
    tracing::info!("Starting MCP tool server on stdio");

    let tools = ToolSet::new(config, keys)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();

    let mut stdin_lock = stdin.lock();
    let mut stdout_lock = stdout.lock();

    loop {
        let request = match read_message(&mut stdin_lock) {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::info!("EOF reached, shutting down");
                break;
            }
            Err(e) => {
                tracing::error!("Failed to read message: {}", e);
                continue;
            }
        };

        tracing::debug!("Received request: {}", request.method);

        let response = match dispatch(&tools, request).await {
            Some(response) => response,
            None => continue,
        };

        if let Err(e) = write_message(&mut stdout_lock, &response) {
            tracing::error!("Failed to write response: {}", e);
        }
    }

    Ok(())
}

/// Read one Content-Length framed message from the input stream
fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<JsonRpcRequest>> {
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        return Ok(None);
    }

    let header = header.trim();
    if header.is_empty() {
        return Ok(None);
    }

    let content_length: usize = header
        .strip_prefix("Content-Length:")
        .ok_or_else(|| {
            AssistantError::Protocol(format!("Expected Content-Length header, got: {}", header))
        })?
        .trim()
        .parse()
        .map_err(|_| AssistantError::Protocol("Invalid Content-Length".to_string()))?;

    // Skip the blank line after headers
    let mut blank = String::new();
    reader.read_line(&mut blank)?;

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    let request: JsonRpcRequest = serde_json::from_slice(&body)?;
    Ok(Some(request))
}

/// Write one Content-Length framed message to the output stream
fn write_message<W: Write>(writer: &mut W, response: &JsonRpcResponse) -> Result<()> {
    let body = serde_json::to_string(response)?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());

    writer.write_all(header.as_bytes())?;
    writer.write_all(body.as_bytes())?;
    writer.flush()?;

    Ok(())
}

/// Route one message; JSON-RPC notifications carry no id and get no reply
async fn dispatch(tools: &ToolSet, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    if request.id.is_none() {
        tracing::debug!("Notification: {}", request.method);
        return None;
    }
    Some(handle_request(tools, request).await)
}

async fn handle_request(tools: &ToolSet, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => handle_initialize(id),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
        "tools/call" => handle_call_tool(tools, id, request.params).await,
        "ping" => JsonRpcResponse::success(id, json!({})),
        _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {}", request.method)),
    }
}

fn handle_initialize(id: Option<serde_json::Value>) -> JsonRpcResponse {
    let result = InitializeResult {
        protocol_version: MCP_PROTOCOL_VERSION.to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: Some(false),
            }),
        },
        server_info: ServerInfo {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, -32603, e.to_string()),
    }
}

async fn handle_call_tool(
    tools: &ToolSet,
    id: Option<serde_json::Value>,
    params: serde_json::Value,
) -> JsonRpcResponse {
    let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let result = match tools.call(name, &arguments).await {
        Ok(text) => ToolCallResult::text(text),
        Err(e) => ToolCallResult::error(format!("Error: {}", e)),
    };

    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, -32603, e.to_string()),
    }
}
