//! MCP client over a spawned server process
//!
//! Spawns the configured command with piped stdio, performs the
//! `initialize` handshake, and caches the advertised tool names. Calls
//! are serialized through a mutex so request and response frames stay
//! paired on the single stdio stream.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::McpConfig;
use crate::errors::{AssistantError, Result};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, ToolCallResult, MCP_PROTOCOL_VERSION};
use crate::mcp::ToolClient;

/// Client handle to one spawned tool server
pub struct McpClient {
    inner: Mutex<ClientInner>,
    tools: Vec<String>,
}

struct ClientInner {
    // Held so kill_on_drop reaps the server with the client
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl McpClient {
    /// Spawn the server, run the handshake, and list its tools
    pub async fn spawn(config: &McpConfig) -> Result<Self> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AssistantError::Tool(format!(
                    "Failed to spawn MCP server '{}': {}",
                    config.command, e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AssistantError::Protocol("Server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| AssistantError::Protocol("Server stdout unavailable".to_string()))?;

        let mut inner = ClientInner {
            _child: child,
            stdin,
            stdout,
            next_id: 0,
        };

        let init = inner
            .request(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "prodassist",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;
        inner.notify("notifications/initialized", json!({})).await?;

        let listed = inner.request("tools/list", json!({})).await?;
        let tools = tool_names_from_list(&listed);

        info!(
            server = init["serverInfo"]["name"].as_str().unwrap_or("unknown"),
            tools = ?tools,
            "MCP server connected"
        );

        Ok(Self {
            inner: Mutex::new(inner),
            tools,
        })
    }

    pub fn tool_names(&self) -> &[String] {
        &self.tools
    }
}

#[async_trait]
impl ToolClient for McpClient {
    fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool == name)
    }

    async fn call_tool(&self, name: &str, query: &str) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let result = inner
            .request(
                "tools/call",
                json!({"name": name, "arguments": {"query": query}}),
            )
            .await?;

        let parsed: ToolCallResult = serde_json::from_value(result)?;
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.content_type == "text")
            .map(|block| block.text)
            .unwrap_or_default();

        if parsed.is_error {
            return Err(AssistantError::Tool(text));
        }

        Ok(text)
    }
}

impl ClientInner {
    async fn request(&mut self, method: &str, params: Value) -> Result<Value> {
        self.next_id += 1;
        let id = self.next_id;

        self.send(&JsonRpcRequest::new(id, method, params)).await?;
        let response = read_response(&mut self.stdout).await?;

        if response.id != Some(Value::from(id)) {
            return Err(AssistantError::Protocol(format!(
                "Mismatched response id for {}",
                method
            )));
        }
        if let Some(error) = response.error {
            return Err(AssistantError::Protocol(format!(
                "{} failed: {} (code {})",
                method, error.message, error.code
            )));
        }

        response
            .result
            .ok_or_else(|| AssistantError::Protocol(format!("{} returned no result", method)))
    }

    /// Send a notification; no reply is read
    async fn notify(&mut self, method: &str, params: Value) -> Result<()> {
        self.send(&JsonRpcRequest::notification(method, params)).await
    }

    async fn send(&mut self, request: &JsonRpcRequest) -> Result<()> {
        let body = serde_json::to_string(request)?;

        self.stdin
            .write_all(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes())
            .await?;
        self.stdin.write_all(body.as_bytes()).await?;
        self.stdin.flush().await?;

        Ok(())
    }
}

async fn read_response<R>(reader: &mut R) -> Result<JsonRpcResponse>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = String::new();
    if reader.read_line(&mut header).await? == 0 {
        return Err(AssistantError::Protocol(
            "Server closed the connection".to_string(),
        ));
    }

    let header = header.trim();
    let content_length: usize = header
        .strip_prefix("Content-Length:")
        .ok_or_else(|| {
            AssistantError::Protocol(format!("Expected Content-Length header, got: {}", header))
        })?
        .trim()
        .parse()
        .map_err(|_| AssistantError::Protocol("Invalid Content-Length".to_string()))?;

    let mut blank = String::new();
    reader.read_line(&mut blank).await?;

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(serde_json::from_slice(&body)?)
}

fn tool_names_from_list(listed: &Value) -> Vec<String> {
    listed["tools"]
        .as_array()
        .map(|tools| {
            tools
                .iter()
                .filter_map(|tool| tool["name"].as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_response_parses_a_framed_reply() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
        let frame = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let mut reader = BufReader::new(Builder::new().read(frame.as_bytes()).build());

        let response = read_response(&mut reader).await.unwrap();
        assert_eq!(response.id, Some(json!(1)));
        assert_eq!(response.result.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn test_read_response_rejects_bad_header() {
        let mut reader = BufReader::new(Builder::new().read(b"Content-Type: nope\r\n").build());

        let err = read_response(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("Content-Length"));
    }

    #[test]
    fn test_tool_names_from_list() {
        let listed = json!({
            "tools": [
                {"name": "get_product_info", "description": "..."},
                {"name": "web_search"}
            ]
        });
        assert_eq!(
            tool_names_from_list(&listed),
            vec!["get_product_info", "web_search"]
        );

        assert!(tool_names_from_list(&json!({})).is_empty());
    }

    #[tokio::test]
    #[ignore] // Integration test - requires the prodassist binary on PATH
    async fn test_spawn_and_handshake() {
        let config = McpConfig::default();
        let client = McpClient::spawn(&config).await.unwrap();

        assert!(client.has_tool("get_product_info"));
        assert!(client.has_tool("web_search"));
        assert!(!client.has_tool("nonexistent"));
    }
}
