//! MCP tool boundary
//!
//! The product tools run in a separate process speaking JSON-RPC 2.0 over
//! stdio with `Content-Length` framing. This module holds both sides:
//! the server subcommand exposing `get_product_info` and `web_search`,
//! and the client the workflow controller calls tools through.

pub mod client;
pub mod protocol;
pub mod server;
pub mod tools;

pub use client::McpClient;
pub use tools::{ToolSet, GET_PRODUCT_INFO, WEB_SEARCH};

use async_trait::async_trait;

use crate::errors::Result;

/// Tool invocation surface the workflow controller depends on
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Whether the connected server advertises a tool by this name
    fn has_tool(&self, name: &str) -> bool;

    /// Invoke a tool with a query argument and return its text output
    async fn call_tool(&self, name: &str, query: &str) -> Result<String>;
}
