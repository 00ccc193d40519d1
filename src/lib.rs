//! Product assistant over an e-commerce review corpus
//!
//! An agentic RAG workflow: queries are routed to local retrieval, web
//! search, or a direct answer; retrieved context is graded before the
//! final answer is generated, with one query rewrite and one web search
//! as fallbacks. Retrieval and search run behind an MCP stdio boundary
//! so the same tools serve this crate and external MCP clients.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod prompts;
pub mod retriever;
pub mod search;
pub mod store;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use errors::{AssistantError, Result};
