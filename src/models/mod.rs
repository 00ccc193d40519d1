//! Model provider selection and HTTP clients
//!
//! This module resolves chat-completion and embedding clients from
//! configuration and credentials:
//! - Provider selection (OpenAI / Groq / Ollama)
//! - Non-streaming chat completion
//! - Query embedding

pub mod chat;
pub mod embedding;
pub mod loader;
pub mod provider;

// Re-export key types for convenience
pub use chat::{ChatClient, ChatModel};
pub use embedding::EmbeddingClient;
pub use loader::ModelLoader;
pub use provider::Provider;
