//! Error types for the product assistant
//!
//! Provides comprehensive error handling with context propagation
//! across the retrieval, workflow, and tool layers.

use thiserror::Error;

/// Main error type for the assistant system
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required credentials absent from every source
    #[error("Missing required API keys: {}", .keys.join(", "))]
    MissingApiKeys { keys: Vec<String> },

    /// Model client construction errors
    #[error("Failed to initialize {provider} model client: {reason}")]
    ModelInit { provider: String, reason: String },

    /// Chat or embedding API errors
    #[error("Model API error: {0}")]
    ModelApi(String),

    /// Vector store errors
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Prompt formatting errors, naming every absent placeholder
    #[error("Missing placeholders in '{}': {}", .template, .names.join(", "))]
    MissingPlaceholders { template: String, names: Vec<String> },

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Protocol(String),

    /// Tool invocation errors
    #[error("Tool error: {0}")]
    Tool(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Assistant error: {0}")]
    Generic(String),
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Convert anyhow errors to AssistantError
impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        AssistantError::Generic(err.to_string())
    }
}
