//! Application wiring
//!
//! `AppContext` owns everything a surface needs to answer queries: the
//! chat model, the MCP tool connection, prompts, and per-thread
//! checkpoints. The HTTP server and the CLI both run queries through
//! controllers built from one shared context.

use std::sync::Arc;

use tracing::info;

use crate::config::{ApiKeys, AppConfig};
use crate::errors::Result;
use crate::mcp::{McpClient, ToolClient};
use crate::models::{ChatModel, ModelLoader};
use crate::prompts::PromptRegistry;
use crate::workflow::{CheckpointStore, WorkflowConfig, WorkflowController};

pub struct AppContext {
    pub config: AppConfig,
    prompts: PromptRegistry,
    chat: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolClient>,
    checkpoints: Arc<CheckpointStore>,
}

impl AppContext {
    /// Wire the full stack: resolve credentials, load the chat model,
    /// and spawn the MCP tool server as a child process.
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let keys = ApiKeys::resolve(&config);
        keys.ensure_required(&config.required_api_keys())?;

        let chat = ModelLoader::new(&config, &keys).load_chat()?;

        let mcp = McpClient::spawn(&config.mcp).await?;
        info!(tools = ?mcp.tool_names(), "MCP tool server connected");

        Ok(Self::with_parts(config, Arc::new(chat), Arc::new(mcp)))
    }

    /// Assemble a context from preconstructed parts
    pub fn with_parts(
        config: AppConfig,
        chat: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolClient>,
    ) -> Self {
        Self {
            config,
            prompts: PromptRegistry::builtin(),
            chat,
            tools,
            checkpoints: Arc::new(CheckpointStore::new()),
        }
    }

    /// Build a workflow controller over the shared state
    pub fn controller(&self) -> WorkflowController {
        WorkflowController::new(
            Arc::clone(&self.chat),
            Arc::clone(&self.tools),
            self.prompts.clone(),
            Arc::clone(&self.checkpoints),
            WorkflowConfig::default(),
        )
    }
}
