//! Application configuration and credential resolution
//!
//! Configuration lives in a TOML file (default `~/.prodassist/config.toml`,
//! overridable with `--config` or `CONFIG_PATH`). Every section and field
//! falls back to a default, so a partial file is valid. Secrets are resolved
//! separately through [`ApiKeys`]: an `API_KEYS` JSON bundle takes
//! precedence, then individual environment variables, then file values.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::errors::{AssistantError, Result};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "product_reviews";
pub const DEFAULT_CHAT_MODEL: &str = "qwen2.5:7b-instruct";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Key names the resolver looks for in the bundle and the environment
pub const KNOWN_API_KEYS: &[&str] = &["OPENAI_API_KEY", "GROQ_API_KEY", "QDRANT_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub retriever: RetrieverConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    /// Optional here; `QDRANT_API_KEY` in the environment wins
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// Search mode for the retrieval stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Similarity,
    Mmr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub search_mode: SearchMode,
    /// Candidate pool size for MMR re-selection
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    /// MMR relevance/diversity trade-off in [0, 1]; 1 is pure relevance
    #[serde(default = "default_lambda")]
    pub lambda: f32,
    /// Apply the LLM relevance filter after search
    #[serde(default)]
    pub compress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

/// How to spawn the MCP tool server process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_mcp_command")]
    pub command: String,
    #[serde(default = "default_mcp_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_top_k() -> usize {
    10
}

fn default_fetch_k() -> usize {
    20
}

fn default_lambda() -> f32 {
    0.5
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_mcp_command() -> String {
    "prodassist".to_string()
}

fn default_mcp_args() -> Vec<String> {
    vec!["mcp-server".to_string()]
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for SearchMode {
    fn default() -> Self {
        SearchMode::Similarity
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
        }
    }
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            search_mode: SearchMode::default(),
            fetch_k: default_fetch_k(),
            lambda: default_lambda(),
            compress: false,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            command: default_mcp_command(),
            args: default_mcp_args(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration, creating the default file if none exists.
    ///
    /// Resolution order: explicit path, then `CONFIG_PATH`, then the
    /// default location. An explicit path that cannot be read is an error;
    /// a missing default file is replaced with saved defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let env_path = std::env::var("CONFIG_PATH").ok().map(PathBuf::from);
        let explicit = path.map(Path::to_path_buf).or(env_path);

        if let Some(path) = explicit {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let mut config: AppConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            let mut config = AppConfig::default();
            config.save()?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;
        let mut config: AppConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to the default file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".prodassist").join("config.toml"))
    }

    /// API key names required by the configured providers
    pub fn required_api_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        for provider in [self.llm.provider.as_str(), self.embedding.provider.as_str()] {
            let key = match provider {
                "openai" => Some("OPENAI_API_KEY"),
                "groq" => Some("GROQ_API_KEY"),
                _ => None,
            };
            if let Some(key) = key {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            if !provider.is_empty() {
                self.llm.provider = provider;
            }
        }
    }
}

/// Resolved credentials, checked once at startup
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<String, String>,
}

impl ApiKeys {
    /// Resolve keys from the `API_KEYS` JSON bundle, then individual
    /// environment variables, then config file values.
    pub fn resolve(config: &AppConfig) -> Self {
        let mut keys = HashMap::new();

        if let Ok(raw) = std::env::var("API_KEYS") {
            match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(parsed) => {
                    info!("Loaded API key bundle from environment");
                    keys = parsed;
                }
                Err(e) => warn!("Failed to parse API_KEYS bundle: {}", e),
            }
        }

        for name in KNOWN_API_KEYS {
            if keys.get(*name).map_or(true, |v| v.is_empty()) {
                if let Ok(value) = std::env::var(name) {
                    if !value.is_empty() {
                        info!("Loaded {} from environment", name);
                        keys.insert((*name).to_string(), value);
                    }
                }
            }
        }

        if keys.get("QDRANT_API_KEY").map_or(true, |v| v.is_empty()) {
            if let Some(key) = &config.vector_store.api_key {
                if !key.is_empty() {
                    keys.insert("QDRANT_API_KEY".to_string(), key.clone());
                }
            }
        }

        Self { keys }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            keys: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Look up a key; empty values count as absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| AssistantError::MissingApiKeys {
            keys: vec![name.to_string()],
        })
    }

    /// Check every required key, reporting all missing names at once
    pub fn ensure_required(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AssistantError::MissingApiKeys { keys: missing })
        }
    }
}
