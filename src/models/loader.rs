//! Model loader
//!
//! Resolves concrete clients from configuration plus credentials. Missing
//! keys and unknown providers surface here, at construction, before any
//! workflow runs.

use tracing::info;

use crate::config::{ApiKeys, AppConfig};
use crate::errors::Result;
use crate::models::chat::ChatClient;
use crate::models::embedding::EmbeddingClient;
use crate::models::provider::Provider;

/// Builds chat and embedding clients from the loaded configuration
#[derive(Debug, Clone)]
pub struct ModelLoader {
    config: AppConfig,
    keys: ApiKeys,
}

impl ModelLoader {
    pub fn new(config: &AppConfig, keys: &ApiKeys) -> Self {
        Self {
            config: config.clone(),
            keys: keys.clone(),
        }
    }

    /// Construct the chat-completion client
    pub fn load_chat(&self) -> Result<ChatClient> {
        let provider: Provider = self.config.llm.provider.parse()?;
        let api_key = self.resolve_key(provider)?;

        info!(
            provider = provider.as_str(),
            model = %self.config.llm.model,
            "Loading chat model"
        );

        ChatClient::new(
            provider,
            &self.config.llm.model,
            api_key,
            self.config.llm.temperature,
            self.config.llm.max_output_tokens,
        )
    }

    /// Construct the embedding client
    pub fn load_embedder(&self) -> Result<EmbeddingClient> {
        let provider: Provider = self.config.embedding.provider.parse()?;
        let api_key = self.resolve_key(provider)?;

        info!(
            provider = provider.as_str(),
            model = %self.config.embedding.model,
            "Loading embedding model"
        );

        EmbeddingClient::new(provider, &self.config.embedding.model, api_key)
    }

    fn resolve_key(&self, provider: Provider) -> Result<Option<String>> {
        match provider.api_key_name() {
            Some(name) => Ok(Some(self.keys.require(name)?.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_chat_with_defaults() {
        let config = AppConfig::default();
        let keys = ApiKeys::default();

        let loader = ModelLoader::new(&config, &keys);
        let chat = loader.load_chat().unwrap();
        assert_eq!(chat.provider(), Provider::Ollama);
        assert_eq!(chat.model(), crate::config::DEFAULT_CHAT_MODEL);
    }

    #[test]
    fn test_load_chat_requires_provider_key() {
        let mut config = AppConfig::default();
        config.llm.provider = "groq".to_string();
        let loader = ModelLoader::new(&config, &ApiKeys::default());

        let err = loader.load_chat().unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_load_chat_with_key_present() {
        let mut config = AppConfig::default();
        config.llm.provider = "groq".to_string();
        config.llm.model = "llama-3.3-70b-versatile".to_string();
        let keys = ApiKeys::from_pairs(&[("GROQ_API_KEY", "gsk_test")]);

        let chat = ModelLoader::new(&config, &keys).load_chat().unwrap();
        assert_eq!(chat.provider(), Provider::Groq);
    }

    #[test]
    fn test_load_embedder_unknown_provider_fails() {
        let mut config = AppConfig::default();
        config.embedding.provider = "gemini".to_string();
        let loader = ModelLoader::new(&config, &ApiKeys::default());

        assert!(loader.load_embedder().is_err());
    }
}
