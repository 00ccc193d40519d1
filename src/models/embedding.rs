//! Query embedding client
//!
//! - OpenAI-style: POST {base}/embeddings
//! - Ollama: POST {base}/api/embeddings
//!
//! Groq exposes no embedding endpoint, so selecting it here is a
//! construction error rather than a runtime surprise.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AssistantError, Result};
use crate::models::provider::Provider;

/// Request timeout (30 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding client over HTTP
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    client: Client,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl EmbeddingClient {
    pub fn new(provider: Provider, model: &str, api_key: Option<String>) -> Result<Self> {
        if provider == Provider::Groq {
            return Err(AssistantError::ModelInit {
                provider: provider.as_str().to_string(),
                reason: "embeddings are not supported".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AssistantError::HttpError)?;

        Ok(Self {
            client,
            provider,
            base_url: provider.base_url().to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a single query string
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.provider.is_openai_compatible() {
            self.embed_openai(text).await
        } else {
            self.embed_ollama(text).await
        }
    }

    async fn embed_openai(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAiEmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AssistantError::ModelApi(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::ModelApi(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ModelApi(format!("Failed to parse response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| AssistantError::ModelApi("Response contained no embeddings".to_string()))
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::ModelApi(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::ModelApi(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ModelApi(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.embedding)
    }
}

/// OpenAI-style embedding request
#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest {
    model: String,
    input: String,
}

/// OpenAI-style embedding response
#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingItem {
    embedding: Vec<f32>,
}

/// Ollama embedding request
#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

/// Ollama embedding response
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}
