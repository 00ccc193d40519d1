//! Non-streaming chat completion client
//!
//! Speaks both wire formats the providers use:
//! - OpenAI-style: POST {base}/chat/completions with a bearer token
//! - Ollama: POST {base}/api/chat with stream disabled

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AssistantError, Result};
use crate::models::provider::Provider;

/// Request timeout covering a full non-streaming generation
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A model that turns one prompt into one reply
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat completion client over HTTP
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_output_tokens: u32,
}

impl ChatClient {
    pub fn new(
        provider: Provider,
        model: &str,
        api_key: Option<String>,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<Self> {
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
            temperature,
            max_output_tokens,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = OpenAiChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
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

        let parsed: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ModelApi(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AssistantError::ModelApi("Response contained no choices".to_string()))
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_output_tokens,
            },
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

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::ModelApi(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.message.content)
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if self.provider.is_openai_compatible() {
            self.complete_openai(prompt).await
        } else {
            self.complete_ollama(prompt).await
        }
    }
}

/// Shared message shape across both wire formats
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

/// OpenAI-style chat request
#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

/// OpenAI-style chat response
#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: WireMessage,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: WireMessage,
}
