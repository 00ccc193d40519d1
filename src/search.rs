//! DuckDuckGo web search client
//!
//! Uses the instant-answer API and flattens the response into plain text
//! for the `web_search` tool. An empty answer is returned as an empty
//! string; the workflow decides what that means.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{AssistantError, Result};

/// Default DuckDuckGo instant-answer endpoint
pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com";

/// Request timeout (15 seconds)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Related topics kept when no direct answer exists
const MAX_TOPICS: usize = 5;

/// Web search client
#[derive(Debug, Clone)]
pub struct WebSearchClient {
    client: Client,
    base_url: String,
}

impl WebSearchClient {
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_SEARCH_URL)
    }

    pub fn with_config(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AssistantError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Run a search and flatten the response to text
    pub async fn search(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AssistantError::Tool(format!(
                "Web search failed: HTTP {}",
                response.status()
            )));
        }

        let parsed: InstantAnswer = response
            .json()
            .await
            .map_err(|e| AssistantError::Tool(format!("Failed to parse search response: {}", e)))?;

        Ok(render_answer(&parsed))
    }
}

fn render_answer(answer: &InstantAnswer) -> String {
    if !answer.abstract_text.trim().is_empty() {
        return answer.abstract_text.trim().to_string();
    }
    if !answer.answer.trim().is_empty() {
        return answer.answer.trim().to_string();
    }

    let mut texts = Vec::new();
    collect_topic_texts(&answer.related_topics, &mut texts);
    texts.join("\n")
}

fn collect_topic_texts(topics: &[RelatedTopic], out: &mut Vec<String>) {
    for topic in topics {
        if out.len() >= MAX_TOPICS {
            return;
        }
        if !topic.text.trim().is_empty() {
            out.push(topic.text.trim().to_string());
        }
        collect_topic_texts(&topic.topics, out);
    }
}

/// Instant-answer response, reduced to the fields rendered
#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "Answer", default)]
    answer: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topic, possibly nested one level under a category
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}
