//! Product search tools
//!
//! `get_product_info` answers with a JSON-encoded document list from the
//! local retriever; `web_search` answers with plain text. Backend
//! failures are folded into the tool's text output, so callers always
//! get something to route on.

use serde_json::{json, Value};
use tracing::info;

use crate::config::{ApiKeys, AppConfig};
use crate::errors::{AssistantError, Result};
use crate::retriever::Retriever;
use crate::search::WebSearchClient;

pub const GET_PRODUCT_INFO: &str = "get_product_info";
pub const WEB_SEARCH: &str = "web_search";

/// Definitions advertised by `tools/list`
pub fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": GET_PRODUCT_INFO,
            "description": "Retrieve product titles, prices, ratings, and reviews from the local product index. Returns a JSON list of documents; an empty list means no local results.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Product search query"
                    }
                },
                "required": ["query"]
            }
        }),
        json!({
            "name": WEB_SEARCH,
            "description": "Search the live web for product information when the local index has nothing relevant. Returns plain text.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Web search query"
                    }
                },
                "required": ["query"]
            }
        }),
    ]
}

/// The two tool backends behind the server
pub struct ToolSet {
    retriever: Retriever,
    web: WebSearchClient,
}

impl ToolSet {
    pub fn new(config: &AppConfig, keys: &ApiKeys) -> Result<Self> {
        Ok(Self {
            retriever: Retriever::new(config, keys),
            web: WebSearchClient::new()?,
        })
    }

    /// Dispatch a `tools/call`. Unknown names and bad arguments are
    /// errors; backend failures come back as ordinary text.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<String> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AssistantError::Tool("missing required argument: query".to_string())
            })?;

        match name {
            GET_PRODUCT_INFO => Ok(self.get_product_info(query).await),
            WEB_SEARCH => Ok(self.web_search(query).await),
            other => Err(AssistantError::Tool(format!("unknown tool: {}", other))),
        }
    }

    async fn get_product_info(&self, query: &str) -> String {
        info!(query, "Tool call: {}", GET_PRODUCT_INFO);

        match self.retriever.query(query).await {
            Ok(documents) => serde_json::to_string(&documents)
                .unwrap_or_else(|e| format!("Error retrieving product info: {}", e)),
            Err(e) => format!("Error retrieving product info: {}", e),
        }
    }

    async fn web_search(&self, query: &str) -> String {
        info!(query, "Tool call: {}", WEB_SEARCH);

        match self.web.search(query).await {
            Ok(text) => text,
            Err(e) => format!("Error during web search: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_set() -> ToolSet {
        ToolSet::new(&AppConfig::default(), &ApiKeys::default()).unwrap()
    }

    #[test]
    fn test_definitions_cover_both_tools() {
        let definitions = tool_definitions();
        assert_eq!(definitions.len(), 2);

        let names: Vec<&str> = definitions
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![GET_PRODUCT_INFO, WEB_SEARCH]);

        for definition in &definitions {
            assert_eq!(definition["inputSchema"]["required"][0], "query");
        }
    }

    #[tokio::test]
    async fn test_call_without_query_is_an_error() {
        let tools = tool_set();
        let err = tools
            .call(GET_PRODUCT_INFO, &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn test_call_unknown_tool_is_an_error() {
        let tools = tool_set();
        let err = tools
            .call("drop_tables", &json!({"query": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_backend_failure_is_in_band() {
        // An embedder that cannot be constructed makes the retriever fail
        // without any network involved; the text reports it.
        let mut config = AppConfig::default();
        config.embedding.provider = "openai".to_string();
        let tools = ToolSet::new(&config, &ApiKeys::default()).unwrap();

        let text = tools
            .call(GET_PRODUCT_INFO, &json!({"query": "iphone"}))
            .await
            .unwrap();
        assert!(text.starts_with("Error retrieving product info:"));
        assert!(text.contains("OPENAI_API_KEY"));
    }
}
