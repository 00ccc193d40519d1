//! End-to-end workflow scenarios over scripted models and tools
//!
//! No network and no child process: the chat model and the tool client
//! are scripted stubs, so every path through the graph is deterministic.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use prodassist::errors::{AssistantError, Result};
use prodassist::mcp::{ToolClient, GET_PRODUCT_INFO, WEB_SEARCH};
use prodassist::models::ChatModel;
use prodassist::prompts::PromptRegistry;
use prodassist::types::{Document, ProductMetadata};
use prodassist::workflow::{
    CheckpointStore, MessageRole, WorkflowConfig, WorkflowController, NO_LOCAL_RESULTS,
    NO_WEB_DATA, TRY_ANOTHER_QUERY,
};

struct ScriptedChat {
    replies: Mutex<VecDeque<String>>,
    prompts_seen: Mutex<Vec<String>>,
}

impl ScriptedChat {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts_seen: Mutex::new(Vec::new()),
        }
    }

    async fn prompts_seen(&self) -> Vec<String> {
        self.prompts_seen.lock().await.clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts_seen.lock().await.push(prompt.to_string());
        Ok(self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "unscripted".to_string()))
    }
}

type ToolOutcome = std::result::Result<String, String>;

/// `None` for a tool means it is not advertised at all
struct StubTools {
    product: Option<ToolOutcome>,
    web: Option<ToolOutcome>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubTools {
    fn new(product: Option<ToolOutcome>, web: Option<ToolOutcome>) -> Self {
        Self {
            product,
            web,
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ToolClient for StubTools {
    fn has_tool(&self, name: &str) -> bool {
        match name {
            GET_PRODUCT_INFO => self.product.is_some(),
            WEB_SEARCH => self.web.is_some(),
            _ => false,
        }
    }

    async fn call_tool(&self, name: &str, query: &str) -> Result<String> {
        self.calls
            .lock()
            .await
            .push((name.to_string(), query.to_string()));

        let outcome = match name {
            GET_PRODUCT_INFO => self.product.clone(),
            WEB_SEARCH => self.web.clone(),
            _ => None,
        };
        match outcome {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AssistantError::Tool(message)),
            None => Err(AssistantError::Tool(format!("unknown tool: {}", name))),
        }
    }
}

fn build(
    replies: &[&str],
    tools: StubTools,
    config: WorkflowConfig,
) -> (
    WorkflowController,
    Arc<CheckpointStore>,
    Arc<ScriptedChat>,
    Arc<StubTools>,
) {
    let chat = Arc::new(ScriptedChat::new(replies));
    let tools = Arc::new(tools);
    let checkpoints = Arc::new(CheckpointStore::new());
    let controller = WorkflowController::new(
        Arc::clone(&chat) as Arc<dyn ChatModel>,
        Arc::clone(&tools) as Arc<dyn ToolClient>,
        PromptRegistry::builtin(),
        Arc::clone(&checkpoints),
        config,
    );
    (controller, checkpoints, chat, tools)
}

fn iphone_payload() -> String {
    let documents = vec![Document::new(
        "Great battery life, the camera is excellent for the price.",
        ProductMetadata {
            product_id: "B0CHX1W1XY".to_string(),
            product_title: "iPhone 15 Plus".to_string(),
            rating: Some(4.4),
            total_reviews: Some(1287),
            price: "$899".to_string(),
        },
    )];
    serde_json::to_string(&documents).unwrap()
}

#[tokio::test]
async fn test_product_query_uses_local_retrieval() {
    let tools = StubTools::new(Some(Ok(iphone_payload())), Some(Ok("unused".to_string())));
    let (controller, checkpoints, chat, tools) = build(
        &[
            "retriever",
            "yes",
            "The iPhone 15 Plus sells for $899 and is rated 4.4 by reviewers.",
        ],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller
        .run("What is the price of iPhone 15 Plus?", "t1")
        .await
        .unwrap();
    assert_eq!(
        answer,
        "The iPhone 15 Plus sells for $899 and is rated 4.4 by reviewers."
    );

    let calls = tools.calls().await;
    assert_eq!(
        calls,
        vec![(
            GET_PRODUCT_INFO.to_string(),
            "What is the price of iPhone 15 Plus?".to_string()
        )]
    );

    let state = checkpoints.load("t1").await;
    assert!(!state.did_web_search());
    assert!(!state.did_rewrite());
    let roles: Vec<MessageRole> = state.messages().iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![MessageRole::User, MessageRole::Tool, MessageRole::Assistant]
    );
    let context = state.latest_context().unwrap();
    assert!(context.starts_with("Title: iPhone 15 Plus\nPrice: $899\nRating: 4.4"));

    // The generator prompt carried the formatted context and the question.
    let prompts = chat.prompts_seen().await;
    assert!(prompts[2].contains("Title: iPhone 15 Plus"));
    assert!(prompts[2].contains("QUESTION: What is the price of iPhone 15 Plus?"));
}

#[tokio::test]
async fn test_zero_match_falls_back_to_rewrite_and_web_search() {
    let tools = StubTools::new(
        Some(Ok("[]".to_string())),
        Some(Ok("Top budget gaming laptops in 2024: ...".to_string())),
    );
    let (controller, checkpoints, chat, tools) = build(
        &[
            "retriever",
            "no",
            "  best budget gaming laptops under $800  ",
            "Based on current listings, the best budget options are ...",
        ],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller.run("cheap gaming laptop?", "t1").await.unwrap();
    assert_eq!(
        answer,
        "Based on current listings, the best budget options are ..."
    );

    // Local retrieval used the original query, web search the rewritten one.
    let calls = tools.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        (GET_PRODUCT_INFO.to_string(), "cheap gaming laptop?".to_string())
    );
    assert_eq!(
        calls[1],
        (
            WEB_SEARCH.to_string(),
            "best budget gaming laptops under $800".to_string()
        )
    );

    let state = checkpoints.load("t1").await;
    assert!(state.did_rewrite());
    assert!(state.did_web_search());
    assert_eq!(state.messages()[1].content, NO_LOCAL_RESULTS);
    assert_eq!(
        state.latest_context(),
        Some("Top budget gaming laptops in 2024: ...")
    );

    // The rewrite prompt saw the original question, not the sentinel.
    let prompts = chat.prompts_seen().await;
    assert!(prompts[2].contains("Query: cheap gaming laptop?"));
}

#[tokio::test]
async fn test_small_talk_is_answered_directly() {
    let tools = StubTools::new(Some(Ok("[]".to_string())), Some(Ok(String::new())));
    let (controller, checkpoints, _chat, tools) = build(
        &["direct", "Hello! How can I help you today?"],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller.run("hello", "t1").await.unwrap();
    assert_eq!(answer, "Hello! How can I help you today?");
    assert!(tools.calls().await.is_empty());

    let state = checkpoints.load("t1").await;
    let roles: Vec<MessageRole> = state.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
}

#[tokio::test]
async fn test_unparseable_route_degrades_to_direct() {
    let tools = StubTools::new(Some(Ok("[]".to_string())), None);
    let (controller, _checkpoints, _chat, tools) = build(
        &[
            "I think the retriever would be the best choice here.",
            "Happy to help with product questions.",
        ],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller.run("what can you do?", "t1").await.unwrap();
    assert_eq!(answer, "Happy to help with product questions.");
    assert!(tools.calls().await.is_empty());
}

#[tokio::test]
async fn test_empty_web_results_become_the_no_data_sentinel() {
    let tools = StubTools::new(None, Some(Ok("   ".to_string())));
    let (controller, checkpoints, _chat, _tools) = build(
        &["web_search", "I could not find anything recent on that."],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller
        .run("latest firmware for PixelBuds?", "t1")
        .await
        .unwrap();
    assert_eq!(answer, "I could not find anything recent on that.");

    let state = checkpoints.load("t1").await;
    assert!(state.did_web_search());
    assert_eq!(state.latest_context(), Some(NO_WEB_DATA));
}

#[tokio::test]
async fn test_missing_tools_degrade_to_in_band_messages() {
    let tools = StubTools::new(None, None);
    let (controller, checkpoints, _chat, tools) = build(
        &[
            "retriever",
            "no",
            "rewritten query",
            "I do not have data on that product.",
        ],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller.run("obscure gadget?", "t1").await.unwrap();
    assert_eq!(answer, "I do not have data on that product.");
    assert!(tools.calls().await.is_empty());

    let state = checkpoints.load("t1").await;
    assert_eq!(
        state.messages()[1].content,
        format!("{} tool not available", GET_PRODUCT_INFO)
    );
    assert_eq!(
        state.latest_context(),
        Some(format!("{} tool not available", WEB_SEARCH).as_str())
    );
}

#[tokio::test]
async fn test_tool_failures_flow_in_band() {
    let tools = StubTools::new(
        Some(Err("qdrant unreachable".to_string())),
        Some(Ok("web context".to_string())),
    );
    let (controller, checkpoints, _chat, _tools) = build(
        &["retriever", "no", "rewritten", "answer from the web"],
        tools,
        WorkflowConfig::default(),
    );

    let answer = controller.run("any query", "t1").await.unwrap();
    assert_eq!(answer, "answer from the web");

    let state = checkpoints.load("t1").await;
    let retrieval_context = &state.messages()[1].content;
    assert!(retrieval_context.starts_with("Error retrieving product info:"));
    assert!(retrieval_context.contains("qdrant unreachable"));
}

#[tokio::test]
async fn test_step_cap_ends_the_run_with_the_terminal_message() {
    let tools = StubTools::new(Some(Ok("[]".to_string())), Some(Ok("web".to_string())));
    let (controller, checkpoints, _chat, _tools) = build(
        &["retriever", "no"],
        tools,
        WorkflowConfig { max_steps: 2 },
    );

    let answer = controller.run("anything", "t1").await.unwrap();
    assert_eq!(answer, TRY_ANOTHER_QUERY);

    // The run was cut before the rewriter could touch the flags.
    let state = checkpoints.load("t1").await;
    assert!(!state.did_rewrite());
    assert!(!state.did_web_search());
}

#[tokio::test]
async fn test_thread_history_survives_across_runs() {
    let tools = StubTools::new(None, None);
    let (controller, checkpoints, _chat, _tools) = build(
        &["direct", "Hi!", "direct", "Hi again!"],
        tools,
        WorkflowConfig::default(),
    );

    controller.run("hello", "t1").await.unwrap();
    let answer = controller.run("hello again", "t1").await.unwrap();
    assert_eq!(answer, "Hi again!");

    let state = checkpoints.load("t1").await;
    assert_eq!(state.messages().len(), 4);
    assert_eq!(state.question(), Some("hello"));
    assert_eq!(state.current_query(), Some("hello again"));
    assert!(!state.did_web_search());
    assert!(!state.did_rewrite());

    // Other threads are unaffected.
    assert!(checkpoints.load("t2").await.messages().is_empty());
}
