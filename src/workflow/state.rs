//! Conversation state and workflow decision types
//!
//! The per-thread record is an append-only message sequence plus two
//! single-use flags bounding the fallback loops. Flags only advance
//! false to true within a run; a new run resets them while keeping the
//! thread's messages.

use serde::{Deserialize, Serialize};

use crate::types::Document;

/// Context stand-in for an empty local retrieval
pub const NO_LOCAL_RESULTS: &str = "No local results found.";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// One turn in a conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
        }
    }
}

/// Per-thread workflow state, owned by one run at a time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    did_web_search: bool,
    did_rewrite: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run: reset the loop guards and append the user query
    pub fn begin_run(&mut self, query: &str) {
        self.did_web_search = false;
        self.did_rewrite = false;
        self.messages.push(ChatMessage::user(query));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    pub fn push_tool(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::tool(content));
    }

    /// The question being answered: the first user message of the thread
    pub fn question(&self) -> Option<&str> {
        self.find_first(MessageRole::User)
    }

    /// The query to search with: the latest user message (rewrites
    /// append a new one)
    pub fn current_query(&self) -> Option<&str> {
        self.find_last(MessageRole::User)
    }

    /// The latest retrieved or searched context
    pub fn latest_context(&self) -> Option<&str> {
        self.find_last(MessageRole::Tool)
    }

    /// The latest assistant answer
    pub fn final_answer(&self) -> Option<&str> {
        self.find_last(MessageRole::Assistant)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn did_web_search(&self) -> bool {
        self.did_web_search
    }

    pub fn did_rewrite(&self) -> bool {
        self.did_rewrite
    }

    pub fn mark_web_search(&mut self) {
        self.did_web_search = true;
    }

    pub fn mark_rewrite(&mut self) {
        self.did_rewrite = true;
    }

    fn find_first(&self, role: MessageRole) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }

    fn find_last(&self, role: MessageRole) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }
}

/// Route chosen for an incoming query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Retriever,
    WebSearch,
    Direct,
}

impl RouteDecision {
    /// Parse a model reply: strip wrapping quotes, trim, lowercase.
    /// Anything unrecognized is `None`; callers degrade that to `Direct`.
    pub fn parse(raw: &str) -> Option<RouteDecision> {
        let normalized = raw.replace(['"', '\''], "");
        match normalized.trim().to_lowercase().as_str() {
            "retriever" => Some(RouteDecision::Retriever),
            "web_search" => Some(RouteDecision::WebSearch),
            "direct" => Some(RouteDecision::Direct),
            _ => None,
        }
    }
}

/// Grading outcome for retrieved context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraderVerdict {
    Relevant,
    NotRelevant,
}

impl GraderVerdict {
    /// An affirmative token anywhere in the reply counts as relevant
    pub fn from_reply(reply: &str) -> Self {
        if reply.to_lowercase().contains("yes") {
            GraderVerdict::Relevant
        } else {
            GraderVerdict::NotRelevant
        }
    }
}

/// Named steps of the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowNode {
    Assistant,
    Retriever,
    WebSearch,
    Generator,
    Rewriter,
}

impl WorkflowNode {
    pub fn display_name(&self) -> &'static str {
        match self {
            WorkflowNode::Assistant => "Assistant",
            WorkflowNode::Retriever => "Retriever",
            WorkflowNode::WebSearch => "WebSearch",
            WorkflowNode::Generator => "Generator",
            WorkflowNode::Rewriter => "Rewriter",
        }
    }
}

/// Formatted retrieval output; "no results" is a distinguished value
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievedContext {
    Empty,
    Blocks(Vec<String>),
}

impl RetrievedContext {
    pub fn from_documents(documents: &[Document]) -> Self {
        if documents.is_empty() {
            return RetrievedContext::Empty;
        }
        RetrievedContext::Blocks(documents.iter().map(format_document).collect())
    }

    /// Parse the JSON document list a retrieval tool returns. Malformed
    /// payloads are treated as an empty result set.
    pub fn from_json_payload(raw: &str) -> Self {
        match serde_json::from_str::<Vec<Document>>(raw) {
            Ok(documents) => Self::from_documents(&documents),
            Err(_) => RetrievedContext::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RetrievedContext::Empty)
    }

    pub fn render(&self) -> String {
        match self {
            RetrievedContext::Empty => NO_LOCAL_RESULTS.to_string(),
            RetrievedContext::Blocks(blocks) => blocks.join("\n\n---\n\n"),
        }
    }
}

fn format_document(document: &Document) -> String {
    let meta = &document.metadata;
    let title = non_empty_or(&meta.product_title, "N/A");
    let price = non_empty_or(&meta.price, "N/A");
    let rating = meta
        .rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "Title: {}\nPrice: {}\nRating: {}\nReviews:\n{}",
        title, price, rating, document.page_content
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductMetadata;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_question_and_current_query_diverge_after_rewrite() {
        let mut state = ConversationState::new();
        state.begin_run("What do users say about iPhone 15 Plus?");
        state.push_tool("No local results found.");
        state.push_user("iPhone 15 Plus user reviews and ratings");

        assert_eq!(
            state.question(),
            Some("What do users say about iPhone 15 Plus?")
        );
        assert_eq!(
            state.current_query(),
            Some("iPhone 15 Plus user reviews and ratings")
        );
        assert_eq!(state.latest_context(), Some("No local results found."));
        assert_eq!(state.final_answer(), None);
    }

    #[test]
    fn test_flags_are_monotonic_within_a_run() {
        let mut state = ConversationState::new();
        state.begin_run("q");
        assert!(!state.did_web_search());
        assert!(!state.did_rewrite());

        state.mark_web_search();
        state.mark_rewrite();
        state.mark_web_search();
        assert!(state.did_web_search());
        assert!(state.did_rewrite());
    }

    #[test]
    fn test_begin_run_resets_flags_but_keeps_messages() {
        let mut state = ConversationState::new();
        state.begin_run("first");
        state.mark_web_search();
        state.push_assistant("answer one");

        state.begin_run("second");
        assert!(!state.did_web_search());
        assert!(!state.did_rewrite());
        assert_eq!(state.messages().len(), 3);
        assert_eq!(state.question(), Some("first"));
        assert_eq!(state.current_query(), Some("second"));
    }

    #[test]
    fn test_route_parsing_normalizes() {
        assert_eq!(
            RouteDecision::parse("retriever"),
            Some(RouteDecision::Retriever)
        );
        assert_eq!(
            RouteDecision::parse("  \"Retriever\"  "),
            Some(RouteDecision::Retriever)
        );
        assert_eq!(
            RouteDecision::parse("'WEB_SEARCH'"),
            Some(RouteDecision::WebSearch)
        );
        assert_eq!(RouteDecision::parse("Direct"), Some(RouteDecision::Direct));
        assert_eq!(RouteDecision::parse("use the retriever tool"), None);
        assert_eq!(RouteDecision::parse(""), None);
    }

    #[quickcheck]
    fn prop_route_parse_never_panics(raw: String) -> bool {
        match RouteDecision::parse(&raw) {
            Some(_) => {
                let normalized = raw.replace(['"', '\''], "").trim().to_lowercase();
                ["retriever", "web_search", "direct"].contains(&normalized.as_str())
            }
            None => true,
        }
    }

    #[test]
    fn test_grader_verdict_from_reply() {
        assert_eq!(
            GraderVerdict::from_reply("Yes, they are."),
            GraderVerdict::Relevant
        );
        assert_eq!(GraderVerdict::from_reply("YES"), GraderVerdict::Relevant);
        assert_eq!(GraderVerdict::from_reply("no"), GraderVerdict::NotRelevant);
        assert_eq!(GraderVerdict::from_reply(""), GraderVerdict::NotRelevant);
    }

    #[test]
    fn test_empty_and_malformed_payloads_render_the_sentinel() {
        assert_eq!(RetrievedContext::from_json_payload("[]").render(), NO_LOCAL_RESULTS);
        assert_eq!(
            RetrievedContext::from_json_payload("not json at all").render(),
            NO_LOCAL_RESULTS
        );
        assert!(RetrievedContext::from_json_payload("{\"page_content\": 3}").is_empty());
    }

    #[test]
    fn test_blocks_render_with_metadata_lines() {
        let documents = vec![
            Document::new(
                "Love the camera.",
                ProductMetadata {
                    product_title: "iPhone 15 Plus".to_string(),
                    price: "$899".to_string(),
                    rating: Some(4.5),
                    ..Default::default()
                },
            ),
            Document::new("Battery could be better.", ProductMetadata::default()),
        ];

        let rendered = RetrievedContext::from_documents(&documents).render();
        let blocks: Vec<&str> = rendered.split("\n\n---\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("Title: iPhone 15 Plus\nPrice: $899\nRating: 4.5"));
        assert!(blocks[0].ends_with("Reviews:\nLove the camera."));
        assert!(blocks[1].starts_with("Title: N/A\nPrice: N/A\nRating: N/A"));
    }
}
