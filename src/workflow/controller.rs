//! The workflow control loop
//!
//! Runs one query through the node graph: route, retrieve, grade,
//! then either generate or fall back through rewrite and web search.
//! Tool failures become in-band context so the generator can still
//! answer; only chat model failures abort the run.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::mcp::{ToolClient, GET_PRODUCT_INFO, WEB_SEARCH};
use crate::models::ChatModel;
use crate::prompts::{PromptRegistry, PromptRole, PromptTemplate};

use super::checkpoint::CheckpointStore;
use super::state::{
    ConversationState, GraderVerdict, RetrievedContext, RouteDecision, WorkflowNode,
};

/// Context stand-in when web search yields nothing or was already used
pub const NO_WEB_DATA: &str = "No data from web";

/// Terminal answer once every fallback is exhausted
pub const TRY_ANOTHER_QUERY: &str = "No relevant results found. Please try another query.";

const DEFAULT_MAX_STEPS: usize = 8;

/// Tunables for the run loop
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Hard cap on node executions per run
    pub max_steps: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Drives a conversation thread through the workflow graph
pub struct WorkflowController {
    chat: Arc<dyn ChatModel>,
    tools: Arc<dyn ToolClient>,
    prompts: PromptRegistry,
    checkpoints: Arc<CheckpointStore>,
    config: WorkflowConfig,
    direct: PromptTemplate,
    grader: PromptTemplate,
    rewrite: PromptTemplate,
}

impl WorkflowController {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolClient>,
        prompts: PromptRegistry,
        checkpoints: Arc<CheckpointStore>,
        config: WorkflowConfig,
    ) -> Self {
        let direct = PromptTemplate::new(
            "direct_answer",
            "You are a helpful assistant. Answer the user directly.\n\
             \n\
             Question: {question}\n\
             Answer:",
            "Answers small-talk and non-product queries without context",
        );
        let grader = PromptTemplate::new(
            "context_grader",
            "You are a grader. Question: {question}\n\
             Docs: {docs}\n\
             \n\
             Are docs relevant to the question? Answer yes or no.",
            "Judges whether retrieved context can answer the question",
        );
        let rewrite = PromptTemplate::new(
            "query_rewriter",
            "Rewrite this user query to make it more clear and specific for a search engine. \
             Do NOT answer the query. Only rewrite it.\n\
             \n\
             Query: {question}\n\
             Rewritten Query:",
            "Reformulates a query that retrieved nothing useful",
        );

        Self {
            chat,
            tools,
            prompts,
            checkpoints,
            config,
            direct,
            grader,
            rewrite,
        }
    }

    /// Run one query on a thread and return the final answer text.
    ///
    /// State is loaded from the checkpoint store before the run and
    /// saved after it, including runs ended by the step cap.
    pub async fn run(&self, query: &str, thread_id: &str) -> Result<String> {
        let mut state = self.checkpoints.load(thread_id).await;
        state.begin_run(query);
        info!(thread_id, query, "Workflow run started");

        let mut node = WorkflowNode::Assistant;
        let mut steps = 0usize;
        loop {
            steps += 1;
            if steps > self.config.max_steps {
                warn!(steps, "Step cap reached, ending the run");
                state.push_assistant(TRY_ANOTHER_QUERY);
                break;
            }
            debug!(node = node.display_name(), step = steps, "Entering node");

            node = match node {
                WorkflowNode::Assistant => match self.route(&mut state).await? {
                    Some(next) => next,
                    None => break,
                },
                WorkflowNode::Retriever => {
                    self.retrieve(&mut state).await;
                    match self.grade(&state).await? {
                        GraderVerdict::Relevant => WorkflowNode::Generator,
                        GraderVerdict::NotRelevant => WorkflowNode::Rewriter,
                    }
                }
                WorkflowNode::WebSearch => {
                    self.web_search(&mut state).await;
                    WorkflowNode::Generator
                }
                WorkflowNode::Generator => {
                    self.generate(&mut state).await?;
                    break;
                }
                WorkflowNode::Rewriter => {
                    if self.rewrite_query(&mut state).await? {
                        WorkflowNode::WebSearch
                    } else {
                        break;
                    }
                }
            };
        }

        let answer = state.final_answer().unwrap_or_default().to_string();
        self.checkpoints.save(thread_id, state).await;
        info!(thread_id, "Workflow run finished");
        Ok(answer)
    }

    /// Classify the query; `Direct` answers inline and ends the run
    async fn route(&self, state: &mut ConversationState) -> Result<Option<WorkflowNode>> {
        let query = state.current_query().unwrap_or_default().to_string();
        let prompt = self
            .prompts
            .get(PromptRole::RouterBot)
            .format(&[("query", &query)])?;
        let reply = self.chat.complete(&prompt).await?;

        let decision = match RouteDecision::parse(&reply) {
            Some(decision) => decision,
            None => {
                warn!(
                    reply = reply.trim(),
                    "Router reply matched no route, answering directly"
                );
                RouteDecision::Direct
            }
        };
        info!(?decision, "Route selected");

        match decision {
            RouteDecision::Retriever => Ok(Some(WorkflowNode::Retriever)),
            RouteDecision::WebSearch => Ok(Some(WorkflowNode::WebSearch)),
            RouteDecision::Direct => {
                let prompt = self.direct.format(&[("question", &query)])?;
                let answer = self.chat.complete(&prompt).await?;
                state.push_assistant(answer);
                Ok(None)
            }
        }
    }

    /// Fetch local product context; failures become context text
    async fn retrieve(&self, state: &mut ConversationState) {
        let query = state.current_query().unwrap_or_default().to_string();

        let context = if self.tools.has_tool(GET_PRODUCT_INFO) {
            match self.tools.call_tool(GET_PRODUCT_INFO, &query).await {
                Ok(payload) => RetrievedContext::from_json_payload(&payload).render(),
                Err(e) => {
                    warn!(error = %e, "Product retrieval failed");
                    format!("Error retrieving product info: {}", e)
                }
            }
        } else {
            warn!("{} tool not available", GET_PRODUCT_INFO);
            format!("{} tool not available", GET_PRODUCT_INFO)
        };

        state.push_tool(context);
    }

    async fn grade(&self, state: &ConversationState) -> Result<GraderVerdict> {
        let question = state.question().unwrap_or_default().to_string();
        let docs = state.latest_context().unwrap_or_default().to_string();
        let prompt = self
            .grader
            .format(&[("question", &question), ("docs", &docs)])?;
        let reply = self.chat.complete(&prompt).await?;
        let verdict = GraderVerdict::from_reply(&reply);
        info!(?verdict, "Context graded");
        Ok(verdict)
    }

    /// Compose the final answer from the latest context
    async fn generate(&self, state: &mut ConversationState) -> Result<()> {
        let question = state.question().unwrap_or_default().to_string();
        let context = state.latest_context().unwrap_or_default().to_string();
        let prompt = self
            .prompts
            .get(PromptRole::ProductBot)
            .format(&[("context", &context), ("question", &question)])?;
        let answer = self.chat.complete(&prompt).await?;
        state.push_assistant(answer);
        Ok(())
    }

    /// Rewrite the original question once per run. Returns false when
    /// the single rewrite was already used and the run must end.
    async fn rewrite_query(&self, state: &mut ConversationState) -> Result<bool> {
        if state.did_rewrite() {
            info!("Query was already rewritten once, ending the run");
            state.push_assistant(TRY_ANOTHER_QUERY);
            return Ok(false);
        }

        let question = state.question().unwrap_or_default().to_string();
        let prompt = self.rewrite.format(&[("question", &question)])?;
        let reply = self.chat.complete(&prompt).await?;
        let rewritten = reply.trim().to_string();
        info!(rewritten = rewritten.as_str(), "Query rewritten");
        state.push_user(rewritten);
        state.mark_rewrite();
        Ok(true)
    }

    /// Search the web once per run; a second entry yields the no-data
    /// sentinel without calling the tool
    async fn web_search(&self, state: &mut ConversationState) {
        if state.did_web_search() {
            info!("Web search already used in this run, skipping");
            state.push_tool(NO_WEB_DATA);
            return;
        }
        state.mark_web_search();

        let query = state.current_query().unwrap_or_default().to_string();
        let text = if self.tools.has_tool(WEB_SEARCH) {
            match self.tools.call_tool(WEB_SEARCH, &query).await {
                Ok(text) if text.trim().is_empty() => NO_WEB_DATA.to_string(),
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Web search failed");
                    format!("Error during web search: {}", e)
                }
            }
        } else {
            warn!("{} tool not available", WEB_SEARCH);
            format!("{} tool not available", WEB_SEARCH)
        };

        state.push_tool(text);
    }
}
