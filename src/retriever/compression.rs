//! LLM relevance filtering of retrieved documents
//!
//! Each document gets a yes/no relevance judgment against the question.
//! Judgment failures keep the document, so filtering can only narrow the
//! result set, never empty it by accident.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::ChatModel;
use crate::prompts::PromptTemplate;
use crate::types::Document;

const RELEVANCE_TEMPLATE: &str =
    "Given the following question and context, return YES if the context is \
     relevant to the question and NO if it isn't.\n\
     \n\
     > Question: {question}\n\
     > Context: {context}\n\
     > Relevant (YES / NO):";

/// Per-document relevance filter backed by the chat model
pub struct RelevanceFilter {
    chat: Arc<dyn ChatModel>,
    template: PromptTemplate,
}

impl RelevanceFilter {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            template: PromptTemplate::new("relevance_filter", RELEVANCE_TEMPLATE, ""),
        }
    }

    /// Drop documents the model judges irrelevant to the question
    pub async fn filter(&self, question: &str, documents: Vec<Document>) -> Vec<Document> {
        let mut kept = Vec::with_capacity(documents.len());

        for document in documents {
            if self.is_relevant(question, &document).await {
                kept.push(document);
            } else {
                debug!(
                    title = %document.metadata.product_title,
                    "Dropping document judged irrelevant"
                );
            }
        }

        kept
    }

    async fn is_relevant(&self, question: &str, document: &Document) -> bool {
        let prompt = match self.template.format(&[
            ("question", question),
            ("context", &document.page_content),
        ]) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Relevance prompt failed to format: {}", e);
                return true;
            }
        };

        match self.chat.complete(&prompt).await {
            Ok(reply) => reply.to_lowercase().contains("yes"),
            Err(e) => {
                // Fail open: an unjudged document stays in the set
                warn!("Relevance judgment failed: {}", e);
                true
            }
        }
    }
}
