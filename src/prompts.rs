//! Prompt templates and the central registry
//!
//! Templates are immutable after construction. `format` substitutes
//! `{name}` placeholders and fails listing every missing name, so a bad
//! call site is diagnosed in one pass. `{{` and `}}` escape literal braces.

use crate::errors::{AssistantError, Result};

/// Roles served by the central registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    /// Final answer composition over retrieved context
    ProductBot,
    /// Route classification for incoming queries
    RouterBot,
}

impl PromptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::ProductBot => "product_bot",
            PromptRole::RouterBot => "router_bot",
        }
    }
}

/// A named, versioned prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    name: String,
    template: String,
    pub description: String,
    pub version: String,
}

impl PromptTemplate {
    pub fn new(name: &str, template: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            template: template.trim().to_string(),
            description: description.to_string(),
            version: "v1".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut chars = self.template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                }
                '{' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next == '}' {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    chars.next();
                    if !name.is_empty() && !names.contains(&name) {
                        names.push(name);
                    }
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                }
                _ => {}
            }
        }

        names
    }

    /// Render the template, failing if any placeholder has no value
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|name| !values.iter().any(|(key, _)| key == name))
            .collect();

        if !missing.is_empty() {
            return Err(AssistantError::MissingPlaceholders {
                template: self.name.clone(),
                names: missing,
            });
        }

        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if next == '}' {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    chars.next();
                    if let Some((_, value)) = values.iter().find(|(key, _)| *key == name) {
                        out.push_str(value);
                    }
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                _ => out.push(c),
            }
        }

        Ok(out)
    }
}

/// Read-only registry of the role-keyed templates
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    product_bot: PromptTemplate,
    router_bot: PromptTemplate,
}

impl PromptRegistry {
    /// Build the registry with the built-in template set
    pub fn builtin() -> Self {
        let product_bot = PromptTemplate::new(
            PromptRole::ProductBot.as_str(),
            "You are an expert EcommerceBot specialized in product recommendations and handling customer queries.\n\
             Analyze the provided product titles, ratings, and reviews to provide accurate, helpful responses.\n\
             Stay relevant to the context, and keep your answers concise and informative.\n\
             \n\
             CONTEXT:\n\
             {context}\n\
             \n\
             QUESTION: {question}\n\
             \n\
             YOUR ANSWER:",
            "Handles ecommerce QnA & product recommendation flows",
        );

        let router_bot = PromptTemplate::new(
            PromptRole::RouterBot.as_str(),
            "You are a router agent in an Agentic RAG workflow.\n\
             \n\
             Priority rules:\n\
             1. If the query is about a product (price, reviews, features, comparison, etc.),\n\
                always choose **retriever** first.\n\
             2. If retriever has no relevant results, fallback to **web_search**.\n\
             3. If the query is small-talk or unrelated to products, answer **direct**.\n\
             \n\
             Query: {query}\n\
             \n\
             Options:\n\
             - \"retriever\"\n\
             - \"web_search\"\n\
             - \"direct\"\n\
             \n\
             Return ONLY one option.",
            "Decides whether to use retriever, web search, or answer directly",
        );

        Self {
            product_bot,
            router_bot,
        }
    }

    pub fn get(&self, role: PromptRole) -> &PromptTemplate {
        match role {
            PromptRole::ProductBot => &self.product_bot,
            PromptRole::RouterBot => &self.router_bot,
        }
    }
}
