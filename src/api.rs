//! HTTP chat surface
//!
//! Serves the chat page at `/` and answers queries at `POST /get`.
//! Every request gets a generated trace id, attached to its log span
//! and echoed back in the `X-Trace-ID` response header. Workflow
//! failures are reported in the response body with status 200 so the
//! chat page can display them like any other answer.

use std::sync::Arc;

use axum::extract::{Form, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{Html, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::app::AppContext;
use crate::errors::Result;

const DEFAULT_THREAD_ID: &str = "default_thread";

const CHAT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>Product Assistant</title>
<style>
  body { font-family: sans-serif; max-width: 720px; margin: 2em auto; }
  #history { border: 1px solid #ccc; padding: 1em; min-height: 300px; }
  .user { color: #1a4f8b; margin: 0.5em 0; }
  .bot { color: #222; margin: 0.5em 0; white-space: pre-wrap; }
  form { display: flex; gap: 0.5em; margin-top: 1em; }
  input[type=text] { flex: 1; padding: 0.5em; }
</style>
</head>
<body>
<h2>Product Assistant</h2>
<div id="history"></div>
<form id="chat">
  <input type="text" name="msg" id="msg" placeholder="Ask about a product..." autofocus>
  <button type="submit">Send</button>
</form>
<script>
  const history = document.getElementById("history");
  document.getElementById("chat").addEventListener("submit", async (e) => {
    e.preventDefault();
    const input = document.getElementById("msg");
    const msg = input.value.trim();
    if (!msg) return;
    input.value = "";
    history.insertAdjacentHTML("beforeend", "<div class='user'></div>");
    history.lastChild.textContent = "You: " + msg;
    const res = await fetch("/get", {
      method: "POST",
      headers: { "Content-Type": "application/x-www-form-urlencoded" },
      body: new URLSearchParams({ msg }),
    });
    const answer = await res.text();
    history.insertAdjacentHTML("beforeend", "<div class='bot'></div>");
    history.lastChild.textContent = "Bot: " + answer;
    history.scrollTop = history.scrollHeight;
  });
</script>
</body>
</html>
"#;

#[derive(Clone)]
pub struct ApiState {
    context: Arc<AppContext>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    msg: String,
    #[serde(default = "default_thread_id")]
    thread_id: String,
}

fn default_thread_id() -> String {
    DEFAULT_THREAD_ID.to_string()
}

/// Build the chat router over a shared application context
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/get", post(chat))
        .layer(middleware::from_fn(attach_trace_id))
        .layer(CorsLayer::permissive())
        .with_state(ApiState { context })
}

/// Bind the configured address and serve until shutdown
pub async fn serve(context: Arc<AppContext>) -> Result<()> {
    let addr = format!(
        "{}:{}",
        context.config.server.host, context.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Chat server listening on http://{}", addr);
    axum::serve(listener, router(context)).await?;
    Ok(())
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn chat(State(state): State<ApiState>, Form(request): Form<ChatRequest>) -> String {
    info!(thread_id = %request.thread_id, "POST /get");

    let controller = state.context.controller();
    match controller.run(&request.msg, &request.thread_id).await {
        Ok(answer) => answer,
        Err(e) => {
            error!(error = %e, "Workflow run failed");
            format!("Error processing request: {}", e)
        }
    }
}

async fn attach_trace_id(request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        %trace_id,
        method = %request.method(),
        path = %request.uri().path()
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-trace-id"), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::config::AppConfig;
    use crate::errors::AssistantError;
    use crate::mcp::ToolClient;
    use crate::models::ChatModel;

    struct ScriptedChat {
        replies: Mutex<VecDeque<crate::errors::Result<String>>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<crate::errors::Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, _prompt: &str) -> crate::errors::Result<String> {
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok("unscripted".to_string()))
        }
    }

    struct NoTools;

    #[async_trait]
    impl ToolClient for NoTools {
        fn has_tool(&self, _name: &str) -> bool {
            false
        }

        async fn call_tool(&self, _name: &str, _query: &str) -> crate::errors::Result<String> {
            Err(AssistantError::Tool("no tools".to_string()))
        }
    }

    fn state_with_chat(chat: ScriptedChat) -> ApiState {
        let context = AppContext::with_parts(
            AppConfig::default(),
            Arc::new(chat),
            Arc::new(NoTools),
        );
        ApiState {
            context: Arc::new(context),
        }
    }

    #[tokio::test]
    async fn test_chat_returns_the_workflow_answer() {
        let scripted = ScriptedChat::new(vec![
            Ok("direct".to_string()),
            Ok("Hello! How can I help?".to_string()),
        ]);
        let state = state_with_chat(scripted);

        let body = chat(
            State(state),
            Form(ChatRequest {
                msg: "hi there".to_string(),
                thread_id: "t1".to_string(),
            }),
        )
        .await;
        assert_eq!(body, "Hello! How can I help?");
    }

    #[tokio::test]
    async fn test_chat_reports_model_failures_in_band() {
        let scripted = ScriptedChat::new(vec![Err(AssistantError::ModelApi(
            "connection refused".to_string(),
        ))]);
        let state = state_with_chat(scripted);

        let body = chat(
            State(state),
            Form(ChatRequest {
                msg: "hi".to_string(),
                thread_id: "t1".to_string(),
            }),
        )
        .await;
        assert!(body.starts_with("Error processing request:"));
        assert!(body.contains("connection refused"));
    }

    #[test]
    fn test_chat_request_defaults_the_thread_id() {
        let request: ChatRequest = serde_json::from_str(r#"{"msg": "hi"}"#).unwrap();
        assert_eq!(request.thread_id, DEFAULT_THREAD_ID);
    }
}
