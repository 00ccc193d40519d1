//! Agentic workflow: routing, retrieval grading, and fallback control

pub mod checkpoint;
pub mod controller;
pub mod state;

pub use checkpoint::CheckpointStore;
pub use controller::{WorkflowConfig, WorkflowController, NO_WEB_DATA, TRY_ANOTHER_QUERY};
pub use state::{
    ChatMessage, ConversationState, GraderVerdict, MessageRole, RetrievedContext, RouteDecision,
    WorkflowNode, NO_LOCAL_RESULTS,
};
