//! In-memory conversation checkpoints keyed by thread id

use std::collections::HashMap;

use tokio::sync::Mutex;

use super::state::ConversationState;

/// Thread-keyed snapshot store. Unknown threads load as fresh state.
#[derive(Debug, Default)]
pub struct CheckpointStore {
    threads: Mutex<HashMap<String, ConversationState>>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, thread_id: &str) -> ConversationState {
        self.threads
            .lock()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn save(&self, thread_id: &str, state: ConversationState) {
        self.threads
            .lock()
            .await
            .insert(thread_id.to_string(), state);
    }

    pub async fn thread_count(&self) -> usize {
        self.threads.lock().await.len()
    }
}
