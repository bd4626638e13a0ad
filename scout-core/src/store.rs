use std::collections::HashMap;

use async_trait::async_trait;
use scout_llm::ChatMessage;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Conversation history keyed by thread id
///
/// Threads are created by `reserve` or lazily by the first append; reading an
/// unknown thread yields an empty history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    async fn append(&self, thread_id: &str, message: ChatMessage) -> Result<(), StoreError> {
        self.append_all(thread_id, vec![message]).await
    }

    /// Append several messages as one unit; readers never observe a prefix
    async fn append_all(&self, thread_id: &str, messages: Vec<ChatMessage>) -> Result<(), StoreError>;

    /// Create an empty thread, returning false if it already existed
    async fn reserve(&self, thread_id: &str) -> Result<bool, StoreError>;

    async fn contains(&self, thread_id: &str) -> Result<bool, StoreError>;

    async fn thread_count(&self) -> Result<usize, StoreError>;
}

/// Process-lifetime store, lost on restart
#[derive(Default)]
pub struct InMemorySessionStore {
    threads: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self
            .threads
            .lock()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_all(&self, thread_id: &str, messages: Vec<ChatMessage>) -> Result<(), StoreError> {
        let mut threads = self.threads.lock().await;
        let history = threads.entry(thread_id.to_string()).or_insert_with(|| {
            debug!("[] - [{}] Materializing thread", thread_id);
            Vec::new()
        });
        history.extend(messages);
        Ok(())
    }

    async fn reserve(&self, thread_id: &str) -> Result<bool, StoreError> {
        let mut threads = self.threads.lock().await;
        if threads.contains_key(thread_id) {
            return Ok(false);
        }
        threads.insert(thread_id.to_string(), Vec::new());
        Ok(true)
    }

    async fn contains(&self, thread_id: &str) -> Result<bool, StoreError> {
        Ok(self.threads.lock().await.contains_key(thread_id))
    }

    async fn thread_count(&self) -> Result<usize, StoreError> {
        Ok(self.threads.lock().await.len())
    }
}
