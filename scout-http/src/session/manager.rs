use scout_core::{resolve_thread, SessionStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{RunSession, ThreadSession};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Maximum number of threads reached: {0}")]
    CapacityReached(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Configuration for the session manager
#[derive(Clone, Debug, Default)]
pub struct SessionManagerConfig {
    /// Maximum number of threads (None = unlimited)
    pub max_threads: Option<usize>,
}

/// Session manager - resolves thread ids and serializes runs per thread
///
/// Conversation history itself lives in the session store, which the
/// engine writes to; the manager only tracks which threads exist and who is
/// currently running on them.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    sessions: Mutex<HashMap<String, Arc<ThreadSession>>>,
    max_threads: Option<usize>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionManagerConfig) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
            max_threads: config.max_threads,
        }
    }

    /// Find or admit the thread's session
    ///
    /// Admission runs under the sessions lock and reserves the thread in the
    /// store before releasing it, so concurrent requests see each other's
    /// threads when checking `max_threads`. Any id unknown to the store counts
    /// as a new thread, whether minted here or chosen by the client.
    async fn admit(&self, http_request_id: &str, thread_id: &str) -> Result<Arc<ThreadSession>, SessionError> {
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get(thread_id) {
            info!("[{}] - [{}] Using existing thread", http_request_id, thread_id);
            return Ok(session.clone());
        }

        if self.store.contains(thread_id).await? {
            info!("[{}] - [{}] Resuming stored thread", http_request_id, thread_id);
        } else {
            if let Some(max) = self.max_threads {
                if self.store.thread_count().await? >= max {
                    warn!("[{}] Refusing new thread, limit {} reached", http_request_id, max);
                    return Err(SessionError::CapacityReached(max));
                }
            }
            self.store.reserve(thread_id).await?;
            info!("[{}] - [{}] Opening thread", http_request_id, thread_id);
        }

        let session = Arc::new(ThreadSession::new(thread_id.to_string()));
        sessions.insert(thread_id.to_string(), session.clone());
        Ok(session)
    }

    /// Handle an incoming request's thread id
    /// - `"new"`, blank: mint a fresh thread
    /// - anything else: reuse that thread, waiting for any run already on it
    ///
    /// Threads not yet known are subject to `max_threads`.
    pub async fn begin_run(
        &self,
        http_request_id: &str,
        requested_thread_id: &str,
    ) -> Result<RunSession, SessionError> {
        let thread = resolve_thread(Some(requested_thread_id));
        let session = self.admit(http_request_id, &thread.thread_id).await?;
        let lifecycle = session.begin_run(http_request_id).await;

        Ok(RunSession { thread, lifecycle })
    }

    /// Number of threads in the store, reserved ones included
    pub async fn thread_count(&self) -> Result<usize, SessionError> {
        Ok(self.store.thread_count().await?)
    }

    /// Whether a run is currently streaming on the thread
    pub async fn is_running(&self, thread_id: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(thread_id)
            .map(|s| s.is_running())
            .unwrap_or(false)
    }
}
