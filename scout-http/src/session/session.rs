use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::RunLifecycle;

/// A conversation thread known to this server
///
/// Serializes runs: at most one run per thread streams at a time.
pub struct ThreadSession {
    run_lock: Arc<Mutex<()>>,
    pub thread_id: String,
}

impl ThreadSession {
    pub fn new(thread_id: String) -> Self {
        Self {
            run_lock: Arc::new(Mutex::new(())),
            thread_id,
        }
    }

    /// Wait for any run in progress on this thread, then claim it
    pub async fn begin_run(&self, http_request_id: &str) -> RunLifecycle {
        debug!("[{}] - [{}] Acquiring run lock", http_request_id, self.thread_id);
        let guard = self.run_lock.clone().lock_owned().await;
        debug!("[{}] - [{}] Run lock acquired", http_request_id, self.thread_id);
        RunLifecycle::new(guard, http_request_id.to_string(), self.thread_id.clone())
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }
}
