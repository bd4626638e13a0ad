use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

/// Holds a thread's run lock for the duration of one streamed response
///
/// Dropped when the response body is dropped, either because the stream
/// reached its end or because the client went away. In both cases the lock
/// is released so the next request for the thread can proceed; in the second
/// case the engine run has already been dropped along with the stream.
pub struct RunLifecycle {
    _run_guard: OwnedMutexGuard<()>,
    request_id: String,
    thread_id: String,
    finished: bool,
}

impl RunLifecycle {
    pub fn new(run_guard: OwnedMutexGuard<()>, request_id: String, thread_id: String) -> Self {
        Self {
            _run_guard: run_guard,
            request_id,
            thread_id,
            finished: false,
        }
    }

    /// Mark the run as fully delivered
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

impl Drop for RunLifecycle {
    fn drop(&mut self) {
        if self.finished {
            debug!("[{}] - [{}] Stream completed, releasing run lock", self.request_id, self.thread_id);
        } else {
            info!("[{}] - [{}] Client disconnected, run cancelled", self.request_id, self.thread_id);
        }
    }
}
