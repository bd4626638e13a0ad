mod lifecycle;
mod manager;
mod session;

pub use lifecycle::RunLifecycle;
pub use manager::{SessionError, SessionManager, SessionManagerConfig};
pub use session::ThreadSession;

use scout_core::ResolvedThread;

/// A request's claim on a thread: which thread, and the lock held while streaming
pub struct RunSession {
    pub thread: ResolvedThread,
    pub lifecycle: RunLifecycle,
}
