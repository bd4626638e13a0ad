use uuid::Uuid;

/// Thread id clients send when they have no conversation yet
pub const NEW_THREAD_SENTINEL: &str = "new";

/// Which thread a run belongs to, and whether the client still has to learn its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedThread {
    pub thread_id: String,
    pub is_new: bool,
}

impl ResolvedThread {
    /// Id to announce to the client before any other output, for new threads only
    pub fn announcement(&self) -> Option<String> {
        self.is_new.then(|| self.thread_id.clone())
    }
}

/// Reuse the requested thread, or mint a fresh one when the client sent
/// nothing, a blank id, or the `"new"` sentinel
pub fn resolve_thread(requested: Option<&str>) -> ResolvedThread {
    match requested.map(str::trim) {
        Some(id) if !id.is_empty() && id != NEW_THREAD_SENTINEL => ResolvedThread {
            thread_id: id.to_string(),
            is_new: false,
        },
        _ => ResolvedThread {
            thread_id: Uuid::new_v4().to_string(),
            is_new: true,
        },
    }
}
