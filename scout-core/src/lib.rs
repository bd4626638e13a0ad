pub mod agent;
pub mod engine;
pub mod relay;
pub mod store;
pub mod tools;

pub use agent::{AgentConfig, ToolAgent};
pub use engine::{
    AgentEngine, EngineError, EventStream, ExecutionEvent, RunRequest, ToolCallRequest, ToolOutput,
};
pub use relay::{relay_events, resolve_thread, EventTranslator, RelayConfig, ResolvedThread, WireEvent};
pub use store::{InMemorySessionStore, SessionStore, StoreError};
pub use tools::{SearchConfig, Tool, ToolError, ToolSet, WebSearch, SEARCH_TOOL_NAME};
