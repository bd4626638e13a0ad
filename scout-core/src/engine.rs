use futures::stream::BoxStream;
use scout_llm::{ChatMessage, LlmError, ToolCall};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::store::StoreError;

/// One unit of progress reported by an engine run
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// A fragment of model output text
    ModelTokenDelta { text: String },
    /// A model turn finished, possibly requesting tool calls
    ModelRunEnd { tool_calls: Vec<ToolCallRequest> },
    /// A tool call finished
    ToolRunEnd {
        call_id: String,
        tool_name: String,
        output: ToolOutput,
    },
}

/// Tool call as requested by the model, arguments already decoded
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub args: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Decode a raw model tool call; unparseable arguments become `null`
    pub fn from_tool_call(call: &ToolCall) -> Self {
        let args = if call.function.arguments.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                warn!(
                    "Tool call {} ({}) has malformed arguments: {}",
                    call.id, call.function.name, e
                );
                Value::Null
            })
        };
        Self::new(call.id.clone(), call.function.name.clone(), args)
    }
}

/// Raw tool output, either a textual encoding or already-structured data
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(Value),
}

impl ToolOutput {
    /// Content handed back to the model as the tool message
    pub fn to_text(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Structured(Value::String(text)) => text.clone(),
            ToolOutput::Structured(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model failed: {0}")]
    Model(#[from] LlmError),

    #[error("session store failed: {0}")]
    Store(#[from] StoreError),

    #[error("model turn ended without a response")]
    IncompleteResponse,

    #[error("run exceeded {0} model steps")]
    StepLimit(usize),

    #[error("{0}")]
    Other(String),
}

pub type EventStream = BoxStream<'static, Result<ExecutionEvent, EngineError>>;

/// Input of a single run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub thread_id: String,
    pub message: ChatMessage,
}

impl RunRequest {
    pub fn new(thread_id: impl Into<String>, message: ChatMessage) -> Self {
        Self {
            thread_id: thread_id.into(),
            message,
        }
    }
}

/// Something that can execute a run for a thread and report its progress
///
/// The returned stream is lazy: no work happens until it is polled, and
/// dropping it abandons the run.
pub trait AgentEngine: Send + Sync {
    fn run(&self, request: RunRequest) -> EventStream;
}
