mod search;

pub use search::{SearchArgs, SearchConfig, WebSearch, SEARCH_TOOL_NAME};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use scout_llm::message::function_tool;
use scout_llm::ChatCompletionTool;
use serde_json::Value;
use thiserror::Error;

use crate::engine::ToolOutput;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// A tool the model may call
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError>;

    fn definition(&self) -> ChatCompletionTool {
        function_tool(self.name(), self.description(), self.parameters())
    }
}

/// Tools bound to an agent, in registration order
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later tool with the same name replaces the earlier one
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        let name = tool.name().to_string();
        match self.by_name.get(&name) {
            Some(&idx) => self.tools[idx] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
