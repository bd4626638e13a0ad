use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use super::extract::{extract_urls, UrlExtraction};
use super::wire::WireEvent;
use crate::engine::{ExecutionEvent, ToolCallRequest};
use crate::tools::SEARCH_TOOL_NAME;

/// Turns one run's execution events into wire events, in arrival order.
///
/// Each execution event yields at most one wire event. The only state is
/// the set of search calls whose results have not arrived yet, keyed by call
/// id, so results can be labelled with the query that produced them.
#[derive(Debug)]
pub struct EventTranslator {
    search_tool: String,
    pending: HashMap<String, String>,
}

impl Default for EventTranslator {
    fn default() -> Self {
        Self::new(SEARCH_TOOL_NAME)
    }
}

impl EventTranslator {
    pub fn new(search_tool: impl Into<String>) -> Self {
        Self {
            search_tool: search_tool.into(),
            pending: HashMap::new(),
        }
    }

    pub fn translate(&mut self, event: ExecutionEvent) -> Option<WireEvent> {
        match event {
            ExecutionEvent::ModelTokenDelta { text } => Some(WireEvent::Token { text }),
            ExecutionEvent::ModelRunEnd { tool_calls } => self.on_model_run_end(tool_calls),
            ExecutionEvent::ToolRunEnd {
                call_id,
                tool_name,
                output,
            } => {
                if tool_name != self.search_tool {
                    debug!("Ignoring result of tool {} ({})", tool_name, call_id);
                    return None;
                }
                let query = self.pending.remove(&call_id);
                match extract_urls(&output) {
                    UrlExtraction::Urls(urls) if urls.is_empty() => None,
                    UrlExtraction::Urls(urls) => Some(WireEvent::SearchResults { urls, query }),
                    UrlExtraction::ParseFailure(reason) => {
                        warn!("Error processing tool output of {}: {}", call_id, reason);
                        None
                    }
                }
            }
        }
    }

    fn on_model_run_end(&mut self, tool_calls: Vec<ToolCallRequest>) -> Option<WireEvent> {
        let mut announced = None;

        for call in tool_calls {
            if call.name != self.search_tool {
                debug!("Model requested non-search tool {} ({})", call.name, call.id);
                continue;
            }
            let query = query_of(&call.args);
            if announced.is_none() {
                announced = Some(query.clone());
            }
            self.pending.insert(call.id, query);
        }

        announced.map(|query| WireEvent::SearchStart { query })
    }

    /// Search calls announced but not yet answered
    pub fn pending_searches(&self) -> usize {
        self.pending.len()
    }
}

fn query_of(args: &Value) -> String {
    args.get("query")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
