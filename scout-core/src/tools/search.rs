use std::time::Duration;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Tool, ToolError};
use crate::engine::ToolOutput;

pub const SEARCH_TOOL_NAME: &str = "tavily_search";

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com";

#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub api_key: String,
    pub endpoint: String,
    pub max_results: usize,
    pub timeout: Duration,
}

impl SearchConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_results: 5,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// Free-text search query
    pub query: String,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    max_results: usize,
}

/// Web search backed by the Tavily search API
pub struct WebSearch {
    http: reqwest::Client,
    config: SearchConfig,
}

impl WebSearch {
    pub fn new(config: SearchConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Execution(format!("failed to build http client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web for current information using Tavily search engine."
    }

    fn parameters(&self) -> Value {
        serde_json::to_value(schema_for!(SearchArgs)).unwrap_or_else(|_| {
            json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })
        })
    }

    async fn call(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: SearchArgs =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        debug!("Searching the web for {:?}", args.query);

        let response = self
            .http
            .post(self.search_url())
            .bearer_auth(&self.config.api_key)
            .json(&SearchBody {
                query: &args.query,
                max_results: self.config.max_results,
            })
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            warn!("Search API returned {}: {}", status, body);
            return Err(ToolError::Execution(format!(
                "search API returned status {}",
                status
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("search response was not JSON: {}", e)))?;
        Ok(ToolOutput::Structured(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_query() {
        let tool = WebSearch::new(SearchConfig::new("key")).unwrap();
        let schema = tool.parameters();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["query"].is_object());
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn search_url_strips_trailing_slash() {
        let tool = WebSearch::new(SearchConfig::new("key").with_endpoint("http://localhost:9000/")).unwrap();
        assert_eq!(tool.search_url(), "http://localhost:9000/search");
    }

    #[tokio::test]
    async fn missing_query_is_invalid_arguments() {
        let tool = WebSearch::new(SearchConfig::new("key")).unwrap();
        let err = tool.call(json!({"q": "rust"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
