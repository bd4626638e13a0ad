use async_trait::async_trait;
use futures::stream::StreamExt;
use openai_dive::v1::api::Client;
use openai_dive::v1::resources::chat::{
    ChatCompletionParameters, ChatCompletionParametersBuilder, ChatCompletionTool, ChatMessage,
};
use tracing::debug;

use crate::error::LlmError;
use crate::stream::{fold_chunks, ChatModel, ChatStream};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.7),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Streaming chat client backed by `openai_dive`
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Config("api key must not be empty".to_string()));
        }
        let mut client = Client::new(config.api_key.clone());
        client.set_base_url(config.base_url.trim_end_matches('/'));
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn parameters(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ChatCompletionParameters, LlmError> {
        build_parameters(&self.config, messages, tools)
    }
}

fn build_parameters(
    config: &LlmConfig,
    messages: Vec<ChatMessage>,
    tools: Vec<ChatCompletionTool>,
) -> Result<ChatCompletionParameters, LlmError> {
    let mut builder = ChatCompletionParametersBuilder::default();
    builder.model(config.model.clone()).messages(messages);
    if !tools.is_empty() {
        builder.tools(tools);
    }
    if let Some(temperature) = config.temperature {
        builder.temperature(temperature);
    }
    builder
        .build()
        .map_err(|e| LlmError::Request(e.to_string()))
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ChatStream, LlmError> {
        debug!(
            "Opening completion stream model={} messages={} tools={}",
            self.config.model,
            messages.len(),
            tools.len()
        );
        let parameters = self.parameters(messages, tools)?;
        let chunks = self
            .client
            .chat()
            .create_stream(parameters)
            .await
            .map_err(|e| LlmError::Stream(e.to_string()))?;
        Ok(fold_chunks(chunks).boxed())
    }
}
