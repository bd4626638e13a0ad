use std::collections::BTreeMap;
use std::fmt::Display;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use openai_dive::v1::resources::chat::{
    ChatCompletionChunkResponse, ChatCompletionTool, ChatMessage, DeltaChatMessage, DeltaToolCall,
};

use crate::error::LlmError;
use crate::message::{assistant, content_text, tool_call};

/// Progress of one streamed model turn
#[derive(Debug, Clone)]
pub enum ChatStreamEvent {
    /// A fragment of assistant text, in arrival order
    Delta(String),
    /// The complete assistant message, always the last item of a turn
    Done(ChatMessage),
}

pub type ChatStream = BoxStream<'static, Result<ChatStreamEvent, LlmError>>;

/// A chat model that can stream one assistant turn
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<ChatStream, LlmError>;
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed chunks back into a single assistant message
///
/// Tool calls arrive split across chunks and are keyed by their `index`;
/// id and name show up once, argument text is appended fragment by fragment.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    content: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
}

impl ResponseAccumulator {
    /// Absorb a chunk, returning the text delta it carried, if any
    pub fn push(&mut self, chunk: ChatCompletionChunkResponse) -> Option<String> {
        let mut text = String::new();

        for choice in chunk.choices {
            let (content, tool_calls) = match choice.delta {
                DeltaChatMessage::Assistant { content, tool_calls, .. }
                | DeltaChatMessage::Untagged { content, tool_calls, .. } => (content, tool_calls),
                _ => continue,
            };
            if let Some(content) = content {
                text.push_str(&content_text(&content));
            }
            for delta in tool_calls.unwrap_or_default() {
                self.merge_tool_call(delta);
            }
        }

        if text.is_empty() {
            return None;
        }
        self.content.push_str(&text);
        Some(text)
    }

    fn merge_tool_call(&mut self, delta: DeltaToolCall) {
        let call = self.tool_calls.entry(delta.index.unwrap_or(0)).or_default();
        if let Some(id) = delta.id {
            call.id = id;
        }
        if let Some(name) = delta.function.name {
            call.name.push_str(&name);
        }
        if let Some(arguments) = delta.function.arguments {
            call.arguments.push_str(&arguments);
        }
    }

    pub fn finish(self) -> ChatMessage {
        let tool_calls = self
            .tool_calls
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| tool_call(call.id, call.name, call.arguments))
            .collect();
        assistant(self.content, tool_calls)
    }
}

/// Turn a chunk stream into deltas followed by the assembled message
pub fn fold_chunks<S, E>(mut chunks: S) -> impl Stream<Item = Result<ChatStreamEvent, LlmError>>
where
    S: Stream<Item = Result<ChatCompletionChunkResponse, E>> + Unpin,
    E: Display,
{
    try_stream! {
        let mut acc = ResponseAccumulator::default();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| LlmError::Stream(e.to_string()))?;
            if let Some(text) = acc.push(chunk) {
                yield ChatStreamEvent::Delta(text);
            }
        }
        yield ChatStreamEvent::Done(acc.finish());
    }
}
