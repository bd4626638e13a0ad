pub mod client;
pub mod error;
pub mod message;
pub mod stream;

pub use client::{LlmClient, LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::LlmError;
pub use message::ChatMessageExt;
pub use openai_dive::v1::resources::chat::{
    ChatCompletionTool, ChatMessage, ChatMessageContent, Function, ToolCall,
};
pub use stream::{fold_chunks, ChatModel, ChatStream, ChatStreamEvent, ResponseAccumulator};
