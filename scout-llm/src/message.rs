use openai_dive::v1::resources::chat::{
    ChatCompletionFunction, ChatCompletionTool, ChatCompletionToolType, ChatMessage,
    ChatMessageContent, ChatMessageContentPart, Function, ToolCall,
};
use serde_json::Value;

pub fn system(text: impl Into<String>) -> ChatMessage {
    ChatMessage::System {
        content: ChatMessageContent::Text(text.into()),
        name: None,
    }
}

pub fn user(text: impl Into<String>) -> ChatMessage {
    ChatMessage::User {
        content: ChatMessageContent::Text(text.into()),
        name: None,
    }
}

/// Assistant message; empty text and no calls both serialize as absent
pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> ChatMessage {
    let text = text.into();
    ChatMessage::Assistant {
        content: if text.is_empty() { None } else { Some(ChatMessageContent::Text(text)) },
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        name: None,
        audio: None,
        reasoning_content: None,
        refusal: None,
    }
}

pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> ChatMessage {
    ChatMessage::Tool {
        content: ChatMessageContent::Text(content.into()),
        tool_call_id: tool_call_id.into(),
    }
}

pub fn tool_call(
    id: impl Into<String>,
    name: impl Into<String>,
    arguments: impl Into<String>,
) -> ToolCall {
    ToolCall {
        id: id.into(),
        r#type: "function".to_string(),
        function: Function {
            name: name.into(),
            arguments: arguments.into(),
        },
    }
}

pub fn function_tool(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: Value,
) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: ChatCompletionFunction {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        },
    }
}

/// Flatten message content to plain text, keeping only text parts
pub fn content_text(content: &ChatMessageContent) -> String {
    match content {
        ChatMessageContent::Text(text) => text.clone(),
        ChatMessageContent::ContentPart(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ChatMessageContentPart::Text(text_part) => Some(text_part.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ChatMessageContent::None => String::new(),
    }
}

/// Read-side helpers over `ChatMessage`
pub trait ChatMessageExt {
    fn role(&self) -> &'static str;
    fn text(&self) -> String;
    fn tool_calls(&self) -> &[ToolCall];
}

impl ChatMessageExt for ChatMessage {
    fn role(&self) -> &'static str {
        match self {
            ChatMessage::System { .. } => "system",
            ChatMessage::User { .. } => "user",
            ChatMessage::Assistant { .. } => "assistant",
            ChatMessage::Tool { .. } => "tool",
            _ => "developer",
        }
    }

    fn text(&self) -> String {
        match self {
            ChatMessage::System { content, .. } | ChatMessage::User { content, .. } => content_text(content),
            ChatMessage::Assistant { content, .. } => content.as_ref().map(content_text).unwrap_or_default(),
            ChatMessage::Tool { content, .. } => content_text(content),
            _ => String::new(),
        }
    }

    fn tool_calls(&self) -> &[ToolCall] {
        match self {
            ChatMessage::Assistant { tool_calls: Some(calls), .. } => calls,
            _ => &[],
        }
    }
}
