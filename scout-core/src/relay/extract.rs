use serde_json::Value;

use crate::engine::ToolOutput;

/// Outcome of pulling result URLs out of a search tool's output
#[derive(Debug, Clone, PartialEq)]
pub enum UrlExtraction {
    /// URLs in their original order; may be empty
    Urls(Vec<String>),
    ParseFailure(String),
}

/// Flatten a search tool output into its result URLs.
///
/// Textual output is decoded as JSON first. A list contributes the `url` of
/// each object item carrying one; an object contributes the `url`s found in
/// its `results` list. Anything else has no URLs.
pub fn extract_urls(output: &ToolOutput) -> UrlExtraction {
    let decoded;
    let value = match output {
        ToolOutput::Text(text) | ToolOutput::Structured(Value::String(text)) => {
            match serde_json::from_str::<Value>(text) {
                Ok(v) => {
                    decoded = v;
                    &decoded
                }
                Err(e) => return UrlExtraction::ParseFailure(format!("output is not JSON: {}", e)),
            }
        }
        ToolOutput::Structured(value) => value,
    };

    match value {
        Value::Array(items) => UrlExtraction::Urls(urls_of(items)),
        Value::Object(map) => match map.get("results") {
            None => UrlExtraction::Urls(Vec::new()),
            Some(Value::Array(items)) => UrlExtraction::Urls(urls_of(items)),
            Some(other) => UrlExtraction::ParseFailure(format!(
                "results field is {}, expected a list",
                type_name(other)
            )),
        },
        _ => UrlExtraction::Urls(Vec::new()),
    }
}

fn urls_of(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.as_object()?.get("url")?.as_str())
        .map(str::to_string)
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
