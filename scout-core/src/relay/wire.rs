use serde::{Deserialize, Serialize};

/// Message sent to clients when a run fails; internal detail stays in the logs
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// One unit of the client-facing stream, encoded as a JSON object with a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Announces the id of a freshly minted thread
    #[serde(rename = "checkpoint")]
    Session {
        #[serde(rename = "checkpoint_id")]
        thread_id: String,
    },
    #[serde(rename = "content")]
    Token {
        #[serde(rename = "content")]
        text: String,
    },
    SearchStart {
        query: String,
    },
    SearchResults {
        urls: Vec<String>,
        /// Query of the call these results answer, when it could be correlated
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },
    Error {
        message: String,
    },
    End,
}

impl WireEvent {
    pub fn generic_error() -> Self {
        WireEvent::Error {
            message: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    /// Whether a consumer should stop reading after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, WireEvent::Error { .. } | WireEvent::End)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WireEvent::Session { .. } => "checkpoint",
            WireEvent::Token { .. } => "content",
            WireEvent::SearchStart { .. } => "search_start",
            WireEvent::SearchResults { .. } => "search_results",
            WireEvent::Error { .. } => "error",
            WireEvent::End => "end",
        }
    }
}
