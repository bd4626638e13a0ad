use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("invalid llm configuration: {0}")]
    Config(String),

    #[error("llm request could not be built: {0}")]
    Request(String),

    #[error("llm stream failed: {0}")]
    Stream(String),
}
