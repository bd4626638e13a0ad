pub mod handler;
pub mod types;

pub use handler::{handle_chat_stream, handle_health};
pub use types::{ChatRequest, HealthResponse};
