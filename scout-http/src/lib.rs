pub mod apis;
pub mod error;
pub mod http;
pub mod session;
pub mod streaming;

pub use error::{ApiJson, ErrorResponse};
pub use http::{router, start_server, ServerConfig, ServerState};
pub use session::{SessionManager, SessionManagerConfig};
pub use streaming::wire_to_sse_stream;
