//! Relay from engine execution events to the client wire protocol.
//!
//! [`resolve_thread`] decides which thread a request runs on,
//! [`EventTranslator`] maps execution events one by one, and
//! [`relay_events`] frames a whole run: announcement, translated events,
//! failure reporting and the final `end`.

mod extract;
mod session;
mod stream;
mod translator;
mod wire;

pub use extract::{extract_urls, UrlExtraction};
pub use session::{resolve_thread, ResolvedThread, NEW_THREAD_SENTINEL};
pub use stream::{relay_events, RelayConfig};
pub use translator::EventTranslator;
pub use wire::{WireEvent, GENERIC_ERROR_MESSAGE};
