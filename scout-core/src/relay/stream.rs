use std::time::Duration;

use async_stream::stream;
use futures::stream::{Stream, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error};

use super::translator::EventTranslator;
use super::wire::WireEvent;
use crate::engine::EventStream;
use crate::tools::SEARCH_TOOL_NAME;

#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Tool whose calls are reported as searches
    pub search_tool: String,
    /// Wall-clock bound on a whole run, measured from the first poll
    pub run_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            search_tool: SEARCH_TOOL_NAME.to_string(),
            run_timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl RelayConfig {
    pub fn with_search_tool(mut self, search_tool: impl Into<String>) -> Self {
        self.search_tool = search_tool.into();
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }
}

/// Wire events for one run.
///
/// The announcement, when present, comes first. The stream always finishes
/// with exactly one `End`, preceded by one generic `Error` if the engine
/// failed or the run timed out. Events are pulled from the engine only as
/// the returned stream is polled; dropping it drops the run.
pub fn relay_events(
    config: &RelayConfig,
    announcement: Option<String>,
    mut events: EventStream,
) -> impl Stream<Item = WireEvent> + Send + 'static {
    let mut translator = EventTranslator::new(config.search_tool.clone());
    let run_timeout = config.run_timeout;

    stream! {
        if let Some(thread_id) = announcement {
            yield WireEvent::Session { thread_id };
        }

        let deadline = run_timeout.map(|t| Instant::now() + t);
        loop {
            let next = match deadline {
                Some(deadline) => match timeout_at(deadline, events.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        error!("Run exceeded {:?}, aborting", run_timeout.unwrap_or_default());
                        yield WireEvent::generic_error();
                        break;
                    }
                },
                None => events.next().await,
            };

            match next {
                Some(Ok(event)) => {
                    if let Some(wire) = translator.translate(event) {
                        yield wire;
                    }
                }
                Some(Err(e)) => {
                    error!("Run failed: {}", e);
                    yield WireEvent::generic_error();
                    break;
                }
                None => {
                    debug!("Engine stream finished");
                    break;
                }
            }
        }

        yield WireEvent::End;
    }
}
