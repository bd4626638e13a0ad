use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use scout_core::WireEvent;
use std::convert::Infallible;
use tracing::{debug, error};

use crate::session::RunLifecycle;

/// Frame a run's wire events as SSE, one `data:` frame per event
///
/// The lifecycle rides along with the stream so the thread's run lock is
/// held exactly as long as the response body is alive. The stream stops
/// after `End`; if the client disconnects first, dropping the body drops the
/// wire stream and with it the engine run.
pub fn wire_to_sse_stream<S>(
    wire: S,
    lifecycle: RunLifecycle,
) -> impl Stream<Item = Result<Event, Infallible>>
where
    S: Stream<Item = WireEvent> + Send + 'static,
{
    futures::stream::unfold(
        (wire.boxed(), lifecycle, false),
        |(mut wire, mut lifecycle, done)| async move {
            if done {
                return None;
            }

            loop {
                let Some(event) = wire.next().await else {
                    return None;
                };

                let is_terminal = matches!(event, WireEvent::End);
                if is_terminal {
                    lifecycle.finish();
                }
                debug!(
                    "[{}] - [{}] Sending {} event",
                    lifecycle.request_id(),
                    lifecycle.thread_id(),
                    event.kind()
                );

                match serde_json::to_string(&event) {
                    Ok(json) => {
                        let sse_event = Event::default().data(json);
                        return Some((Ok(sse_event), (wire, lifecycle, is_terminal)));
                    }
                    Err(e) => {
                        error!(
                            "[{}] - [{}] Failed to serialize event: {}",
                            lifecycle.request_id(),
                            lifecycle.thread_id(),
                            e
                        );
                        if is_terminal {
                            return None;
                        }
                        continue;
                    }
                }
            }
        },
    )
}
