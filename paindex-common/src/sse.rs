//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE plumbing for streaming [`ImportEvent`]s to admin clients.

use crate::events::ImportEvent;
use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stream the events of one batch over SSE.
///
/// Forwards every event whose `batch_id` matches, with a heartbeat comment
/// every 15 seconds. The stream ends after the batch's final event
/// (`complete` or a fatal `error`), which is therefore guaranteed to be the
/// last event on the wire. A client disconnect simply drops the receiver;
/// the pipeline itself is unaffected.
pub fn batch_event_stream(
    mut rx: broadcast::Receiver<ImportEvent>,
    batch_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(batch_id = %batch_id, "New SSE client connected to batch events");

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                // Heartbeat keeps intermediaries from closing an idle stream
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) if event.batch_id() == batch_id => {
                            let event_type = event.event_type();
                            let is_final = event.is_final();

                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    debug!(batch_id = %batch_id, event = event_type, "SSE: forwarding event");
                                    yield Ok(Event::default().event(event_type).data(json));
                                }
                                Err(e) => {
                                    warn!(batch_id = %batch_id, error = %e, "SSE: failed to serialize event");
                                }
                            }

                            if is_final {
                                info!(batch_id = %batch_id, "SSE: batch finished, closing stream");
                                break;
                            }
                        }
                        Ok(_) => {
                            // Event for a different batch
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(batch_id = %batch_id, missed, "SSE: client lagged, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
