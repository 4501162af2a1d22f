//! SSE endpoints for batch progress streaming

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use uuid::Uuid;

use crate::AppState;
use paindex_common::sse::batch_event_stream;

/// GET /import/events/{batch_id}
///
/// Stream the events of one import batch. The stream closes after the
/// batch's `complete` or fatal `error` event.
pub async fn import_event_stream(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    batch_event_stream(state.event_bus.subscribe(), batch_id)
}

/// GET /migration/events/{batch_id}
pub async fn migration_event_stream(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    batch_event_stream(state.event_bus.subscribe(), batch_id)
}

/// Build SSE routes
pub fn sse_routes() -> Router<AppState> {
    Router::new()
        .route("/import/events/:batch_id", get(import_event_stream))
        .route("/migration/events/:batch_id", get(migration_event_stream))
}
