//! Fan-out search over Server-Sent Events
//!
//! Each source that answers with results becomes one `data:` event holding
//! its tagged items. Once every source has answered, failed or timed out, a
//! final `event: done` closes the stream.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use vodgate_core::{SearchEvent, Source};

use crate::http::{AppError, AppResult, AppState};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn create_search_router() -> Router<AppState> {
    Router::new().route("/api/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub wd: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let keyword = query
        .wd
        .filter(|wd| !wd.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Missing wd"))?;

    let resolved = state.registry.resolve().await;
    let sources: Vec<Source> = resolved.sites.active().cloned().collect();
    debug!(
        keyword = %keyword,
        origin = %resolved.origin,
        sources = sources.len(),
        "Starting fan-out search"
    );

    let events = state.search_engine.search(&keyword, sources)?;
    let stream = events.map(|event| Ok(to_sse_event(event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

fn to_sse_event(event: SearchEvent) -> Event {
    match event {
        SearchEvent::Chunk(chunk) => Event::default().json_data(&chunk).unwrap_or_else(|e| {
            warn!("Failed to encode search chunk: {e}");
            Event::default().data("[]")
        }),
        SearchEvent::Done => Event::default().event("done").data("{}"),
    }
}

