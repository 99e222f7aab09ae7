//! Playlist rewrite proxy endpoint
//!
//! `GET /api/cors?url=<target>` fetches the target on the client's behalf.
//! HLS playlists come back with every reference routed through this same
//! endpoint; everything else is streamed through.

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use vodgate_proxy::parse_target;

use crate::http::{origin::RequestOrigin, AppError, AppResult, AppState};

pub fn create_cors_proxy_router() -> Router<AppState> {
    Router::new().route("/api/cors", get(proxy))
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

pub async fn proxy(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Query(query): Query<ProxyQuery>,
) -> AppResult<Response> {
    let raw = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Missing url"))?;
    let target = parse_target(&raw)?;

    Ok(state.proxy.fetch(&target, &origin.cors_proxy_base()).await?)
}
