//! Source registry endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

use vodgate_core::encoding::encode_uri_component;
use vodgate_core::Error;

use crate::http::{AppResult, AppState};

pub fn create_sites_router() -> Router<AppState> {
    Router::new()
        .route("/api/sites", get(list_sites))
        .route("/api/detail", get(get_detail))
}

/// Currently resolved source list
pub async fn list_sites(State(state): State<AppState>) -> impl IntoResponse {
    let resolved = state.registry.resolve().await;
    debug!(origin = %resolved.origin, count = resolved.sites.sites.len(), "Resolved sites");
    Json(resolved.sites)
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub id: Option<String>,
    pub site_key: Option<String>,
}

/// Fetch one item's detail record from the source it came from.
///
/// The upstream body is relayed as-is.
pub async fn get_detail(
    State(state): State<AppState>,
    Query(query): Query<DetailQuery>,
) -> AppResult<Response> {
    let resolved = state.registry.resolve().await;
    let site = query
        .site_key
        .as_deref()
        .and_then(|key| resolved.sites.find(key))
        .ok_or_else(|| Error::NotFound("Site not found".to_string()))?;

    let id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidInput("Missing id".to_string()))?;

    let url = format!("{}?ac=detail&ids={}", site.endpoint, encode_uri_component(id));
    debug!(site_key = %site.key, id, "Fetching detail");

    let body = state
        .client
        .get(&url)
        .timeout(state.config.upstream.timeout())
        .send()
        .await?
        .text()
        .await?;

    Ok((
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        body,
    )
        .into_response())
}
