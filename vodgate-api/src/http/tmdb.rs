//! Metadata API (TMDB) pass-through
//!
//! The API key never leaves the server: `/api/tmdb-proxy` appends it to the
//! forwarded query, `/api/tmdb-image` streams poster and backdrop files.

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::debug;
use url::Url;

use vodgate_core::Error;
use vodgate_proxy::forward_stream;

use crate::http::{AppError, AppResult, AppState};

const API_CACHE_CONTROL: &str = "public, max-age=3600";
const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Query keys the gateway owns; client values for these are dropped
const RESERVED_PARAMS: &[&str] = &["path", "api_key", "language"];

pub fn create_tmdb_router() -> Router<AppState> {
    Router::new()
        .route("/api/tmdb-proxy", get(tmdb_proxy))
        .route("/api/tmdb-image/{size}/{file}", get(tmdb_image))
}

/// Build the upstream API URL for a client query string.
///
/// Returns `None` when the query has no usable `path`.
fn build_api_url(
    api_base: &str,
    query: &str,
    api_key: &str,
    language: &str,
) -> Option<Url> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let path = pairs
        .iter()
        .find(|(k, _)| k == "path")
        .map(|(_, v)| v.trim())
        .filter(|p| !p.is_empty())?;

    let separator = if path.starts_with('/') { "" } else { "/" };
    let mut url = Url::parse(&format!("{}{separator}{path}", api_base.trim_end_matches('/'))).ok()?;
    url.set_query(None);

    {
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs.iter().filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str())) {
            query.append_pair(key, value);
        }
        query.append_pair("api_key", api_key);
        query.append_pair("language", language);
    }

    Some(url)
}

/// Forward a metadata API call with the server-side key attached
pub async fn tmdb_proxy(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let tmdb = &state.config.tmdb;
    let missing = || Error::Configuration("Missing TMDB Config".to_string());

    let api_key = tmdb.api_key().ok_or_else(missing)?;
    let url = build_api_url(&tmdb.api_base, query.as_deref().unwrap_or_default(), api_key, &tmdb.language)
        .ok_or_else(missing)?;

    debug!(path = url.path(), "Forwarding metadata request");
    let body = state
        .client
        .get(url)
        .timeout(state.config.upstream.timeout())
        .send()
        .await?
        .text()
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8")),
            (header::CACHE_CONTROL, HeaderValue::from_static(API_CACHE_CONTROL)),
        ],
        body,
    )
        .into_response())
}

/// Stream an image file from the metadata image CDN
pub async fn tmdb_image(
    State(state): State<AppState>,
    Path((size, file)): Path<(String, String)>,
) -> AppResult<Response> {
    let target = format!(
        "{}/{}/{}",
        state.config.tmdb.image_base.trim_end_matches('/'),
        size,
        file
    );

    let upstream = tokio::time::timeout(state.config.upstream.timeout(), state.client.get(&target).send())
        .await
        .map_err(|_| AppError::internal(format!("Image request timed out: {target}")))??;

    Ok(forward_stream(upstream, Some(IMAGE_CACHE_CONTROL))?)
}
