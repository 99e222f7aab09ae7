//! Public API endpoints
//!
//! Client bootstrap configuration and a secret-free introspection view.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::http::{origin::RequestOrigin, AppState};

/// Create public API router
pub fn create_public_router() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_client_config))
        .route("/api/debug", get(get_debug_info))
}

/// Settings a browser client needs before its first call
#[derive(Debug, Serialize)]
pub struct ClientConfig {
    pub tmdb_proxy_url: String,
    pub cors_proxy_url: String,
    pub enable_local_image_cache: bool,
    pub sync_enabled: bool,
    pub multi_user_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub env: &'static str,
    pub version: &'static str,
    pub tmdb: bool,
    pub sites_inline: bool,
    pub sites_remote: bool,
    pub password_count: usize,
}

/// Get client configuration
///
/// The metadata API key stays server-side; clients go through
/// `/api/tmdb-proxy` instead.
pub async fn get_client_config(
    State(state): State<AppState>,
    origin: RequestOrigin,
) -> impl IntoResponse {
    Json(ClientConfig {
        tmdb_proxy_url: state.config.tmdb.proxy_url().to_string(),
        cors_proxy_url: origin.cors_proxy_base(),
        enable_local_image_cache: false,
        sync_enabled: false,
        multi_user_mode: state.access.multi_user(),
    })
}

pub async fn get_debug_info(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    Json(DebugInfo {
        env: "vodgate",
        version: env!("CARGO_PKG_VERSION"),
        tmdb: config.tmdb.api_key().is_some(),
        sites_inline: config.sites.inline().is_some(),
        sites_remote: config.sites.remote_url().is_some(),
        password_count: state.access.password_count(),
    })
}
