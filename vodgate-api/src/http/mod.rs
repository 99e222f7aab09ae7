// Module: http
// HTTP/JSON surface of the gateway, mounted under /api

pub mod auth;
pub mod cors_proxy;
pub mod error;
pub mod health;
pub mod origin;
pub mod public;
pub mod search;
pub mod sites;
pub mod tmdb;

use axum::{
    http::{header, Method},
    response::{IntoResponse, Response},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vodgate_core::access::AccessGate;
use vodgate_core::{Config, SearchEngine, SourceRegistry};
use vodgate_proxy::PlaylistProxy;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Pooled client shared by every upstream call
    pub client: Client,
    pub registry: SourceRegistry,
    pub search_engine: SearchEngine,
    pub proxy: PlaylistProxy,
    pub access: Arc<AccessGate>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, client: Client) -> Self {
        let registry = SourceRegistry::new(config.sites.clone(), client.clone());
        let search_engine = SearchEngine::new(client.clone(), &config.search);
        let proxy = PlaylistProxy::new(client.clone(), &config.proxy, &config.upstream);
        let access = Arc::new(AccessGate::new(&config.access));

        Self {
            config: Arc::new(config),
            client,
            registry,
            search_engine,
            proxy,
            access,
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check endpoint (for monitoring probes)
        .merge(health::create_health_router())
        // Client bootstrap and introspection
        .merge(public::create_public_router())
        // Source registry and pass-through detail lookup
        .merge(sites::create_sites_router())
        // Fan-out search (SSE)
        .merge(search::create_search_router())
        // Metadata API and image pass-through
        .merge(tmdb::create_tmdb_router())
        // Access password
        .merge(auth::create_auth_router())
        // Playlist rewrite proxy
        .merge(cors_proxy::create_cors_proxy_router())
        .fallback(api_not_found);

    // Apply layers before state; CORS sits outside the panic handler so
    // even a crashed handler answers with CORS headers
    let router = router
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http());

    // Apply state to all routes (must be last)
    router.with_state(state)
}

async fn api_not_found() -> Response {
    AppError::not_found("API Not Found").into_response()
}
