//! Forward proxy with HLS playlist rewriting
//!
//! Fetches an arbitrary target URL. Playlists are buffered and rewritten so
//! every segment, key and variant link points back at the proxy; any other
//! payload is streamed through untouched.

pub mod playlist;

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use vodgate_core::config::{ProxyConfig, UpstreamConfig};
use vodgate_core::http_client::read_body_with_limit;

pub use playlist::{is_playlist, rewrite_playlist, PLAYLIST_CONTENT_TYPE};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Invalid url: {0}")]
    InvalidTarget(String),

    #[error("Proxy request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Proxy request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to read playlist: {0}")]
    Playlist(#[from] vodgate_core::Error),

    #[error("Failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Parse a client-supplied target, accepting only http(s) URLs.
pub fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let url = Url::parse(raw.trim()).map_err(|e| ProxyError::InvalidTarget(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ProxyError::InvalidTarget(format!(
            "unsupported scheme '{scheme}'"
        ))),
    }
}

#[derive(Clone)]
pub struct PlaylistProxy {
    client: Client,
    user_agent: String,
    header_timeout: Duration,
    max_playlist_bytes: usize,
}

impl PlaylistProxy {
    #[must_use]
    pub fn new(client: Client, proxy: &ProxyConfig, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            user_agent: proxy.user_agent.clone(),
            header_timeout: upstream.timeout(),
            max_playlist_bytes: proxy.max_playlist_bytes,
        }
    }

    /// Fetch `target` and return it to the client.
    ///
    /// Successful playlist responses are rewritten against `proxy_base`
    /// (e.g. `https://gw.example/api/cors`). Everything else keeps the
    /// upstream status and content type and is streamed as it arrives.
    pub async fn fetch(&self, target: &Url, proxy_base: &str) -> Result<Response, ProxyError> {
        let request = self
            .client
            .get(target.clone())
            .header(header::USER_AGENT, self.user_agent.as_str());

        let upstream = tokio::time::timeout(self.header_timeout, request.send())
            .await
            .map_err(|_| ProxyError::Timeout(self.header_timeout))??;

        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if upstream.status().is_success() && is_playlist(target, &content_type) {
            debug!(target = %target, "Rewriting playlist");
            let body = read_body_with_limit(upstream, self.max_playlist_bytes).await?;
            let text = String::from_utf8_lossy(&body);
            let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
            let rewritten = rewrite_playlist(text, target, proxy_base);

            return Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)
                .header(header::CACHE_CONTROL, "no-cache")
                .body(Body::from(rewritten))?);
        }

        forward_stream(upstream, None)
    }
}

/// Stream an upstream response to the client, keeping its status and
/// content type and optionally setting a cache directive.
pub fn forward_stream(
    upstream: reqwest::Response,
    cache_control: Option<&'static str>,
) -> Result<Response, ProxyError> {
    let mut builder = Response::builder().status(upstream.status());

    if let Some(content_type) = upstream.headers().get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, content_type.clone());
    }
    if let Some(directive) = cache_control {
        builder = builder.header(header::CACHE_CONTROL, HeaderValue::from_static(directive));
    }

    Ok(builder.body(Body::from_stream(upstream.bytes_stream()))?)
}
