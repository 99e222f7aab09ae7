//! Public origin of the gateway as seen by the client
//!
//! Links handed back to clients (the playlist proxy base, `/config`) must
//! point at the address the client used, which behind a reverse proxy is not
//! the address we listen on.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::http::AppState;

/// `scheme://host[:port]` without a trailing slash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl RequestOrigin {
    /// Base URL of the playlist proxy endpoint
    #[must_use]
    pub fn cors_proxy_base(&self) -> String {
        format!("{}/api/cors", self.0)
    }

    fn from_headers(headers: &HeaderMap, fallback_host: Option<&str>) -> Self {
        let scheme = forwarded_value(headers, "x-forwarded-proto").unwrap_or("http");
        let host = forwarded_value(headers, "x-forwarded-host")
            .or_else(|| header_str(headers, header::HOST.as_str()))
            .or(fallback_host)
            .unwrap_or("localhost");

        Self(format!("{scheme}://{host}"))
    }
}

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(origin) = state
            .config
            .server
            .public_origin
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
        {
            return Ok(Self(origin.trim_end_matches('/').to_string()));
        }

        let authority = parts.uri.authority().map(|a| a.as_str().to_string());
        Ok(Self::from_headers(&parts.headers, authority.as_deref()))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// Proxies append to these headers; the first entry is the client-facing one
fn forwarded_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    header_str(headers, name)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
