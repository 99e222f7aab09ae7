//! Shared upstream HTTP client
//!
//! One connection pool per process. The client carries no overall request
//! timeout because proxied media bodies can stream for minutes; callers put
//! their own bound on each request.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;

use crate::config::Config;
use crate::error::{Error, Result};

/// Build the process-wide client from configuration
pub fn build_client(config: &Config) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.upstream.connect_timeout())
        .pool_max_idle_per_host(16)
        .user_agent(config.proxy.user_agent.as_str())
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Read a response body, refusing anything larger than `limit` bytes.
///
/// The declared `Content-Length` is checked up front, then the body is
/// accumulated chunk by chunk so an undeclared oversized body is cut off
/// without being buffered in full.
pub async fn read_body_with_limit(response: reqwest::Response, limit: usize) -> Result<Bytes> {
    if let Some(declared) = response.content_length() {
        if declared > limit as u64 {
            return Err(Error::ResponseTooLarge {
                size: declared,
                limit,
            });
        }
    }

    let mut buf = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(Error::ResponseTooLarge {
                size: (buf.len() + chunk.len()) as u64,
                limit,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}
