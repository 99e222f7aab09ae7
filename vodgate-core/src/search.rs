//! Fan-out search engine
//!
//! One worker per active source, each bounded by its own timeout. A single
//! coordinator task forwards worker results in completion order into a
//! bounded channel and emits [`SearchEvent::Done`] once every worker has
//! settled. Worker failures are logged and dropped. Dropping the returned
//! stream closes the channel, the coordinator notices, and dropping its
//! `JoinSet` aborts every request still in flight.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::encoding::encode_uri_component;
use crate::error::{Error, Result};
use crate::http_client::read_body_with_limit;
use crate::models::{SearchChunk, SearchEvent, Source};

/// Events of one search, ending with [`SearchEvent::Done`]
pub type SearchStream = ReceiverStream<SearchEvent>;

#[derive(Clone)]
pub struct SearchEngine {
    client: Client,
    source_timeout: Duration,
    max_response_bytes: usize,
}

impl SearchEngine {
    #[must_use]
    pub fn new(client: Client, config: &SearchConfig) -> Self {
        Self {
            client,
            source_timeout: config.source_timeout(),
            max_response_bytes: config.max_response_bytes,
        }
    }

    /// Override the per-source timeout
    #[must_use]
    pub const fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    /// Fan `keyword` out to every active source.
    ///
    /// Rejects a blank keyword before touching the network. The returned
    /// stream yields at most one chunk per active source, in completion
    /// order, followed by exactly one `Done`.
    pub fn search<I>(&self, keyword: &str, sources: I) -> Result<SearchStream>
    where
        I: IntoIterator<Item = Source>,
    {
        if keyword.trim().is_empty() {
            return Err(Error::InvalidInput("Missing wd".to_string()));
        }

        let sources: Vec<Source> = sources.into_iter().filter(|s| s.active).collect();
        let (tx, rx) = mpsc::channel(sources.len() + 1);

        let mut workers = JoinSet::new();
        for source in sources {
            let worker = SourceWorker {
                client: self.client.clone(),
                timeout: self.source_timeout,
                max_response_bytes: self.max_response_bytes,
            };
            let keyword = keyword.to_string();
            workers.spawn(async move { worker.run(source, keyword).await });
        }

        tokio::spawn(coordinate(workers, tx));

        Ok(ReceiverStream::new(rx))
    }
}

/// Forward settled workers to the consumer, then close with `Done`.
async fn coordinate(mut workers: JoinSet<Option<SearchChunk>>, tx: mpsc::Sender<SearchEvent>) {
    let total = workers.len();
    let mut emitted = 0usize;

    loop {
        tokio::select! {
            () = tx.closed() => {
                debug!(pending = workers.len(), "Search consumer went away, aborting workers");
                return;
            }
            joined = workers.join_next() => match joined {
                None => break,
                Some(Ok(Some(chunk))) => {
                    if tx.send(SearchEvent::Chunk(chunk)).await.is_err() {
                        return;
                    }
                    emitted += 1;
                }
                Some(Ok(None)) => {}
                Some(Err(e)) => warn!(error = %e, "Search worker did not complete"),
            }
        }
    }

    debug!(sources = total, chunks = emitted, "Search fan-out complete");
    let _ = tx.send(SearchEvent::Done).await;
}

struct SourceWorker {
    client: Client,
    timeout: Duration,
    max_response_bytes: usize,
}

impl SourceWorker {
    /// Query one source. `None` means nothing to emit, either because the
    /// source failed or because it had no results.
    async fn run(self, source: Source, keyword: String) -> Option<SearchChunk> {
        let result = tokio::time::timeout(self.timeout, self.query(&source, &keyword))
            .await
            .unwrap_or_else(|_| {
                Err(Error::Upstream(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                )))
            });

        match result {
            Ok(chunk) if chunk.is_empty() => None,
            Ok(chunk) => {
                debug!(site_key = %source.key, items = chunk.len(), "Source answered");
                Some(chunk)
            }
            Err(e) => {
                warn!(site_key = %source.key, error = %e, "Source search failed");
                None
            }
        }
    }

    async fn query(&self, source: &Source, keyword: &str) -> Result<SearchChunk> {
        let url = search_url(&source.endpoint, keyword);
        let response = self.client.get(&url).send().await?;
        let body = read_body_with_limit(response, self.max_response_bytes).await?;
        let payload: Value = serde_json::from_slice(&body)?;
        Ok(SearchChunk::tagged(source, extract_list(payload)))
    }
}

/// `{endpoint}?ac=detail&wd={keyword}`
#[must_use]
pub fn search_url(endpoint: &str, keyword: &str) -> String {
    format!("{endpoint}?ac=detail&wd={}", encode_uri_component(keyword))
}

/// Pull the result list out of a source payload; absent or non-array means
/// no results.
fn extract_list(payload: Value) -> Vec<Value> {
    match payload {
        Value::Object(mut map) => match map.remove("list") {
            Some(Value::Array(list)) => list,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
