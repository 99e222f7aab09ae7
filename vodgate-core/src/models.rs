//! Request-scoped data model shared by the registry, the search engine and
//! the HTTP layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A third-party content-search backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Unique, stable identifier
    pub key: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Base API endpoint
    #[serde(rename = "api", alias = "endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub active: bool,
    /// Fields the gateway does not interpret, echoed back untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
        active: bool,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            active,
            extra: Map::new(),
        }
    }
}

/// Ordered source list as served by `/sites`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteList {
    #[serde(default)]
    pub sites: Vec<Source>,
}

impl SiteList {
    /// Sources the search engine should fan out to, in registration order
    pub fn active(&self) -> impl Iterator<Item = &Source> {
        self.sites.iter().filter(|s| s.active)
    }

    /// Look up a source by key, active or not
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Source> {
        self.sites.iter().find(|s| s.key == key)
    }
}

/// One search result as returned by a source, after tagging
pub type ResultItem = Map<String, Value>;

/// Normalized results of one source, emitted as a single stream event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SearchChunk {
    pub items: Vec<ResultItem>,
}

impl SearchChunk {
    /// Stamp every item of a raw `list` with the source it came from.
    ///
    /// Objects are tagged in place. Anything else a garbled upstream put in
    /// the list is replaced by an object carrying only the tags.
    #[must_use]
    pub fn tagged(source: &Source, list: Vec<Value>) -> Self {
        let items = list
            .into_iter()
            .map(|item| {
                let mut item = match item {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                item.insert("site_key".to_string(), Value::String(source.key.clone()));
                item.insert("site_name".to_string(), Value::String(source.name.clone()));
                item
            })
            .collect();

        Self { items }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Event produced by a fan-out search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Chunk(SearchChunk),
    /// Terminal marker; nothing follows it
    Done,
}
