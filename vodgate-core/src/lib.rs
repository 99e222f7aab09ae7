pub mod access;
pub mod bootstrap;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod models;
pub mod search;
pub mod sources;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{SearchChunk, SearchEvent, SiteList, Source};
pub use search::{SearchEngine, SearchStream};
pub use sources::{ResolvedSites, SourceOrigin, SourceRegistry};
