//! Source Registry
//!
//! Resolves the list of search sources from layered configuration. Every
//! resolution is computed from scratch: inline value, then remote URL, then
//! the built-in list. Degraded tiers are logged and skipped; resolution
//! itself never fails.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::SitesConfig;
use crate::http_client::read_body_with_limit;
use crate::models::{SiteList, Source};

/// Upper bound for a remote site list body
const MAX_REMOTE_LIST_BYTES: usize = 4 * 1024 * 1024;

/// Which tier produced a site list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Inline,
    Remote,
    Builtin,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inline => "inline",
            Self::Remote => "remote",
            Self::Builtin => "builtin",
        };
        f.write_str(s)
    }
}

/// A site list together with the tier it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSites {
    pub origin: SourceOrigin,
    pub sites: SiteList,
}

/// Built-in fallback list
#[must_use]
pub fn builtin_sites() -> SiteList {
    SiteList {
        sites: vec![
            Source::new(
                "ffzy",
                "非凡资源",
                "https://api.ffzyapi.com/api.php/provide/vod/",
                true,
            ),
            Source::new(
                "lzzy",
                "量子资源",
                "https://cj.lziapi.com/api.php/provide/vod/",
                true,
            ),
            Source::new(
                "snzy",
                "索尼资源",
                "https://suoniapi.com/api.php/provide/vod/",
                true,
            ),
        ],
    }
}

/// Parse an inline site list: plain JSON first, Base64-wrapped JSON second.
#[must_use]
pub fn parse_inline(raw: &str) -> Option<SiteList> {
    let raw = raw.trim();

    if let Ok(list) = serde_json::from_str::<SiteList>(raw) {
        return Some(list);
    }

    [&STANDARD, &URL_SAFE, &URL_SAFE_NO_PAD]
        .into_iter()
        .find_map(|engine| engine.decode(raw).ok())
        .and_then(|decoded| serde_json::from_slice::<SiteList>(&decoded).ok())
}

/// Resolves the active site list for each request
#[derive(Clone)]
pub struct SourceRegistry {
    config: SitesConfig,
    client: Client,
}

impl SourceRegistry {
    #[must_use]
    pub const fn new(config: SitesConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Resolve the current site list. Never fails: the built-in list is the
    /// last resort.
    pub async fn resolve(&self) -> ResolvedSites {
        if let Some(raw) = self.config.inline() {
            match parse_inline(raw) {
                Some(sites) => {
                    debug!(count = sites.sites.len(), "Using inline site list");
                    return ResolvedSites {
                        origin: SourceOrigin::Inline,
                        sites,
                    };
                }
                None => warn!("Inline site list is neither JSON nor Base64 JSON, ignoring"),
            }
        }

        if let Some(url) = self.config.remote_url() {
            match self.fetch_remote(url).await {
                Ok(sites) => {
                    debug!(count = sites.sites.len(), url, "Using remote site list");
                    return ResolvedSites {
                        origin: SourceOrigin::Remote,
                        sites,
                    };
                }
                Err(e) => warn!(url, error = %e, "Remote site list unavailable, falling back"),
            }
        }

        ResolvedSites {
            origin: SourceOrigin::Builtin,
            sites: builtin_sites(),
        }
    }

    async fn fetch_remote(&self, url: &str) -> crate::Result<SiteList> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.remote_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::Error::Upstream(format!("remote returned status {status}")));
        }

        let body = read_body_with_limit(response, MAX_REMOTE_LIST_BYTES).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
