use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sites: SitesConfig,
    pub search: SearchConfig,
    pub upstream: UpstreamConfig,
    pub proxy: ProxyConfig,
    pub tmdb: TmdbConfig,
    pub access: AccessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible origin (e.g. `https://tv.example.com`) used when
    /// building proxied playlist links. Derived from request headers when unset.
    pub public_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_origin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Where the source list comes from.
///
/// `inline` wins over `remote_url`, which wins over the built-in list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Site list as JSON, or Base64-encoded JSON
    pub inline: Option<String>,
    /// URL serving the site list as JSON, fetched on every resolution
    pub remote_url: Option<String>,
    pub remote_timeout_seconds: u64,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            inline: None,
            remote_url: None,
            remote_timeout_seconds: 10,
        }
    }
}

impl SitesConfig {
    #[must_use]
    pub fn inline(&self) -> Option<&str> {
        non_blank(self.inline.as_deref())
    }

    #[must_use]
    pub fn remote_url(&self) -> Option<&str> {
        non_blank(self.remote_url.as_deref())
    }

    #[must_use]
    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-source budget covering request and body read
    pub source_timeout_seconds: u64,
    pub max_response_bytes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source_timeout_seconds: 8,
            max_response_bytes: 16 * 1024 * 1024,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }
}

/// Timeouts for single-shot upstream calls (detail, metadata API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl UpstreamConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub user_agent: String,
    pub max_playlist_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            max_playlist_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Third-party metadata API (TMDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    /// Client-facing override for the metadata proxy, echoed by `/config`
    pub proxy_url: Option<String>,
    pub api_base: String,
    pub image_base: String,
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            proxy_url: None,
            api_base: "https://api.themoviedb.org/3".to_string(),
            image_base: "https://image.tmdb.org/t/p".to_string(),
            language: "zh-CN".to_string(),
        }
    }
}

impl TmdbConfig {
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    #[must_use]
    pub fn proxy_url(&self) -> &str {
        non_blank(self.proxy_url.as_deref()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Comma-separated list of accepted passwords
    pub passwords: String,
}

/// Deployment variables understood for compatibility with existing
/// installations, mapped onto their config keys.
const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("SITES_JSON", "sites.inline"),
    ("REMOTE_DB_URL", "sites.remote_url"),
    ("TMDB_API_KEY", "tmdb.api_key"),
    ("TMDB_PROXY_URL", "tmdb.proxy_url"),
    ("ACCESS_PASSWORD", "access.passwords"),
];

/// Resolve legacy deployment variables through `lookup`, skipping blank ones.
pub fn legacy_overrides<F>(lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    LEGACY_ENV_VARS
        .iter()
        .filter_map(|(var, key)| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (*key, v))
        })
        .collect()
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Legacy deployment variables (`SITES_JSON`, `ACCESS_PASSWORD`, ...)
    /// 2. Prefixed environment variables (`VODGATE__SERVER__PORT`, ...)
    /// 3. Config file (if provided)
    /// 4. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("VODGATE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in legacy_overrides(|name| std::env::var(name).ok()) {
            builder = builder.set_override(key, value)?;
        }

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check for misconfigurations that would only surface at request time.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }
        if let Some(origin) = non_blank(self.server.public_origin.as_deref()) {
            if url::Url::parse(origin).is_err() {
                errors.push(format!("server.public_origin is not a valid URL: {origin}"));
            }
        }
        if let Some(remote) = self.sites.remote_url() {
            if url::Url::parse(remote).is_err() {
                errors.push(format!("sites.remote_url is not a valid URL: {remote}"));
            }
        }
        if self.sites.remote_timeout_seconds == 0 {
            errors.push("sites.remote_timeout_seconds must be non-zero".to_string());
        }
        if self.search.source_timeout_seconds == 0 {
            errors.push("search.source_timeout_seconds must be non-zero".to_string());
        }
        if self.upstream.timeout_seconds == 0 {
            errors.push("upstream.timeout_seconds must be non-zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
