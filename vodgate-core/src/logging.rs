use std::str::FromStr;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Output format of the log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    Json,
    /// Human-readable multi-line output
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!("Invalid log format: {other}")),
        }
    }
}

/// Initialize structured logging based on configuration
///
/// `RUST_LOG` takes precedence over the configured level. HTTP client
/// internals are capped at `warn` unless `RUST_LOG` says otherwise.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let log_level = parse_log_level(&config.level)?;
    let format = config.format.parse::<LogFormat>()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(log_level)))
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let file = match &config.file_path {
        Some(path) => Some(Arc::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        )),
        None => None,
    };

    match (format, file) {
        (LogFormat::Json, file) => {
            let layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true)
                .with_line_number(true);
            match file {
                Some(file) => registry.with(layer.with_writer(file)).try_init()?,
                None => registry.with(layer).try_init()?,
            }
        }
        (LogFormat::Pretty, file) => {
            let layer = fmt::layer()
                .pretty()
                .with_target(true)
                .with_line_number(true)
                .with_file(false);
            match file {
                Some(file) => registry
                    .with(layer.with_ansi(false).with_writer(file))
                    .try_init()?,
                None => registry.with(layer).try_init()?,
            }
        }
    }

    Ok(())
}

fn default_directives(level: Level) -> String {
    let level = level.to_string().to_lowercase();
    format!("{level},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn")
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
