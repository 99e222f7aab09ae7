mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use vodgate_api::AppState;
use vodgate_core::{bootstrap::load_config, http_client::build_client, logging};

#[derive(Parser, Debug)]
#[command(name = "vodgate")]
#[command(about = "Video source aggregation gateway", long_about = None)]
struct Args {
    /// Config file (YAML or TOML); falls back to VODGATE_CONFIG_PATH, then ./config.yaml
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen host
    #[arg(long, env = "VODGATE_HOST")]
    host: Option<String>,

    /// HTTP listen port
    #[arg(long, env = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let mut config = load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("vodgate {} starting...", env!("CARGO_PKG_VERSION"));
    info!("HTTP address: {}", config.http_address());

    // 3. Shared upstream client and application state
    let client = build_client(&config)?;
    let state = AppState::new(config.clone(), client);

    let access = &state.access;
    info!(
        require_password = access.require_password(),
        multi_user = access.multi_user(),
        tmdb = config.tmdb.api_key().is_some(),
        "Services initialized"
    );

    // 4. Serve until shutdown
    server::run(config, state).await
}
