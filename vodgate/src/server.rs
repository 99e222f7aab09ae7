//! Server lifecycle management
//!
//! Binds the HTTP listener and serves the API until SIGINT or SIGTERM.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info};

use vodgate_api::{create_router, AppState};
use vodgate_core::Config;

/// Serve the HTTP API and wait for a shutdown signal
pub async fn run(config: Config, state: AppState) -> anyhow::Result<()> {
    let http_address = config.http_address();
    let http_addr: SocketAddr = http_address
        .parse()
        .with_context(|| format!("Invalid HTTP address '{http_address}'"))?;

    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP address {http_addr}"))?;

    info!("HTTP server listening on {}", http_addr);

    let router = create_router(state);
    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
        return Err(e.into());
    }

    info!("HTTP server shut down gracefully");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
